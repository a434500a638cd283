use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{DEFAULT_CENTER_LAT, DEFAULT_CENTER_LON};
use crate::geo::LonLat;
use crate::provider::geocoder::DEFAULT_GEOCODER_URL;

/// System set for config loading (other plugins can run after this)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigLoaded;

fn default_tile_url_template() -> String {
    "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string()
}

fn default_geocoder_url() -> String {
    DEFAULT_GEOCODER_URL.to_string()
}

fn default_operating_country() -> String {
    "ng".to_string()
}

fn default_map_center() -> LonLat {
    LonLat::new(DEFAULT_CENTER_LON, DEFAULT_CENTER_LAT)
}

/// Application configuration persisted to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfigData {
    /// Tile server URL template with `{z}`, `{x}` and `{y}` placeholders
    #[serde(default = "default_tile_url_template")]
    pub tile_url_template: String,

    /// Access key appended to tile URLs (commercial tile hosts)
    #[serde(default)]
    pub tile_access_key: Option<String>,

    /// Base URL of a Nominatim-compatible geocoder
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    /// Contact address sent in the User-Agent, as public endpoints request
    #[serde(default)]
    pub operator_contact: Option<String>,

    /// ISO 3166-1 alpha-2 code deliveries are restricted to
    #[serde(default = "default_operating_country")]
    pub operating_country: String,

    /// Where the picker map opens when a stop has no coordinates yet
    #[serde(default = "default_map_center")]
    pub default_center: LonLat,
}

impl Default for AppConfigData {
    fn default() -> Self {
        Self {
            tile_url_template: default_tile_url_template(),
            tile_access_key: None,
            geocoder_url: default_geocoder_url(),
            operator_contact: None,
            operating_country: default_operating_country(),
            default_center: default_map_center(),
        }
    }
}

impl AppConfigData {
    /// User-Agent for tile and geocoder requests.
    ///
    /// Public Nominatim and OSM tile servers require an identifying agent
    /// with a way to reach the operator.
    pub fn user_agent(&self) -> String {
        let contact = self
            .operator_contact
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("https://github.com/pindrop-app/pindrop");
        format!("pindrop/{} ({})", env!("CARGO_PKG_VERSION"), contact)
    }

    /// Operating country in the uppercase form shown to the user.
    pub fn country_label(&self) -> String {
        self.operating_country.to_ascii_uppercase()
    }
}

/// Validate a country the user typed into settings.
///
/// Accepts exactly two ASCII letters and normalizes them to the lowercase
/// form the geocoder uses.
pub fn normalized_country(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(trimmed.to_ascii_lowercase())
    } else {
        None
    }
}

/// The live configuration, plus where it came from and whether it has
/// unsaved edits.
#[derive(Resource)]
pub struct AppConfig {
    pub data: AppConfigData,
    pub config_path: PathBuf,
    pub dirty: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: AppConfigData::default(),
            config_path: crate::paths::config_file(),
            dirty: false,
        }
    }
}

/// Set when the config file existed but could not be used, so the user can
/// be told their settings reverted.
#[derive(Resource, Default)]
pub struct ConfigResetNotification {
    pub show: bool,
    pub reason: Option<String>,
}

/// Message to trigger config save
#[derive(Message)]
pub struct SaveConfigRequest;

/// Read the config file. `Err` carries the user-facing reason defaults were
/// used despite a file being present.
fn read_config_file(path: &std::path::Path) -> Result<AppConfigData, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Could not read configuration file: {}", e))?;
    serde_json::from_str(&json).map_err(|e| format!("Configuration file was corrupted: {}", e))
}

/// Startup system filling the config resource from disk.
fn load_config_system(
    mut config: ResMut<AppConfig>,
    mut reset_notification: ResMut<ConfigResetNotification>,
) {
    if !config.config_path.exists() {
        info!("No config file found, using defaults");
        return;
    }
    match read_config_file(&config.config_path) {
        Ok(data) => {
            info!("Loaded config from {:?}", config.config_path);
            config.data = data;
        }
        Err(reason) => {
            warn!("{}", reason);
            reset_notification.show = true;
            reset_notification.reason = Some(reason);
        }
    }
}

/// Writes the config when asked and something actually changed.
fn save_config_system(
    mut events: MessageReader<SaveConfigRequest>,
    mut config: ResMut<AppConfig>,
) {
    for _ in events.read() {
        if !config.dirty {
            continue;
        }
        match serde_json::to_string_pretty(&config.data) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&config.config_path, json) {
                    error!("Failed to save config: {}", e);
                } else {
                    info!("Config saved to {:?}", config.config_path);
                    config.dirty = false;
                }
            }
            Err(e) => error!("Failed to serialize config: {}", e),
        }
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AppConfig>()
            .init_resource::<ConfigResetNotification>()
            .add_systems(Startup, load_config_system.in_set(ConfigLoaded))
            .add_message::<SaveConfigRequest>()
            .add_systems(
                Update,
                save_config_system.run_if(on_message::<SaveConfigRequest>),
            );
    }
}
