use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::config::{normalized_country, AppConfig, SaveConfigRequest};
use crate::geo::LonLat;
use crate::theme;

/// Edit buffers for the settings window. Filled from config on open,
/// written back only on Save.
#[derive(Resource, Default)]
pub struct SettingsDialogState {
    pub is_open: bool,
    pub tile_url_template: String,
    pub tile_access_key: String,
    pub geocoder_url: String,
    pub operator_contact: String,
    pub operating_country: String,
    pub default_center_lon: f64,
    pub default_center_lat: f64,
    pub has_changes: bool,
}

impl SettingsDialogState {
    pub fn load_from_config(&mut self, config: &AppConfig) {
        self.tile_url_template = config.data.tile_url_template.clone();
        self.tile_access_key = config.data.tile_access_key.clone().unwrap_or_default();
        self.geocoder_url = config.data.geocoder_url.clone();
        self.operator_contact = config.data.operator_contact.clone().unwrap_or_default();
        self.operating_country = config.data.operating_country.clone();
        self.default_center_lon = config.data.default_center.lon;
        self.default_center_lat = config.data.default_center.lat;
        self.has_changes = false;
    }
}

/// A labeled single-line text field. Returns true when edited this frame.
fn text_row(ui: &mut egui::Ui, label: &str, value: &mut String, hint: &str) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        changed = ui
            .add(
                egui::TextEdit::singleline(value)
                    .desired_width(300.0)
                    .hint_text(hint),
            )
            .changed();
    });
    changed
}

fn section_hint(ui: &mut egui::Ui, text: &str) {
    ui.add_space(4.0);
    ui.label(egui::RichText::new(text).weak().small());
}

/// Trimmed string as an `Option`, empty meaning unset.
fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn settings_dialog_ui(
    mut contexts: EguiContexts,
    mut dialog_state: ResMut<SettingsDialogState>,
    mut config: ResMut<AppConfig>,
    mut save_events: MessageWriter<SaveConfigRequest>,
) -> Result {
    if !dialog_state.is_open {
        return Ok(());
    }

    let mut should_close = false;
    let mut should_save = false;
    let country_ok = normalized_country(&dialog_state.operating_country).is_some();

    egui::Window::new("Settings")
        .collapsible(false)
        .resizable(false)
        .min_width(420.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(contexts.ctx_mut()?, |ui| {
            let state = &mut *dialog_state;

            ui.group(|ui| {
                ui.label(egui::RichText::new("Map Tiles").strong());
                ui.add_space(8.0);
                state.has_changes |= text_row(
                    ui,
                    "URL template:",
                    &mut state.tile_url_template,
                    "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
                );
                state.has_changes |=
                    text_row(ui, "Access key:", &mut state.tile_access_key, "None");
                section_hint(
                    ui,
                    "The template must contain {z}, {x} and {y}. The key, if set, is appended as a query parameter.",
                );
            });

            ui.add_space(12.0);

            ui.group(|ui| {
                ui.label(egui::RichText::new("Geocoding").strong());
                ui.add_space(8.0);
                state.has_changes |= text_row(
                    ui,
                    "Endpoint:",
                    &mut state.geocoder_url,
                    "https://nominatim.openstreetmap.org",
                );
                state.has_changes |= text_row(
                    ui,
                    "Contact:",
                    &mut state.operator_contact,
                    "ops@example.com",
                );
                section_hint(
                    ui,
                    "The contact address is sent in the User-Agent header, as public geocoders request.",
                );
            });

            ui.add_space(12.0);

            ui.group(|ui| {
                ui.label(egui::RichText::new("Delivery Area").strong());
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.label("Country code:");
                    state.has_changes |= ui
                        .add(
                            egui::TextEdit::singleline(&mut state.operating_country)
                                .desired_width(48.0)
                                .char_limit(2),
                        )
                        .changed();
                    if !country_ok {
                        ui.colored_label(theme::ERROR_TEXT, "Use a two-letter ISO code");
                    }
                });

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    ui.label("Default center:");
                    let lon = ui.add(
                        egui::DragValue::new(&mut state.default_center_lon)
                            .range(-180.0..=180.0)
                            .speed(0.05)
                            .fixed_decimals(4)
                            .prefix("lon "),
                    );
                    let lat = ui.add(
                        egui::DragValue::new(&mut state.default_center_lat)
                            .range(-85.0..=85.0)
                            .speed(0.05)
                            .fixed_decimals(4)
                            .prefix("lat "),
                    );
                    state.has_changes |= lon.changed() || lat.changed();
                });

                section_hint(
                    ui,
                    "Addresses outside the delivery area are rejected when picking a location.",
                );
            });

            ui.add_space(16.0);

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(state.has_changes && country_ok, egui::Button::new("Save"))
                    .clicked()
                {
                    should_save = true;
                }
                if ui.button("Cancel").clicked() {
                    should_close = true;
                }
            });
        });

    if should_save {
        config.data.tile_url_template = dialog_state.tile_url_template.trim().to_string();
        config.data.tile_access_key = non_empty(&dialog_state.tile_access_key);
        config.data.geocoder_url = dialog_state
            .geocoder_url
            .trim()
            .trim_end_matches('/')
            .to_string();
        config.data.operator_contact = non_empty(&dialog_state.operator_contact);
        if let Some(country) = normalized_country(&dialog_state.operating_country) {
            config.data.operating_country = country;
        }
        config.data.default_center = LonLat::new(
            dialog_state.default_center_lon,
            dialog_state.default_center_lat,
        )
        .clamped();

        config.dirty = true;
        save_events.write(SaveConfigRequest);
        should_close = true;
    }

    if should_close {
        dialog_state.is_open = false;
        // Stale edits must not leak into the next open
        dialog_state.load_from_config(&config);
    }

    Ok(())
}
