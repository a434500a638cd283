//! The dispatch stop board: the list of stops and its persistence.
//!
//! Stops are saved to `stops.json` under the platform data directory. A stop
//! may carry an address, coordinates, both, or neither; the picker fills in
//! whatever is missing.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ConfigLoaded;
use crate::geo::LonLat;
use crate::notify::Notifications;
use crate::paths;
use crate::picker::{CloseLocationPicker, LocationSelected};

/// One delivery stop on the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub id: u64,
    pub label: String,
    /// Resolved address line, if the stop has been placed
    #[serde(default)]
    pub address: Option<String>,
    /// Pin coordinates, if the stop has been placed
    #[serde(default)]
    pub position: Option<LonLat>,
}

/// The planner's list of stops plus which one the picker is editing.
#[derive(Resource)]
pub struct StopBoard {
    pub stops: Vec<Stop>,
    next_id: u64,
    /// Stop the open picker is choosing a location for
    pub editing: Option<u64>,
    /// Unsaved changes exist
    pub dirty: bool,
}

impl Default for StopBoard {
    fn default() -> Self {
        Self {
            stops: Vec::new(),
            next_id: 1,
            editing: None,
            dirty: false,
        }
    }
}

impl StopBoard {
    pub fn add_stop(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.stops.push(Stop {
            id,
            label: format!("Stop {}", id),
            address: None,
            position: None,
        });
        self.dirty = true;
        id
    }

    pub fn remove_stop(&mut self, id: u64) {
        self.stops.retain(|s| s.id != id);
        if self.editing == Some(id) {
            self.editing = None;
        }
        self.dirty = true;
    }

    pub fn stop(&self, id: u64) -> Option<&Stop> {
        self.stops.iter().find(|s| s.id == id)
    }

    /// Record the picker's selection on the stop being edited.
    pub fn apply_selection(&mut self, address: &str, position: LonLat) -> Option<&Stop> {
        let id = self.editing?;
        let stop = self.stops.iter_mut().find(|s| s.id == id)?;
        stop.address = Some(address.to_string());
        stop.position = Some(position);
        self.dirty = true;
        self.stop(id)
    }
}

/// Message to persist the board to disk
#[derive(Message)]
pub struct SaveStopsRequest;

/// On-disk form of the board.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedBoard {
    #[serde(default)]
    stops: Vec<Stop>,
    #[serde(default)]
    next_id: u64,
}

/// Rebuild the runtime board, repairing `next_id` if the file predates it
/// or was hand-edited.
fn board_from_saved(saved: SavedBoard) -> StopBoard {
    let highest = saved.stops.iter().map(|s| s.id).max().unwrap_or(0);
    StopBoard {
        next_id: saved.next_id.max(highest + 1),
        stops: saved.stops,
        editing: None,
        dirty: false,
    }
}

/// Load the board from disk, falling back to an empty one.
fn load_board() -> StopBoard {
    let path = paths::stops_file();
    if !path.exists() {
        info!("No stop board found, starting empty");
        return StopBoard::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(json) => match serde_json::from_str::<SavedBoard>(&json) {
            Ok(saved) => {
                info!("Loaded {} stops from {:?}", saved.stops.len(), path);
                board_from_saved(saved)
            }
            Err(e) => {
                warn!("Failed to parse stop board: {}", e);
                StopBoard::default()
            }
        },
        Err(e) => {
            warn!("Failed to read stop board: {}", e);
            StopBoard::default()
        }
    }
}

/// Save the board to disk.
fn save_board(board: &StopBoard) -> Result<(), String> {
    let saved = SavedBoard {
        stops: board.stops.clone(),
        next_id: board.next_id,
    };
    let json = serde_json::to_string_pretty(&saved)
        .map_err(|e| format!("Failed to serialize stop board: {}", e))?;
    let path = paths::stops_file();
    std::fs::write(&path, json).map_err(|e| format!("Failed to save stop board: {}", e))?;
    info!("Stop board saved to {:?}", path);
    Ok(())
}

/// Startup system to load the board from disk into the existing resource
fn load_board_system(mut board: ResMut<StopBoard>) {
    *board = load_board();
}

/// System to save the board when requested
fn save_board_system(
    mut events: MessageReader<SaveStopsRequest>,
    mut board: ResMut<StopBoard>,
    mut notifications: ResMut<Notifications>,
) {
    for _ in events.read() {
        if !board.dirty {
            continue;
        }
        match save_board(&board) {
            // Stays dirty on failure so the next request retries
            Ok(()) => board.dirty = false,
            Err(message) => {
                error!("{}", message);
                notifications.error("Couldn't save stops. Changes are kept for this session.");
            }
        }
    }
}

/// Writes picker selections onto the stop being edited.
///
/// Selections keep arriving while the picker stays open; each one overwrites
/// the previous, so the stop always holds the latest pin.
fn apply_selected_location(
    mut selections: MessageReader<LocationSelected>,
    mut board: ResMut<StopBoard>,
    mut notifications: ResMut<Notifications>,
    mut save_events: MessageWriter<SaveStopsRequest>,
) {
    for selection in selections.read() {
        match board.apply_selection(&selection.address, selection.position) {
            Some(stop) => {
                notifications.success(format!("Location set for {}", stop.label));
                save_events.write(SaveStopsRequest);
            }
            None => warn!("Location selected but no stop is being edited"),
        }
    }
}

/// Stops editing when the picker goes away.
fn clear_editing_on_close(
    mut events: MessageReader<CloseLocationPicker>,
    mut board: ResMut<StopBoard>,
) {
    if events.read().next().is_some() {
        board.editing = None;
    }
}

pub struct StopBoardPlugin;

impl Plugin for StopBoardPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StopBoard>()
            .add_message::<SaveStopsRequest>()
            .add_systems(Startup, load_board_system.after(ConfigLoaded))
            .add_systems(
                Update,
                (
                    apply_selected_location.run_if(on_message::<LocationSelected>),
                    clear_editing_on_close.run_if(on_message::<CloseLocationPicker>),
                    save_board_system.run_if(on_message::<SaveStopsRequest>),
                ),
            );
    }
}
