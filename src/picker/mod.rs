//! The location picker: a modal dialog with a draggable pin over a tiled map.
//!
//! A stop on the board opens the picker, the picker loads the visible tile
//! batch, then reverse-geocodes wherever the pin comes to rest. A selection
//! is only reported when the resolved address lies inside the configured
//! operating country; the dialog stays open so the pin can keep moving.

mod map_view;
mod messages;
mod state;
mod systems;
mod ui;

#[cfg(test)]
mod tests;

pub use messages::{CloseLocationPicker, LocationSelected, OpenLocationPicker};
pub use state::PickerSession;

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

use messages::{LookupAddress, RefreshMapView};
use state::{StalenessPoll, TileCache};
use systems::{
    close_picker, open_picker, poll_address_searches, poll_reverse_lookups, poll_tile_fetches,
    recover_after_unocclusion, refresh_map, spawn_tile_fetches, start_address_lookup,
    sweep_failed_tiles, tick_load_deadline,
};

pub struct LocationPickerPlugin;

impl Plugin for LocationPickerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PickerSession>()
            .init_resource::<TileCache>()
            .init_resource::<StalenessPoll>()
            .add_message::<OpenLocationPicker>()
            .add_message::<CloseLocationPicker>()
            .add_message::<LocationSelected>()
            .add_message::<RefreshMapView>()
            .add_message::<LookupAddress>()
            .add_systems(
                Update,
                (
                    open_picker.run_if(on_message::<OpenLocationPicker>),
                    close_picker.run_if(on_message::<CloseLocationPicker>),
                    refresh_map.run_if(on_message::<RefreshMapView>),
                    start_address_lookup.run_if(on_message::<LookupAddress>),
                    spawn_tile_fetches,
                    poll_tile_fetches,
                    poll_reverse_lookups,
                    poll_address_searches,
                    tick_load_deadline,
                    recover_after_unocclusion,
                    sweep_failed_tiles,
                ),
            )
            .add_systems(EguiPrimaryContextPass, ui::picker_dialog_ui);
    }
}
