mod settings_dialog;
mod stops_panel;
mod toolbar;

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<settings_dialog::SettingsDialogState>()
            // Top bar first so it spans the full width, then the side panel,
            // then floating dialogs. Use chain() to enforce ordering.
            .add_systems(
                EguiPrimaryContextPass,
                (
                    toolbar::toolbar_ui,
                    stops_panel::stops_panel_ui,
                    settings_dialog::settings_dialog_ui,
                )
                    .chain(),
            );
    }
}
