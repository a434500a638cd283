use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::config::AppConfig;
use crate::theme;

use super::settings_dialog::SettingsDialogState;

/// Main toolbar showing the app identity and settings access
pub fn toolbar_ui(
    mut contexts: EguiContexts,
    config: Res<AppConfig>,
    mut settings_state: ResMut<SettingsDialogState>,
) -> Result {
    egui::TopBottomPanel::top("main_toolbar")
        .frame(
            egui::Frame::side_top_panel(&contexts.ctx_mut()?.style())
                .inner_margin(egui::Margin::symmetric(12, 8)),
        )
        .show(contexts.ctx_mut()?, |ui| {
            ui.horizontal(|ui| {
                ui.spacing_mut().item_spacing.x = 4.0;

                ui.label(egui::RichText::new("Pindrop").size(16.0).strong());

                ui.add_space(8.0);
                ui.separator();
                ui.add_space(8.0);

                ui.colored_label(
                    theme::COUNTRY_BADGE,
                    format!("Deliveries: {}", config.data.country_label()),
                );

                // Right-aligned settings access
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add(egui::Button::new("Settings").min_size(egui::vec2(0.0, 24.0)))
                        .clicked()
                    {
                        settings_state.load_from_config(&config);
                        settings_state.is_open = true;
                    }
                });
            });
        });
    Ok(())
}
