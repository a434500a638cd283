//! The picker dialog window: loading, error, and interactive map states.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::config::AppConfig;
use crate::constants::{ATTRIBUTION_URL, MAP_VIEW_HEIGHT, MAP_VIEW_WIDTH};
use crate::geo::LonLat;
use crate::theme;

use super::map_view;
use super::messages::{CloseLocationPicker, LookupAddress, RefreshMapView};
use super::state::{batch_progress, MapPhase, PickerSession, TileCache};

#[allow(clippy::too_many_arguments)]
pub fn picker_dialog_ui(
    mut contexts: EguiContexts,
    mut session: ResMut<PickerSession>,
    mut cache: ResMut<TileCache>,
    config: Res<AppConfig>,
    mut close_messages: MessageWriter<CloseLocationPicker>,
    mut refresh_messages: MessageWriter<RefreshMapView>,
    mut lookup_messages: MessageWriter<LookupAddress>,
) -> Result {
    if !session.open {
        return Ok(());
    }
    let ctx = contexts.ctx_mut()?;

    // Decoded tiles become textures here, where the egui context lives
    cache.upload_decoded(ctx);

    let mut open = true;
    let mut do_close = false;
    let mut do_refresh = false;
    let mut lookup: Option<LonLat> = None;

    egui::Window::new("Pick a location")
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .collapsible(false)
        .resizable(false)
        .open(&mut open)
        .show(ctx, |ui| {
            ui.set_min_width(MAP_VIEW_WIDTH);

            match session.phase.clone() {
                MapPhase::Loading => {
                    let progress = batch_progress(&session.initial_batch, &cache);
                    ui.allocate_ui_with_layout(
                        egui::vec2(MAP_VIEW_WIDTH, MAP_VIEW_HEIGHT),
                        egui::Layout::top_down(egui::Align::Center),
                        |ui| {
                            ui.add_space(MAP_VIEW_HEIGHT / 2.0 - 40.0);
                            ui.spinner();
                            ui.label("Loading map...");
                            ui.add_space(6.0);
                            ui.add(
                                egui::ProgressBar::new(progress.fraction())
                                    .desired_width(240.0)
                                    .text(format!("{}/{} tiles", progress.done, progress.total)),
                            );
                        },
                    );
                }
                MapPhase::Error(error) => {
                    ui.allocate_ui_with_layout(
                        egui::vec2(MAP_VIEW_WIDTH, MAP_VIEW_HEIGHT),
                        egui::Layout::top_down(egui::Align::Center),
                        |ui| {
                            ui.add_space(MAP_VIEW_HEIGHT / 2.0 - 30.0);
                            ui.colored_label(theme::ERROR_TEXT, error.user_message());
                            ui.add_space(8.0);
                            if ui.button("Try Again").clicked() {
                                do_refresh = true;
                            }
                        },
                    );
                }
                MapPhase::Ready => {
                    let gesture = map_view::draw_map(ui, &mut session, &cache);
                    lookup = gesture.lookup;
                }
                MapPhase::Idle => {}
            }

            ui.add_space(6.0);

            // Footer: the pin's resolved address, or what to do next
            if session.awaiting_address {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Looking up address...");
                });
            } else if let Some(ref picked) = session.resolved {
                ui.colored_label(theme::ADDRESS_TEXT, &picked.address);
                ui.weak(format!(
                    "{:.5}, {:.5}",
                    picked.position.lat, picked.position.lon
                ));
            } else if matches!(session.phase, MapPhase::Ready) {
                ui.colored_label(
                    theme::HINT_TEXT,
                    "Click the map or drag the pin to choose a point",
                );
            }

            ui.add_space(6.0);
            ui.separator();
            ui.horizontal(|ui| {
                if matches!(session.phase, MapPhase::Ready) && ui.button("Refresh").clicked() {
                    do_refresh = true;
                }
                if ui.small_button("\u{00A9} OpenStreetMap").clicked() {
                    let _ = open::that(ATTRIBUTION_URL);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Done").clicked() {
                        do_close = true;
                    }
                    ui.colored_label(
                        theme::HINT_TEXT,
                        format!("Deliveries limited to {}", config.data.country_label()),
                    );
                });
            });
        });

    // Handle actions after UI rendering
    if !open || do_close {
        close_messages.write(CloseLocationPicker);
    }
    if do_refresh {
        refresh_messages.write(RefreshMapView);
    }
    if let Some(position) = lookup {
        lookup_messages.write(LookupAddress { position });
    }

    Ok(())
}
