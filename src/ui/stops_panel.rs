use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::picker::{OpenLocationPicker, PickerSession};
use crate::stops::{SaveStopsRequest, StopBoard};

/// Side panel listing the delivery stops being planned
pub fn stops_panel_ui(
    mut contexts: EguiContexts,
    mut board: ResMut<StopBoard>,
    session: Res<PickerSession>,
    mut open_events: MessageWriter<OpenLocationPicker>,
    mut save_events: MessageWriter<SaveStopsRequest>,
) -> Result {
    // Deferred actions so the stop list is not mutated while iterating
    let mut add_clicked = false;
    let mut to_remove: Option<u64> = None;
    let mut to_pick: Option<u64> = None;
    let mut labels_changed = false;
    let mut save_requested = false;

    let editing = board.editing;
    let picker_open = session.open;

    egui::SidePanel::left("stops_panel")
        .default_width(260.0)
        .show(contexts.ctx_mut()?, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading("Stops");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add(egui::Button::new("Add Stop").min_size(egui::vec2(0.0, 24.0)))
                        .clicked()
                    {
                        add_clicked = true;
                    }
                });
            });
            ui.add_space(4.0);
            ui.separator();

            if board.stops.is_empty() {
                ui.add_space(8.0);
                ui.label(
                    egui::RichText::new("No stops yet. Add one to get started.")
                        .weak()
                        .italics(),
                );
                return;
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                for stop in board.stops.iter_mut() {
                    ui.add_space(4.0);

                    ui.horizontal(|ui| {
                        let response = ui.add(
                            egui::TextEdit::singleline(&mut stop.label).desired_width(160.0),
                        );
                        if response.changed() {
                            labels_changed = true;
                        }
                        if response.lost_focus() {
                            save_requested = true;
                        }

                        ui.with_layout(
                            egui::Layout::right_to_left(egui::Align::Center),
                            |ui| {
                                if ui
                                    .small_button("✕")
                                    .on_hover_text("Remove stop")
                                    .clicked()
                                {
                                    to_remove = Some(stop.id);
                                }
                            },
                        );
                    });

                    match &stop.address {
                        Some(address) => {
                            ui.label(egui::RichText::new(address).weak());
                        }
                        None => {
                            ui.label(egui::RichText::new("No location yet").weak().italics());
                        }
                    }

                    let button_label = if picker_open && editing == Some(stop.id) {
                        "Choosing..."
                    } else if stop.address.is_some() {
                        "Change location"
                    } else {
                        "Set location"
                    };
                    if ui
                        .add_enabled(!picker_open, egui::Button::new(button_label))
                        .clicked()
                    {
                        to_pick = Some(stop.id);
                    }

                    ui.add_space(4.0);
                    ui.separator();
                }
            });
        });

    if add_clicked {
        board.add_stop();
        save_events.write(SaveStopsRequest);
    }

    if let Some(id) = to_remove {
        board.remove_stop(id);
        save_events.write(SaveStopsRequest);
    }

    if let Some(id) = to_pick
        && let Some(stop) = board.stop(id)
    {
        let initial_address = stop.address.clone();
        let initial_position = stop.position;
        board.editing = Some(id);
        open_events.write(OpenLocationPicker {
            initial_address,
            initial_position,
        });
    }

    if labels_changed {
        board.dirty = true;
    }
    if save_requested {
        save_events.write(SaveStopsRequest);
    }

    Ok(())
}
