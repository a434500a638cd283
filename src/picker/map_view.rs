//! The interactive map canvas inside the picker dialog.
//!
//! Draws cached tiles and the pin, and turns pointer input into view changes
//! and pin placements. All projection math lives in [`crate::geo`]; this file
//! only bridges it to screen space.

use bevy_egui::egui;

use crate::constants::{MAP_VIEW_HEIGHT, MAP_VIEW_WIDTH, MARKER_HIT_RADIUS_PX, TILE_SIZE_PX};
use crate::geo::{self, LonLat};
use crate::theme;

use super::state::{MarkerDrag, PickerSession, TileCache, TileEntry};

/// What the user did to the map this frame.
#[derive(Default)]
pub struct MapGesture {
    /// The pin came to rest somewhere new; look up its address
    pub lookup: Option<LonLat>,
}

pub fn draw_map(ui: &mut egui::Ui, session: &mut PickerSession, cache: &TileCache) -> MapGesture {
    let mut gesture = MapGesture::default();

    let size = egui::vec2(MAP_VIEW_WIDTH, MAP_VIEW_HEIGHT);
    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
    let painter = ui.painter_at(rect);

    painter.rect_filled(rect, 4.0, theme::MAP_BACKGROUND);

    // Screen-space bridge for this frame's view
    let zoom = session.view.zoom;
    let (center_x, center_y) = geo::world_px(session.view.center, zoom);
    let to_screen = |wx: f64, wy: f64| -> egui::Pos2 {
        rect.center() + egui::vec2((wx - center_x) as f32, (wy - center_y) as f32)
    };
    let to_world = |pos: egui::Pos2| -> LonLat {
        let delta = pos - rect.center();
        geo::lonlat_from_world_px(
            center_x + delta.x as f64,
            center_y + delta.y as f64,
            zoom,
        )
    };

    for tile in session.view.visible_tiles() {
        let (origin_x, origin_y) = tile.origin_world_px();
        let tile_rect = egui::Rect::from_min_size(
            to_screen(origin_x, origin_y),
            egui::vec2(TILE_SIZE_PX as f32, TILE_SIZE_PX as f32),
        );
        match cache.entry(&tile) {
            Some(TileEntry::Ready(texture)) => {
                painter.image(
                    texture.id(),
                    tile_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            Some(TileEntry::Failed(_)) => {
                painter.rect_filled(tile_rect, 0.0, theme::TILE_FAILED);
            }
            _ => {
                painter.rect_filled(tile_rect, 0.0, theme::TILE_PLACEHOLDER);
                painter.rect_stroke(
                    tile_rect,
                    0.0,
                    egui::Stroke::new(1.0, theme::TILE_GRID),
                    egui::StrokeKind::Inside,
                );
            }
        }
    }

    // A drag either grabs the pin or pans the map, decided where it starts
    if response.drag_started() {
        let marker_screen = {
            let (mx, my) = geo::world_px(session.marker, zoom);
            to_screen(mx, my)
        };
        let near_marker = response
            .interact_pointer_pos()
            .is_some_and(|pos| pos.distance(marker_screen) <= MARKER_HIT_RADIUS_PX);
        session.drag = if near_marker {
            MarkerDrag::Pin
        } else {
            MarkerDrag::Pan
        };
    }

    if response.dragged() {
        match session.drag {
            MarkerDrag::Pin => {
                if let Some(pos) = response.interact_pointer_pos() {
                    session.marker = to_world(pos);
                }
            }
            MarkerDrag::Pan => {
                let delta = response.drag_delta();
                session.view.pan_px(delta.x, delta.y);
            }
            MarkerDrag::None => {}
        }
    }

    if response.drag_stopped() {
        if session.drag == MarkerDrag::Pin {
            gesture.lookup = Some(session.marker);
        }
        session.drag = MarkerDrag::None;
    }

    // A plain click re-seats the pin where it landed
    if response.clicked()
        && let Some(pos) = response.interact_pointer_pos()
    {
        session.marker = to_world(pos);
        gesture.lookup = Some(session.marker);
    }

    let marker_screen = {
        let (mx, my) = geo::world_px(session.marker, zoom);
        to_screen(mx, my)
    };
    draw_marker(&painter, marker_screen);

    // Zoom controls overlaid on the map corner; changes land next frame
    let zoom_in_rect = egui::Rect::from_min_size(
        rect.right_top() + egui::vec2(-38.0, 10.0),
        egui::Vec2::splat(28.0),
    );
    let zoom_out_rect = zoom_in_rect.translate(egui::vec2(0.0, 34.0));
    if zoom_button(ui, zoom_in_rect, "+") {
        session.view.zoom_in();
    }
    if zoom_button(ui, zoom_out_rect, "\u{2212}") {
        session.view.zoom_out();
    }

    if response.hovered() {
        let scroll = ui.input(|i| i.raw_scroll_delta.y);
        if scroll > 0.0 {
            session.view.zoom_in();
        } else if scroll < 0.0 {
            session.view.zoom_out();
        }
    }

    gesture
}

fn zoom_button(ui: &mut egui::Ui, rect: egui::Rect, label: &str) -> bool {
    let response = ui.allocate_rect(rect, egui::Sense::click());
    let fill = if response.hovered() {
        egui::Color32::from_rgba_unmultiplied(255, 255, 255, 240)
    } else {
        egui::Color32::from_rgba_unmultiplied(255, 255, 255, 200)
    };
    ui.painter().rect_filled(rect, 3.0, fill);
    ui.painter().rect_stroke(
        rect,
        3.0,
        egui::Stroke::new(1.0, egui::Color32::from_gray(100)),
        egui::StrokeKind::Inside,
    );
    ui.painter().text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        label,
        egui::FontId::proportional(16.0),
        egui::Color32::BLACK,
    );
    response.clicked()
}

/// Classic pin: a triangle tapering to the anchored point, circle head above.
fn draw_marker(painter: &egui::Painter, tip: egui::Pos2) {
    let left = tip + egui::vec2(-7.0, -18.0);
    let right = tip + egui::vec2(7.0, -18.0);
    painter.add(egui::Shape::convex_polygon(
        vec![tip, left, right],
        theme::MARKER_FILL,
        egui::Stroke::NONE,
    ));
    painter.circle(
        tip + egui::vec2(0.0, -20.0),
        9.0,
        theme::MARKER_FILL,
        egui::Stroke::new(2.0, theme::MARKER_STROKE),
    );
}
