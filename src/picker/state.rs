//! Picker session state, the tile cache, and task components.

use std::collections::HashMap;

use bevy::prelude::*;
use bevy::tasks::Task;
use bevy_egui::egui;

use crate::constants::{
    CLOSE_ZOOM, DEFAULT_CENTER_LAT, DEFAULT_CENTER_LON, MAP_LOAD_TIMEOUT_SECS, MAP_VIEW_HEIGHT,
    MAP_VIEW_WIDTH, MAX_ZOOM, MIN_ZOOM, TILE_RETRY_PERIOD_SECS, WIDE_ZOOM,
};
use crate::geo::{self, LonLat, TileId};
use crate::provider::geocoder::GeocodeOutcome;
use crate::provider::tiles::{DecodedTile, TileFetchResult};

/// Why the map never became usable.
#[derive(Debug, Clone, PartialEq)]
pub enum MapLoadError {
    /// The initial tile batch did not finish within the deadline
    TimedOut,
    /// Every tile in the initial batch failed
    Failed(String),
}

impl MapLoadError {
    pub fn user_message(&self) -> String {
        match self {
            MapLoadError::TimedOut => {
                "The map took too long to load. Check your connection and try again.".to_string()
            }
            MapLoadError::Failed(message) => format!("The map failed to load: {}", message),
        }
    }
}

/// Lifecycle of the map inside an open picker.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MapPhase {
    /// Picker closed, nothing running
    #[default]
    Idle,
    /// Waiting on the initial tile batch
    Loading,
    /// Map tiles are up, pin is interactive
    Ready,
    /// Initial load failed; only Try Again is offered
    Error(MapLoadError),
}

/// Center and zoom of the fixed-size map viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: LonLat,
    pub zoom: u8,
}

impl MapView {
    pub fn new(center: LonLat, zoom: u8) -> Self {
        Self {
            center: center.clamped(),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + 1).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.saturating_sub(1).max(MIN_ZOOM);
    }

    /// Shift the view by a screen-space drag. Dragging the map right pulls
    /// the world west, so the center moves against the drag.
    pub fn pan_px(&mut self, dx: f32, dy: f32) {
        let (cx, cy) = geo::world_px(self.center, self.zoom);
        self.center = geo::lonlat_from_world_px(cx - dx as f64, cy - dy as f64, self.zoom);
    }

    /// Tiles currently under the viewport.
    pub fn visible_tiles(&self) -> Vec<TileId> {
        geo::visible_tiles(self.center, self.zoom, MAP_VIEW_WIDTH, MAP_VIEW_HEIGHT)
    }

    /// Starting view for a session: close-up when the stop already has
    /// coordinates, country-wide otherwise.
    pub fn for_position(position: Option<LonLat>, default_center: LonLat) -> Self {
        match position {
            Some(pos) => MapView::new(pos, CLOSE_ZOOM),
            None => MapView::new(default_center, WIDE_ZOOM),
        }
    }
}

/// What resolved under the pin: the address plus the pin position itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedLocation {
    pub address: String,
    pub position: LonLat,
}

/// What the active drag is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerDrag {
    #[default]
    None,
    /// Dragging the pin itself
    Pin,
    /// Dragging the map underneath it
    Pan,
}

/// One picker session from open to close.
///
/// `generation` increments on every open; task results carry the generation
/// they were spawned under and are discarded when it no longer matches.
#[derive(Resource)]
pub struct PickerSession {
    pub open: bool,
    pub phase: MapPhase,
    pub generation: u64,
    pub view: MapView,
    /// The pin. Always present while the picker is open.
    pub marker: LonLat,
    /// Last accepted address for the pin, shown in the footer
    pub resolved: Option<PickedLocation>,
    /// A reverse lookup is in flight for the newest pin position
    pub awaiting_address: bool,
    pub drag: MarkerDrag,
    /// Tiles whose fate decides readiness of this load
    pub initial_batch: Vec<TileId>,
    /// Armed while `Loading`; firing moves the session to `Error`
    pub load_deadline: Option<Timer>,
    lookup_seq: u64,
    applied_seq: u64,
}

impl Default for PickerSession {
    fn default() -> Self {
        let center = LonLat::new(DEFAULT_CENTER_LON, DEFAULT_CENTER_LAT);
        Self {
            open: false,
            phase: MapPhase::Idle,
            generation: 0,
            view: MapView::new(center, WIDE_ZOOM),
            marker: center,
            resolved: None,
            awaiting_address: false,
            drag: MarkerDrag::None,
            initial_batch: Vec::new(),
            load_deadline: None,
            lookup_seq: 0,
            applied_seq: 0,
        }
    }
}

impl PickerSession {
    /// Start a fresh session. Everything from the previous one is forgotten
    /// and its in-flight results stop matching `generation`.
    pub fn open_at(&mut self, view: MapView, marker: LonLat) {
        self.open = true;
        self.generation += 1;
        self.view = view;
        self.marker = marker.clamped();
        self.resolved = None;
        self.awaiting_address = false;
        self.drag = MarkerDrag::None;
        self.lookup_seq = 0;
        self.applied_seq = 0;
        self.begin_loading();
    }

    /// (Re)start the initial tile load for the current view.
    ///
    /// Used on open, on Try Again after an error, and on Refresh. Keeps the
    /// pin and any resolved address.
    pub fn begin_loading(&mut self) {
        self.phase = MapPhase::Loading;
        self.initial_batch = self.view.visible_tiles();
        self.load_deadline = Some(Timer::from_seconds(MAP_LOAD_TIMEOUT_SECS, TimerMode::Once));
    }

    pub fn mark_ready(&mut self) {
        self.phase = MapPhase::Ready;
        self.load_deadline = None;
    }

    pub fn fail(&mut self, error: MapLoadError) {
        self.phase = MapPhase::Error(error);
        self.load_deadline = None;
    }

    /// Dismiss the session. The bumped-on-open generation takes care of any
    /// results that still trickle in.
    pub fn close(&mut self) {
        self.open = false;
        self.phase = MapPhase::Idle;
        self.resolved = None;
        self.awaiting_address = false;
        self.drag = MarkerDrag::None;
        self.initial_batch.clear();
        self.load_deadline = None;
    }

    /// Re-aim the view and pin, e.g. when the saved address was found.
    ///
    /// While still loading, the readiness batch follows the new view; the
    /// original deadline keeps running so the total wait stays bounded.
    pub fn retarget(&mut self, center: LonLat, zoom: u8) {
        self.view = MapView::new(center, zoom);
        self.marker = self.view.center;
        if matches!(self.phase, MapPhase::Loading) {
            self.initial_batch = self.view.visible_tiles();
        }
    }

    /// Whether results from a task spawned under `generation` still apply.
    pub fn accepts(&self, generation: u64) -> bool {
        self.open && generation == self.generation
    }

    /// Claim a sequence number for a new reverse lookup.
    pub fn next_lookup_seq(&mut self) -> u64 {
        self.lookup_seq += 1;
        self.awaiting_address = true;
        self.lookup_seq
    }

    /// Record a finished lookup. Returns false when a newer lookup already
    /// answered, in which case the result must be dropped.
    pub fn try_finish_lookup(&mut self, seq: u64) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        if seq == self.lookup_seq {
            self.awaiting_address = false;
        }
        true
    }
}

/// State of one tile in the cache.
pub enum TileEntry {
    /// Fetch task spawned, no answer yet
    Pending,
    /// Downloaded and decoded, waiting for texture upload
    Decoded(DecodedTile),
    /// Uploaded, ready to draw
    Ready(egui::TextureHandle),
    /// Fetch or decode failed
    Failed(String),
}

impl TileEntry {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TileEntry::Pending)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, TileEntry::Decoded(_) | TileEntry::Ready(_))
    }
}

/// All tiles fetched for the current session, keyed by tile address.
#[derive(Resource, Default)]
pub struct TileCache {
    entries: HashMap<TileId, TileEntry>,
    /// Fetch tasks spawned but not yet polled to completion
    pub in_flight: usize,
}

impl TileCache {
    pub fn contains(&self, tile: &TileId) -> bool {
        self.entries.contains_key(tile)
    }

    pub fn entry(&self, tile: &TileId) -> Option<&TileEntry> {
        self.entries.get(tile)
    }

    pub fn mark_pending(&mut self, tile: TileId) {
        self.entries.insert(tile, TileEntry::Pending);
    }

    pub fn store(&mut self, result: TileFetchResult) {
        let entry = match result.image {
            Some(image) => TileEntry::Decoded(image),
            None => TileEntry::Failed(
                result
                    .error
                    .unwrap_or_else(|| "unknown tile error".to_string()),
            ),
        };
        self.entries.insert(result.tile, entry);
    }

    /// Forget failed entries among `tiles` so the fetch system retries them.
    /// Returns how many were cleared.
    pub fn retry_failed(&mut self, tiles: &[TileId]) -> usize {
        let mut cleared = 0;
        for tile in tiles {
            if matches!(self.entries.get(tile), Some(TileEntry::Failed(_))) {
                self.entries.remove(tile);
                cleared += 1;
            }
        }
        cleared
    }

    /// Drop everything, including bookkeeping for tasks that were despawned
    /// along with the session.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.in_flight = 0;
    }

    /// Turn decoded tiles into egui textures. Runs on the UI pass, where the
    /// egui context lives.
    pub fn upload_decoded(&mut self, ctx: &egui::Context) {
        let decoded: Vec<TileId> = self
            .entries
            .iter()
            .filter(|(_, entry)| matches!(entry, TileEntry::Decoded(_)))
            .map(|(tile, _)| *tile)
            .collect();

        for tile in decoded {
            if let Some(TileEntry::Decoded(image)) = self.entries.remove(&tile) {
                let pixels = egui::ColorImage::from_rgba_unmultiplied(image.size, &image.rgba);
                let name = format!("tile-{}-{}-{}", tile.zoom, tile.x, tile.y);
                let handle = ctx.load_texture(name, pixels, egui::TextureOptions::LINEAR);
                self.entries.insert(tile, TileEntry::Ready(handle));
            }
        }
    }
}

/// Progress of the initial tile batch.
pub struct BatchProgress {
    pub done: usize,
    pub total: usize,
    pub succeeded: usize,
    pub first_error: Option<String>,
}

impl BatchProgress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.done == self.total
    }

    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.done as f32 / self.total as f32
    }
}

/// Tally the batch against the cache.
pub fn batch_progress(batch: &[TileId], cache: &TileCache) -> BatchProgress {
    let mut done = 0;
    let mut succeeded = 0;
    let mut first_error = None;

    for tile in batch {
        match cache.entry(tile) {
            Some(entry) if entry.is_terminal() => {
                done += 1;
                if entry.is_ok() {
                    succeeded += 1;
                } else if let TileEntry::Failed(message) = entry
                    && first_error.is_none()
                {
                    first_error = Some(message.clone());
                }
            }
            _ => {}
        }
    }

    BatchProgress {
        done,
        total: batch.len(),
        succeeded,
        first_error,
    }
}

/// Background task fetching one tile.
#[derive(Component)]
pub struct TileFetchTask {
    pub generation: u64,
    pub tile: TileId,
    pub task: Task<TileFetchResult>,
}

/// Background task resolving the address under a pin position.
#[derive(Component)]
pub struct ReverseLookupTask {
    pub generation: u64,
    pub seq: u64,
    /// The pin position the lookup was issued for
    pub position: LonLat,
    pub task: Task<GeocodeOutcome>,
}

/// Background task searching for a stop's saved address text.
#[derive(Component)]
pub struct AddressSearchTask {
    pub generation: u64,
    pub task: Task<GeocodeOutcome>,
}

/// Periodic sweep that re-queues failed tiles while the map is up.
#[derive(Resource)]
pub struct StalenessPoll {
    pub timer: Timer,
}

impl Default for StalenessPoll {
    fn default() -> Self {
        Self {
            timer: Timer::from_seconds(TILE_RETRY_PERIOD_SECS, TimerMode::Repeating),
        }
    }
}
