//! Centralized constants used across the application.
//!
//! This module contains magic numbers and configuration values that are used
//! in multiple places or would benefit from being named constants.

/// Default window width in pixels
pub const DEFAULT_WINDOW_WIDTH: f32 = 1280.0;

/// Default window height in pixels
pub const DEFAULT_WINDOW_HEIGHT: f32 = 800.0;

/// Width of the map viewport inside the location picker, in pixels
pub const MAP_VIEW_WIDTH: f32 = 720.0;

/// Height of the map viewport inside the location picker, in pixels
pub const MAP_VIEW_HEIGHT: f32 = 440.0;

/// Edge length of one slippy map tile in pixels
pub const TILE_SIZE_PX: u32 = 256;

/// Lowest zoom level the map view will step down to
pub const MIN_ZOOM: u8 = 1;

/// Highest zoom level the map view will step up to
pub const MAX_ZOOM: u8 = 19;

/// Zoom level used when the picker opens on known coordinates (street scale)
pub const CLOSE_ZOOM: u8 = 15;

/// Zoom level used when the picker opens without coordinates (country scale)
pub const WIDE_ZOOM: u8 = 6;

/// Seconds the picker waits for the initial tile batch before giving up
pub const MAP_LOAD_TIMEOUT_SECS: f32 = 15.0;

/// Seconds between retry sweeps for tiles that failed while the map is up
pub const TILE_RETRY_PERIOD_SECS: f32 = 5.0;

/// Maximum number of tile downloads running at the same time
pub const MAX_TILE_FETCHES_IN_FLIGHT: usize = 8;

/// Largest tile payload we will read from the network, in bytes
pub const MAX_TILE_BYTES: u64 = 4 * 1024 * 1024;

/// Seconds before a single tile download is abandoned
pub const TILE_FETCH_TIMEOUT_SECS: u64 = 10;

/// Seconds before a geocoding request is abandoned
pub const GEOCODE_TIMEOUT_SECS: u64 = 10;

/// How many candidates to ask the geocoder for when searching by address text
pub const FORWARD_GEOCODE_LIMIT: u8 = 1;

/// Pointer distance (pixels) within which a press grabs the marker pin
pub const MARKER_HIT_RADIUS_PX: f32 = 18.0;

/// Seconds a toast notification stays on screen
pub const TOAST_TTL_SECS: f32 = 4.0;

/// Maximum number of toast notifications shown at once
pub const MAX_TOASTS: usize = 4;

/// Longitude the map centers on when no stop coordinates are known (Lagos)
pub const DEFAULT_CENTER_LON: f64 = 3.3792;

/// Latitude the map centers on when no stop coordinates are known (Lagos)
pub const DEFAULT_CENTER_LAT: f64 = 6.5244;

/// Where the tile attribution link sends the user
pub const ATTRIBUTION_URL: &str = "https://www.openstreetmap.org/copyright";
