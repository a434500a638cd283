//! Web Mercator math shared by the map view and the geocoder.
//!
//! Everything here works in "world pixels": the whole map at a given zoom is
//! a square of `TILE_SIZE_PX * 2^zoom` pixels, and tiles are 256px slices of
//! that square addressed by `TileId`.

use serde::{Deserialize, Serialize};

use crate::constants::TILE_SIZE_PX;

/// Latitudes beyond this cannot be projected onto the square Mercator map.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// A point on the globe, longitude first to match GeoJSON ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    /// Degrees east, in [-180, 180]
    pub lon: f64,
    /// Degrees north, in [-90, 90]
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Clamp into the range the Mercator projection can represent.
    pub fn clamped(self) -> Self {
        Self {
            lon: self.lon.clamp(-180.0, 180.0),
            lat: self.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT),
        }
    }
}

/// Address of one slippy-map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileId {
    /// World-pixel position of this tile's top-left corner.
    pub fn origin_world_px(&self) -> (f64, f64) {
        (
            self.x as f64 * TILE_SIZE_PX as f64,
            self.y as f64 * TILE_SIZE_PX as f64,
        )
    }
}

/// Number of tiles along one edge of the world at the given zoom.
pub fn tiles_per_side(zoom: u8) -> u32 {
    1u32 << zoom.min(31)
}

/// Edge length of the whole world map in pixels at the given zoom.
pub fn world_extent_px(zoom: u8) -> f64 {
    tiles_per_side(zoom) as f64 * TILE_SIZE_PX as f64
}

/// Project a point to world pixels at the given zoom.
pub fn world_px(pos: LonLat, zoom: u8) -> (f64, f64) {
    let pos = pos.clamped();
    let extent = world_extent_px(zoom);
    let x = (pos.lon + 180.0) / 360.0 * extent;
    let lat_rad = pos.lat.to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * extent;
    (x, y)
}

/// Inverse of [`world_px`]: recover the point under a world-pixel position.
pub fn lonlat_from_world_px(x: f64, y: f64, zoom: u8) -> LonLat {
    let extent = world_extent_px(zoom);
    let lon = x / extent * 360.0 - 180.0;
    let merc_y = std::f64::consts::PI * (1.0 - 2.0 * y / extent);
    let lat = merc_y.sinh().atan().to_degrees();
    LonLat::new(lon, lat).clamped()
}

/// Tile containing the given point.
pub fn tile_at(pos: LonLat, zoom: u8) -> TileId {
    let (x, y) = world_px(pos, zoom);
    let max = tiles_per_side(zoom) - 1;
    TileId {
        x: ((x / TILE_SIZE_PX as f64).floor() as i64).clamp(0, max as i64) as u32,
        y: ((y / TILE_SIZE_PX as f64).floor() as i64).clamp(0, max as i64) as u32,
        zoom,
    }
}

/// Tiles needed to cover a `width_px` x `height_px` viewport centered on a point.
///
/// Indices are clamped to the world edge rather than wrapped, so a viewport
/// hanging off the map simply lists fewer tiles.
pub fn visible_tiles(center: LonLat, zoom: u8, width_px: f32, height_px: f32) -> Vec<TileId> {
    let (cx, cy) = world_px(center, zoom);
    let half_w = width_px as f64 / 2.0;
    let half_h = height_px as f64 / 2.0;
    let max = (tiles_per_side(zoom) - 1) as i64;
    let tile = TILE_SIZE_PX as f64;

    let min_x = (((cx - half_w) / tile).floor() as i64).clamp(0, max);
    let max_x = (((cx + half_w) / tile).floor() as i64).clamp(0, max);
    let min_y = (((cy - half_h) / tile).floor() as i64).clamp(0, max);
    let max_y = (((cy + half_h) / tile).floor() as i64).clamp(0, max);

    let mut tiles = Vec::new();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            tiles.push(TileId {
                x: x as u32,
                y: y as u32,
                zoom,
            });
        }
    }
    tiles
}
