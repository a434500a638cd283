//! Downloading and decoding slippy-map tiles.

use std::io::Read;
use std::time::Duration;

use crate::constants::{MAX_TILE_BYTES, TILE_FETCH_TIMEOUT_SECS};
use crate::geo::TileId;

/// Decoded RGBA pixels for one tile, ready for texture upload.
#[derive(Debug, Clone)]
pub struct DecodedTile {
    /// Width and height in pixels
    pub size: [usize; 2],
    /// Tightly packed RGBA bytes, row-major
    pub rgba: Vec<u8>,
}

/// Outcome of one tile download.
#[derive(Debug)]
pub struct TileFetchResult {
    /// Which tile this answers for
    pub tile: TileId,
    /// Decoded pixels on success
    pub image: Option<DecodedTile>,
    /// Human-readable failure on error
    pub error: Option<String>,
}

impl TileFetchResult {
    pub fn success(tile: TileId, image: DecodedTile) -> Self {
        Self {
            tile,
            image: Some(image),
            error: None,
        }
    }

    pub fn error(tile: TileId, message: String) -> Self {
        Self {
            tile,
            image: None,
            error: Some(message),
        }
    }
}

/// Fill a `{z}/{x}/{y}` URL template, appending the access key if one is set.
pub fn tile_url(template: &str, access_key: Option<&str>, tile: TileId) -> String {
    let mut url = template
        .replace("{z}", &tile.zoom.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string());

    if let Some(key) = access_key.filter(|k| !k.is_empty()) {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str("key=");
        url.push_str(key);
    }
    url
}

/// Download and decode one tile. Blocks on network I/O.
pub fn fetch_tile(
    template: &str,
    access_key: Option<&str>,
    user_agent: &str,
    tile: TileId,
) -> TileFetchResult {
    let url = tile_url(template, access_key, tile);
    let response = ureq::get(&url)
        .set("User-Agent", user_agent)
        .timeout(Duration::from_secs(TILE_FETCH_TIMEOUT_SECS))
        .call();

    match response {
        Ok(resp) => {
            let mut bytes = Vec::new();
            if let Err(e) = resp
                .into_reader()
                .take(MAX_TILE_BYTES)
                .read_to_end(&mut bytes)
            {
                return TileFetchResult::error(tile, format!("Failed to read tile: {}", e));
            }
            match decode_tile(&bytes) {
                Ok(image) => TileFetchResult::success(tile, image),
                Err(e) => TileFetchResult::error(tile, e),
            }
        }
        Err(ureq::Error::Status(code, _)) => {
            TileFetchResult::error(tile, format!("Tile server returned HTTP {}", code))
        }
        Err(e) => TileFetchResult::error(tile, format!("Failed to fetch tile: {}", e)),
    }
}

/// Decode tile bytes (PNG, JPEG, or WebP) into RGBA pixels.
pub fn decode_tile(bytes: &[u8]) -> Result<DecodedTile, String> {
    let image =
        image::load_from_memory(bytes).map_err(|e| format!("Failed to decode tile: {}", e))?;
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(DecodedTile {
        size,
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: TileId = TileId {
        x: 17,
        y: 23,
        zoom: 6,
    };

    #[test]
    fn test_tile_url_fills_placeholders() {
        let url = tile_url("https://tile.example.org/{z}/{x}/{y}.png", None, TILE);
        assert_eq!(url, "https://tile.example.org/6/17/23.png");
    }

    #[test]
    fn test_tile_url_appends_key() {
        let url = tile_url(
            "https://tile.example.org/{z}/{x}/{y}.png",
            Some("abc123"),
            TILE,
        );
        assert_eq!(url, "https://tile.example.org/6/17/23.png?key=abc123");
    }

    #[test]
    fn test_tile_url_key_joins_existing_query() {
        let url = tile_url(
            "https://tile.example.org/{z}/{x}/{y}.png?style=dark",
            Some("abc123"),
            TILE,
        );
        assert_eq!(
            url,
            "https://tile.example.org/6/17/23.png?style=dark&key=abc123"
        );
    }

    #[test]
    fn test_tile_url_empty_key_ignored() {
        let url = tile_url("https://tile.example.org/{z}/{x}/{y}.png", Some(""), TILE);
        assert_eq!(url, "https://tile.example.org/6/17/23.png");
    }

    #[test]
    fn test_decode_tile_round_trip() {
        use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255])));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();

        let decoded = decode_tile(bytes.get_ref()).unwrap();
        assert_eq!(decoded.size, [2, 2]);
        assert_eq!(decoded.rgba.len(), 16);
        assert_eq!(&decoded.rgba[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_tile_rejects_garbage() {
        let result = decode_tile(b"this is not an image");
        assert!(result.is_err());
    }

    #[test]
    fn test_fetch_result_helpers() {
        let ok = TileFetchResult::success(
            TILE,
            DecodedTile {
                size: [1, 1],
                rgba: vec![0, 0, 0, 255],
            },
        );
        assert!(ok.image.is_some());
        assert!(ok.error.is_none());

        let err = TileFetchResult::error(TILE, "boom".to_string());
        assert!(err.image.is_none());
        assert_eq!(err.error, Some("boom".to_string()));
    }
}
