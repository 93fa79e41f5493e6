use crate::config::TileConfig;
use std::f64::consts::PI;

/// Deepest zoom the tile math accepts; `2^z` must fit comfortably in an i64.
pub const MAX_ZOOM: u8 = 30;

/// Number of tiles along one axis at `zoom`.
pub fn tile_count(zoom: u8) -> i64 {
    1i64 << zoom.min(MAX_ZOOM)
}

/// Wraps a tile column into `[0, 2^zoom)`, so tiles left of the first world or
/// right of the last one repeat the basemap.
pub fn normalize_x(x: i64, zoom: u8) -> i64 {
    x.rem_euclid(tile_count(zoom))
}

// Web Mercator
pub fn lat_lng_to_tile(lat: f64, lng: f64, zoom: u8) -> (i64, i64) {
    let n = tile_count(zoom) as f64;
    let x_t = (lng + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let y_t = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n;

    (x_t.floor() as i64, y_t.floor() as i64)
}

/// Expands a `{s}/{z}/{x}/{y}` URL template.
pub struct TileUrls {
    template: String,
    subdomains: Vec<String>,
}

impl TileUrls {
    pub fn new(config: &TileConfig) -> Self {
        Self {
            template: config.url_template.clone(),
            subdomains: config.subdomains.clone(),
        }
    }

    /// `x` is the raw column as requested by the map; it picks the subdomain
    /// and is normalized before it lands in the URL.
    pub fn url(&self, zoom: u8, x: i64, y: i64) -> String {
        let subdomain = if self.subdomains.is_empty() {
            ""
        } else {
            let i = (x.wrapping_add(y).unsigned_abs() % self.subdomains.len() as u64) as usize;
            self.subdomains[i].as_str()
        };

        self.template
            .replace("{s}", subdomain)
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &normalize_x(x, zoom).to_string())
            .replace("{y}", &y.to_string())
    }
}
