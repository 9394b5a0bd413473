//! Spherical ("Web") Mercator, EPSG:3857.

use std::f64::consts::PI;

use crate::MapProjection;

/// Sphere radius used by Web Mercator.
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Latitude limit at which the square world extent is clipped.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl MapProjection for WebMercator {
    fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = WEB_MERCATOR_RADIUS * lon_deg.to_radians();
        let y = WEB_MERCATOR_RADIUS * (PI / 4.0 + lat / 2.0).tan().ln();
        (x, y)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
        let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        (lon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_extent() {
        let (x, y) = WebMercator.forward(180.0, MAX_LATITUDE);
        assert!((x - 20_037_508.342_789_244).abs() < 1e-3);
        assert!((y - 20_037_508.342_789_244).abs() < 1e-3);
    }

    #[test]
    fn test_clamps_poles() {
        let (_, y) = WebMercator.forward(0.0, 90.0);
        assert!(y.is_finite());
    }

    #[test]
    fn test_roundtrip() {
        let (x, y) = WebMercator.forward(-74.006, 40.7128);
        let (lon, lat) = WebMercator.inverse(x, y);
        assert!((lon + 74.006).abs() < 1e-9);
        assert!((lat - 40.7128).abs() < 1e-9);
    }
}
