//! Sinusoidal equal-area projection on a sphere (MODIS grid).

use crate::ellipsoid::wrap_pi;
use crate::MapProjection;

/// Sphere radius of the MODIS sinusoidal grid.
pub const MODIS_SPHERE_RADIUS: f64 = 6_371_007.181;

#[derive(Debug, Clone)]
pub struct Sinusoidal {
    /// Central meridian in radians
    pub lon0: f64,
    pub radius: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl Sinusoidal {
    pub fn new(lon0_deg: f64, radius: f64, false_easting: f64, false_northing: f64) -> Self {
        Self {
            lon0: lon0_deg.to_radians(),
            radius,
            false_easting,
            false_northing,
        }
    }

    pub fn modis() -> Self {
        Self::new(0.0, MODIS_SPHERE_RADIUS, 0.0, 0.0)
    }
}

impl MapProjection for Sinusoidal {
    fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let phi = lat_deg.to_radians();
        let dlon = wrap_pi(lon_deg.to_radians() - self.lon0);
        (
            self.radius * dlon * phi.cos() + self.false_easting,
            self.radius * phi + self.false_northing,
        )
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let phi = (y - self.false_northing) / self.radius;
        let cos_phi = phi.cos();
        let lam = if cos_phi.abs() < 1e-12 {
            self.lon0
        } else {
            self.lon0 + (x - self.false_easting) / (self.radius * cos_phi)
        };
        (lam.to_degrees(), phi.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equator_is_arc_length() {
        let proj = Sinusoidal::modis();
        let (x, y) = proj.forward(10.0, 0.0);
        assert!((x - MODIS_SPHERE_RADIUS * 10f64.to_radians()).abs() < 1e-6);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_meridians_converge() {
        let proj = Sinusoidal::modis();
        let (x_eq, _) = proj.forward(10.0, 0.0);
        let (x_60, _) = proj.forward(10.0, 60.0);
        assert!((x_60 - x_eq / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_roundtrip() {
        let proj = Sinusoidal::modis();
        let (x, y) = proj.forward(-100.0, 45.0);
        let (lon, lat) = proj.inverse(x, y);
        assert!((lon + 100.0).abs() < 1e-9);
        assert!((lat - 45.0).abs() < 1e-9);
    }
}
