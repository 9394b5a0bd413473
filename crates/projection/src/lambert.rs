//! Lambert Conformal Conic projection (ellipsoidal, two standard parallels).
//!
//! This projection is used by gridded climate products such as Daymet,
//! whose arrays are indexed by projected x/y meters rather than lat/lon.
//!
//! The projection parameters include:
//! - Latitude of origin (lat0) and central meridian (lon0)
//! - Standard parallels lat1 and lat2 (equal for a tangent cone)
//! - False easting/northing in meters

use std::f64::consts::PI;

use crate::ellipsoid::{wrap_pi, Ellipsoid};
use crate::error::ProjectionError;
use crate::MapProjection;

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// Latitude of origin in radians
    pub lat0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub ellipsoid: Ellipsoid,
    /// Cone constant (n)
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the latitude of origin
    rho0: f64,
}

impl LambertConformal {
    /// Create a new Lambert Conformal projection.
    ///
    /// # Arguments
    /// * `latin1_deg` - First standard parallel (degrees)
    /// * `latin2_deg` - Second standard parallel (degrees)
    /// * `lat0_deg` - Latitude of origin (degrees)
    /// * `lon0_deg` - Central meridian (degrees)
    /// * `false_easting`, `false_northing` - Offsets in meters
    pub fn new(
        latin1_deg: f64,
        latin2_deg: f64,
        lat0_deg: f64,
        lon0_deg: f64,
        false_easting: f64,
        false_northing: f64,
        ellipsoid: Ellipsoid,
    ) -> Result<Self, ProjectionError> {
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();
        let lat0 = lat0_deg.to_radians();
        let e = ellipsoid.e();

        let m1 = m(latin1, &ellipsoid);
        let t1 = t(latin1, e);

        // Compute cone constant n
        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone (single standard parallel)
            latin1.sin()
        } else {
            // Secant cone (two standard parallels)
            let m2 = m(latin2, &ellipsoid);
            let t2 = t(latin2, e);
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        if n.abs() < 1e-10 || !n.is_finite() {
            return Err(ProjectionError::InvalidParameters(format!(
                "Lambert standard parallels {} and {} produce a degenerate cone",
                latin1_deg, latin2_deg
            )));
        }

        // Compute F constant
        let f = m1 / (n * t1.powf(n));

        // Compute rho at the latitude of origin
        let rho0 = ellipsoid.a * f * t(lat0, e).powf(n);

        Ok(Self {
            lon0: lon0_deg.to_radians(),
            lat0,
            latin1,
            latin2,
            false_easting,
            false_northing,
            ellipsoid,
            n,
            f,
            rho0,
        })
    }

    /// Daymet North America projection.
    ///
    /// Daymet uses Lambert Conformal with:
    /// - Standard parallels: 25°N and 60°N
    /// - Origin: 42.5°N, 100°W
    /// - WGS84 ellipsoid, no false offsets
    pub fn daymet() -> Result<Self, ProjectionError> {
        Self::new(25.0, 60.0, 42.5, -100.0, 0.0, 0.0, Ellipsoid::WGS84)
    }
}

fn m(phi: f64, ell: &Ellipsoid) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - ell.e2() * s * s).sqrt()
}

fn t(phi: f64, e: f64) -> f64 {
    let s = phi.sin();
    (PI / 4.0 - phi / 2.0).tan() / ((1.0 - e * s) / (1.0 + e * s)).powf(e / 2.0)
}

impl MapProjection for LambertConformal {
    /// Geographic degrees to projected meters.
    fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let e = self.ellipsoid.e();

        // Normalize longitude difference to [-π, π]
        let dlon = wrap_pi(lon_deg.to_radians() - self.lon0);

        // Compute rho for this latitude
        let rho = self.ellipsoid.a * self.f * t(lat, e).powf(self.n);

        // Compute theta (angle from central meridian)
        let theta = self.n * dlon;

        (
            rho * theta.sin() + self.false_easting,
            self.rho0 - rho * theta.cos() + self.false_northing,
        )
    }

    /// Projected meters to geographic degrees.
    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let e = self.ellipsoid.e();
        let dx = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);

        // Compute rho and theta from x, y
        let sign = self.n.signum();
        let rho = sign * (dx * dx + dy * dy).sqrt();
        let theta = (sign * dx).atan2(sign * dy);

        let t_val = (rho / (self.ellipsoid.a * self.f)).powf(1.0 / self.n);

        // Iterate for latitude
        let mut lat = PI / 2.0 - 2.0 * t_val.atan();
        for _ in 0..15 {
            let s = lat.sin();
            let next = PI / 2.0 - 2.0 * (t_val * ((1.0 - e * s) / (1.0 + e * s)).powf(e / 2.0)).atan();
            let delta = (next - lat).abs();
            lat = next;
            if delta < 1e-12 {
                break;
            }
        }

        let lon = self.lon0 + theta / self.n;
        (lon.to_degrees(), lat.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_zero() {
        let proj = LambertConformal::daymet().unwrap();
        let (x, y) = proj.forward(-100.0, 42.5);
        assert!(x.abs() < 1e-6, "x should be ~0, got {}", x);
        assert!(y.abs() < 1e-6, "y should be ~0, got {}", y);
    }

    #[test]
    fn test_daymet_roundtrip() {
        let proj = LambertConformal::daymet().unwrap();

        let (x, y) = proj.forward(-94.5, 39.0);
        let (lon, lat) = proj.inverse(x, y);

        assert!((lon + 94.5).abs() < 1e-8, "lon roundtrip failed: {}", lon);
        assert!((lat - 39.0).abs() < 1e-8, "lat roundtrip failed: {}", lat);
    }

    #[test]
    fn test_daymet_extent() {
        let proj = LambertConformal::daymet().unwrap();

        // Daymet's grid spans roughly x in [-4.56e6, 3.25e6], y in [-3.09e6, 4.98e6]
        let (x, _) = proj.forward(-124.0, 48.0);
        assert!(x < -1_500_000.0 && x > -4_560_000.0, "western US x = {}", x);
        let (_, y) = proj.forward(-100.0, 20.0);
        assert!(y < -2_000_000.0, "southern y = {}", y);
    }

    #[test]
    fn test_meridians_converge_north() {
        let proj = LambertConformal::daymet().unwrap();
        let (x_south, _) = proj.forward(-90.0, 30.0);
        let (x_north, _) = proj.forward(-90.0, 55.0);
        assert!(x_north < x_south);
    }
}
