//! Albers Equal-Area Conic projection (ellipsoidal).
//!
//! The CONUS Albers grid (EPSG:5070) used by many US land-cover and burn
//! severity products is the common case.

use crate::ellipsoid::{wrap_pi, Ellipsoid};
use crate::error::ProjectionError;
use crate::MapProjection;

#[derive(Debug, Clone)]
pub struct AlbersEqualArea {
    /// Central meridian in radians
    pub lon0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub ellipsoid: Ellipsoid,
    /// Cone constant
    n: f64,
    c: f64,
    rho0: f64,
}

impl AlbersEqualArea {
    /// Build from standard parallels and origin in degrees.
    pub fn new(
        lat1_deg: f64,
        lat2_deg: f64,
        lat0_deg: f64,
        lon0_deg: f64,
        false_easting: f64,
        false_northing: f64,
        ellipsoid: Ellipsoid,
    ) -> Result<Self, ProjectionError> {
        let phi1 = lat1_deg.to_radians();
        let phi2 = lat2_deg.to_radians();
        let phi0 = lat0_deg.to_radians();

        let m1 = m(phi1, &ellipsoid);
        let m2 = m(phi2, &ellipsoid);
        let q0 = q(phi0, &ellipsoid);
        let q1 = q(phi1, &ellipsoid);
        let q2 = q(phi2, &ellipsoid);

        let n = if (phi1 - phi2).abs() < 1e-10 {
            phi1.sin()
        } else {
            (m1 * m1 - m2 * m2) / (q2 - q1)
        };
        if n.abs() < 1e-10 || !n.is_finite() {
            return Err(ProjectionError::InvalidParameters(format!(
                "Albers standard parallels {} and {} produce a degenerate cone",
                lat1_deg, lat2_deg
            )));
        }

        let c = m1 * m1 + n * q1;
        let rho0 = ellipsoid.a * (c - n * q0).max(0.0).sqrt() / n;

        Ok(Self {
            lon0: lon0_deg.to_radians(),
            false_easting,
            false_northing,
            ellipsoid,
            n,
            c,
            rho0,
        })
    }

    /// Authalic latitude from q, by fixed-point iteration.
    fn phi_from_q(&self, q_val: f64) -> f64 {
        let e2 = self.ellipsoid.e2();
        let e = self.ellipsoid.e();
        let mut phi = (q_val / 2.0).clamp(-1.0, 1.0).asin();
        for _ in 0..15 {
            let sin_phi = phi.sin();
            let w = 1.0 - e2 * sin_phi * sin_phi;
            let delta = w * w / (2.0 * phi.cos())
                * (q_val / (1.0 - e2) - sin_phi / w
                    + 1.0 / (2.0 * e) * ((1.0 - e * sin_phi) / (1.0 + e * sin_phi)).ln());
            phi += delta;
            if delta.abs() < 1e-12 {
                break;
            }
        }
        phi
    }
}

fn m(phi: f64, ell: &Ellipsoid) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - ell.e2() * s * s).sqrt()
}

fn q(phi: f64, ell: &Ellipsoid) -> f64 {
    let e = ell.e();
    let e2 = ell.e2();
    let s = phi.sin();
    (1.0 - e2) * (s / (1.0 - e2 * s * s) - (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln())
}

impl MapProjection for AlbersEqualArea {
    fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let phi = lat_deg.to_radians();
        let dlon = wrap_pi(lon_deg.to_radians() - self.lon0);
        let rho = self.ellipsoid.a * (self.c - self.n * q(phi, &self.ellipsoid)).max(0.0).sqrt()
            / self.n;
        let theta = self.n * dlon;
        (
            rho * theta.sin() + self.false_easting,
            self.rho0 - rho * theta.cos() + self.false_northing,
        )
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);
        let sign = self.n.signum();
        let rho = (dx * dx + dy * dy).sqrt() * sign;
        let theta = (sign * dx).atan2(sign * dy);
        let a = self.ellipsoid.a;
        let q_val = (self.c - (rho * self.n / a).powi(2)) / self.n;
        let phi = self.phi_from_q(q_val);
        let lam = self.lon0 + theta / self.n;
        (lam.to_degrees(), phi.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conus() -> AlbersEqualArea {
        AlbersEqualArea::new(29.5, 45.5, 23.0, -96.0, 0.0, 0.0, Ellipsoid::GRS80).unwrap()
    }

    #[test]
    fn test_origin_maps_to_false_origin() {
        let proj = conus();
        let (x, y) = proj.forward(-96.0, 23.0);
        assert!(x.abs() < 1e-6, "x {}", x);
        assert!(y.abs() < 1e-6, "y {}", y);
    }

    #[test]
    fn test_known_point() {
        // Denver in EPSG:5070
        let proj = conus();
        let (x, y) = proj.forward(-104.99, 39.74);
        assert!((x + 762_375.2).abs() < 1.0, "x {}", x);
        assert!((y - 1_893_930.4).abs() < 1.0, "y {}", y);
    }

    #[test]
    fn test_roundtrip() {
        let proj = conus();
        let (x, y) = proj.forward(-80.2, 25.8);
        let (lon, lat) = proj.inverse(x, y);
        assert!((lon + 80.2).abs() < 1e-8, "lon {}", lon);
        assert!((lat - 25.8).abs() < 1e-8, "lat {}", lat);
    }

    #[test]
    fn test_degenerate_cone_rejected() {
        assert!(AlbersEqualArea::new(30.0, -30.0, 0.0, 0.0, 0.0, 0.0, Ellipsoid::GRS80).is_err());
    }
}
