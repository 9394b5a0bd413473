//! Transverse Mercator projection (ellipsoidal), including UTM zones.
//!
//! Uses the Snyder series expansions, accurate to well under a meter
//! within a few degrees of the central meridian.

use crate::ellipsoid::{wrap_pi, Ellipsoid};
use crate::MapProjection;

/// UTM scale factor on the central meridian.
pub const UTM_SCALE: f64 = 0.9996;
/// UTM false easting.
pub const UTM_FALSE_EASTING: f64 = 500_000.0;
/// UTM false northing in the southern hemisphere.
pub const UTM_SOUTH_FALSE_NORTHING: f64 = 10_000_000.0;

#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    /// Latitude of origin in radians
    pub lat0: f64,
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub ellipsoid: Ellipsoid,
    /// Meridian arc at the latitude of origin
    m0: f64,
}

impl TransverseMercator {
    pub fn new(
        lon0_deg: f64,
        lat0_deg: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
        ellipsoid: Ellipsoid,
    ) -> Self {
        let lat0 = lat0_deg.to_radians();
        Self {
            lon0: lon0_deg.to_radians(),
            lat0,
            k0,
            false_easting,
            false_northing,
            ellipsoid,
            m0: ellipsoid.meridian_arc(lat0),
        }
    }

    /// UTM zone on WGS84. Zones are 1-60.
    pub fn utm(zone: u8, south: bool) -> Self {
        let false_northing = if south { UTM_SOUTH_FALSE_NORTHING } else { 0.0 };
        Self::new(
            utm_central_meridian(zone),
            0.0,
            UTM_SCALE,
            UTM_FALSE_EASTING,
            false_northing,
            Ellipsoid::WGS84,
        )
    }
}

/// Central meridian of a UTM zone in degrees.
pub fn utm_central_meridian(zone: u8) -> f64 {
    zone as f64 * 6.0 - 183.0
}

/// UTM zone containing a longitude in degrees.
pub fn utm_zone_for_longitude(lon_deg: f64) -> u8 {
    let zone = ((lon_deg + 180.0) / 6.0).floor() as i64 + 1;
    zone.clamp(1, 60) as u8
}

impl MapProjection for TransverseMercator {
    fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let ep2 = self.ellipsoid.ep2();

        let phi = lat_deg.to_radians();
        let dlon = wrap_pi(lon_deg.to_radians() - self.lon0);

        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let aa = cos_phi * dlon;
        let m = self.ellipsoid.meridian_arc(phi);

        let a2 = aa * aa;
        let a3 = a2 * aa;
        let a4 = a3 * aa;
        let a5 = a4 * aa;
        let a6 = a5 * aa;

        let x = self.k0
            * n
            * (aa + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0);
        let y = self.k0
            * (m - self.m0
                + n * tan_phi
                    * (a2 / 2.0
                        + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

        (x + self.false_easting, y + self.false_northing)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let ep2 = self.ellipsoid.ep2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        let m = self.m0 + (y - self.false_northing) / self.k0;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let sq = (1.0 - e2).sqrt();
        let e1 = (1.0 - sq) / (1.0 + sq);

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin1 = phi1.sin();
        let cos1 = phi1.cos();
        let tan1 = phi1.tan();
        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = a / w.sqrt();
        let r1 = a * (1.0 - e2) / w.powf(1.5);
        let d = (x - self.false_easting) / (n1 * self.k0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);
        let lam = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5
                    / 120.0)
                / cos1;

        (lam.to_degrees(), phi.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_meridian_maps_to_false_easting() {
        let tm = TransverseMercator::utm(33, false);
        let (x, y) = tm.forward(15.0, 0.0);
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);

        let (x, y) = tm.forward(15.0, 45.0);
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!((y - 4_982_950.4).abs() < 1.0, "northing was {}", y);
    }

    #[test]
    fn test_southern_false_northing() {
        let tm = TransverseMercator::utm(56, true);
        let (_, y) = tm.forward(153.0, -27.5);
        assert!(y > 6_900_000.0 && y < 7_000_000.0, "northing was {}", y);
    }

    #[test]
    fn test_roundtrip() {
        let tm = TransverseMercator::utm(10, false);
        let (x, y) = tm.forward(-122.4, 37.8);
        let (lon, lat) = tm.inverse(x, y);
        assert!((lon + 122.4).abs() < 1e-6, "lon {}", lon);
        assert!((lat - 37.8).abs() < 1e-6, "lat {}", lat);
    }

    #[test]
    fn test_zone_helpers() {
        assert_eq!(utm_zone_for_longitude(-122.4), 10);
        assert_eq!(utm_zone_for_longitude(15.0), 33);
        assert_eq!(utm_zone_for_longitude(180.0), 60);
        assert_eq!(utm_central_meridian(33), 15.0);
    }
}
