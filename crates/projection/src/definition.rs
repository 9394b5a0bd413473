//! Resolved projection definitions.

use serde::Serialize;

use crate::albers::AlbersEqualArea;
use crate::ellipsoid::Ellipsoid;
use crate::error::ProjectionError;
use crate::lambert::LambertConformal;
use crate::mercator::WebMercator;
use crate::sinusoidal::Sinusoidal;
use crate::transverse_mercator::TransverseMercator;
use crate::MapProjection;

/// Conic projection parameters in degrees and meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConicParams {
    pub lat_1: f64,
    pub lat_2: f64,
    pub lat_0: f64,
    pub lon_0: f64,
    pub x_0: f64,
    pub y_0: f64,
}

impl ConicParams {
    /// CONUS Albers (EPSG:5070) parameters.
    pub const CONUS_ALBERS: ConicParams = ConicParams {
        lat_1: 29.5,
        lat_2: 45.5,
        lat_0: 23.0,
        lon_0: -96.0,
        x_0: 0.0,
        y_0: 0.0,
    };

    /// Daymet Lambert Conformal parameters.
    pub const DAYMET_LCC: ConicParams = ConicParams {
        lat_1: 25.0,
        lat_2: 60.0,
        lat_0: 42.5,
        lon_0: -100.0,
        x_0: 0.0,
        y_0: 0.0,
    };
}

/// A projection family with its parameters, independent of any raster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ProjectionDefinition {
    Utm { zone: u8, south: bool },
    WebMercator,
    Albers(ConicParams),
    Sinusoidal { lon_0: f64, radius: f64 },
    LambertConformal(ConicParams),
}

impl ProjectionDefinition {
    /// PROJ-style definition string.
    pub fn to_proj_string(&self) -> String {
        match self {
            ProjectionDefinition::Utm { zone, south } => {
                let hemisphere = if *south { " +south" } else { "" };
                format!(
                    "+proj=utm +zone={}{} +datum=WGS84 +units=m +no_defs",
                    zone, hemisphere
                )
            }
            ProjectionDefinition::WebMercator => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 \
                 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs"
                .to_string(),
            ProjectionDefinition::Albers(p) => format!(
                "+proj=aea +lat_0={} +lon_0={} +lat_1={} +lat_2={} +x_0={} +y_0={} \
                 +ellps=GRS80 +units=m +no_defs",
                p.lat_0, p.lon_0, p.lat_1, p.lat_2, p.x_0, p.y_0
            ),
            ProjectionDefinition::Sinusoidal { lon_0, radius } => format!(
                "+proj=sinu +lon_0={} +x_0=0 +y_0=0 +R={} +units=m +no_defs",
                lon_0, radius
            ),
            ProjectionDefinition::LambertConformal(p) => format!(
                "+proj=lcc +lat_0={} +lon_0={} +lat_1={} +lat_2={} +x_0={} +y_0={} \
                 +ellps=WGS84 +units=m +no_defs",
                p.lat_0, p.lon_0, p.lat_1, p.lat_2, p.x_0, p.y_0
            ),
        }
    }

    /// Build the forward/inverse transform for this definition.
    pub fn projector(&self) -> Result<Box<dyn MapProjection>, ProjectionError> {
        Ok(match self {
            ProjectionDefinition::Utm { zone, south } => {
                if !(1..=60).contains(zone) {
                    return Err(ProjectionError::InvalidParameters(format!(
                        "UTM zone {} out of range",
                        zone
                    )));
                }
                Box::new(TransverseMercator::utm(*zone, *south))
            }
            ProjectionDefinition::WebMercator => Box::new(WebMercator),
            ProjectionDefinition::Albers(p) => Box::new(AlbersEqualArea::new(
                p.lat_1,
                p.lat_2,
                p.lat_0,
                p.lon_0,
                p.x_0,
                p.y_0,
                Ellipsoid::GRS80,
            )?),
            ProjectionDefinition::Sinusoidal { lon_0, radius } => {
                Box::new(Sinusoidal::new(*lon_0, *radius, 0.0, 0.0))
            }
            ProjectionDefinition::LambertConformal(p) => Box::new(LambertConformal::new(
                p.lat_1,
                p.lat_2,
                p.lat_0,
                p.lon_0,
                p.x_0,
                p.y_0,
                Ellipsoid::WGS84,
            )?),
        })
    }
}

/// Projected envelope `(min_x, min_y, max_x, max_y)` of a lon/lat box.
///
/// Samples `steps` points along each edge so curved parallels on conic
/// grids stay inside the envelope. With `steps == 1` only the corners
/// are used.
pub fn project_envelope(
    projection: &dyn MapProjection,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    steps: usize,
) -> (f64, f64, f64, f64) {
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;

    let steps = steps.max(1);
    for s in 0..=steps {
        let frac = s as f64 / steps as f64;
        let lon = west + frac * (east - west);
        let lat = south + frac * (north - south);

        for (px, py) in [
            // Bottom and top edges
            (lon, south),
            (lon, north),
            // Left and right edges
            (west, lat),
            (east, lat),
        ] {
            let (x, y) = projection.forward(px, py);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    (min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_proj_strings() {
        let north = ProjectionDefinition::Utm {
            zone: 33,
            south: false,
        };
        assert_eq!(
            north.to_proj_string(),
            "+proj=utm +zone=33 +datum=WGS84 +units=m +no_defs"
        );
        let south = ProjectionDefinition::Utm {
            zone: 56,
            south: true,
        };
        assert!(south.to_proj_string().contains("+zone=56 +south"));
    }

    #[test]
    fn test_albers_proj_string() {
        let def = ProjectionDefinition::Albers(ConicParams::CONUS_ALBERS);
        let s = def.to_proj_string();
        assert!(s.starts_with("+proj=aea"));
        assert!(s.contains("+lat_1=29.5"));
        assert!(s.contains("+lon_0=-96"));
    }

    #[test]
    fn test_invalid_utm_zone() {
        let def = ProjectionDefinition::Utm {
            zone: 0,
            south: false,
        };
        assert!(def.projector().is_err());
    }

    #[test]
    fn test_envelope_contains_corners() {
        let proj = ProjectionDefinition::LambertConformal(ConicParams::DAYMET_LCC)
            .projector()
            .unwrap();
        let (min_x, min_y, max_x, max_y) =
            project_envelope(proj.as_ref(), -110.0, 35.0, -100.0, 45.0, 10);
        for (lon, lat) in [(-110.0, 35.0), (-100.0, 45.0), (-105.0, 45.0)] {
            let (x, y) = proj.forward(lon, lat);
            assert!(x >= min_x && x <= max_x);
            assert!(y >= min_y && y <= max_y);
        }
    }
}
