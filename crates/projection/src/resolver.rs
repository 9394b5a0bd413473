//! Map raster GeoKeys to a projection definition.
//!
//! Rules are tried in a fixed order and the first match wins. A raster
//! whose keys match nothing resolves to `None` and callers treat its
//! pixel coordinates as already geographic.

use tracing::{debug, warn};

use crate::definition::{ConicParams, ProjectionDefinition};
use crate::geokeys::{method, GeoKeys, MODEL_TYPE_GEOGRAPHIC};
use crate::sinusoidal::MODIS_SPHERE_RADIUS;
use crate::transverse_mercator::{utm_zone_for_longitude, UTM_SOUTH_FALSE_NORTHING};

/// Projected EPSG codes known to be CONUS Albers variants.
const ALBERS_CODES: &[u16] = &[5070, 5071, 5072, 6350, 6703];

/// Web Mercator codes, including the retired aliases.
const WEB_MERCATOR_CODES: &[u16] = &[3857, 3785, 3587];

/// Resolve the projection of a raster from its GeoKeys.
pub fn resolve_projection(keys: &GeoKeys) -> Option<ProjectionDefinition> {
    let projected = keys.projected_type;

    // Geographic rasters need no projection
    if projected.is_none()
        && (keys.geographic_type == Some(4326) || keys.model_type == Some(MODEL_TYPE_GEOGRAPHIC))
    {
        debug!("Raster is geographic, no projection needed");
        return None;
    }

    if let Some(code) = projected {
        if (32601..=32660).contains(&code) {
            return Some(ProjectionDefinition::Utm {
                zone: (code - 32600) as u8,
                south: false,
            });
        }
        if (32701..=32760).contains(&code) {
            return Some(ProjectionDefinition::Utm {
                zone: (code - 32700) as u8,
                south: true,
            });
        }
        if WEB_MERCATOR_CODES.contains(&code) {
            return Some(ProjectionDefinition::WebMercator);
        }
    }

    let citation = keys.citation.as_deref().unwrap_or("");
    let citation_lower = citation.to_ascii_lowercase();

    let is_albers = projected.is_some_and(|c| ALBERS_CODES.contains(&c))
        || keys.coord_transform == Some(method::ALBERS_EQUAL_AREA)
        || citation_lower.contains("albers");
    if is_albers {
        return Some(ProjectionDefinition::Albers(albers_params(keys)));
    }

    if let Some((zone, south)) = parse_utm_citation(citation) {
        return Some(ProjectionDefinition::Utm { zone, south });
    }

    if keys.coord_transform == Some(method::TRANSVERSE_MERCATOR) {
        let p = &keys.params;
        if let Some(lon0) = p.central_meridian() {
            let zone = utm_zone_for_longitude(lon0);
            let south = p
                .false_northing
                .is_some_and(|fn_| (fn_ - UTM_SOUTH_FALSE_NORTHING).abs() < 1.0);
            return Some(ProjectionDefinition::Utm { zone, south });
        }
    }

    if keys.coord_transform == Some(method::SINUSOIDAL) || citation_lower.contains("sinusoidal") {
        return Some(ProjectionDefinition::Sinusoidal {
            lon_0: keys.params.central_meridian().unwrap_or(0.0),
            radius: MODIS_SPHERE_RADIUS,
        });
    }

    if keys.coord_transform == Some(method::LAMBERT_CONFORMAL_2SP) {
        let p = &keys.params;
        if let (Some(lat_1), Some(lat_2), Some(lon_0)) =
            (p.std_parallel_1, p.std_parallel_2, p.central_meridian())
        {
            return Some(ProjectionDefinition::LambertConformal(ConicParams {
                lat_1,
                lat_2,
                lat_0: p.origin_latitude().unwrap_or(lat_1),
                lon_0,
                x_0: p.false_easting.unwrap_or(0.0),
                y_0: p.false_northing.unwrap_or(0.0),
            }));
        }
    }

    warn!(
        projected_type = ?projected,
        geographic_type = ?keys.geographic_type,
        coord_transform = ?keys.coord_transform,
        citation = %citation,
        "Unrecognized projection, treating raster as geographic"
    );
    None
}

/// Albers parameters from tags, falling back to CONUS defaults per field.
fn albers_params(keys: &GeoKeys) -> ConicParams {
    let p = &keys.params;
    let d = ConicParams::CONUS_ALBERS;
    ConicParams {
        lat_1: p.std_parallel_1.unwrap_or(d.lat_1),
        lat_2: p.std_parallel_2.unwrap_or(d.lat_2),
        lat_0: p.origin_latitude().unwrap_or(d.lat_0),
        lon_0: p.central_meridian().unwrap_or(d.lon_0),
        x_0: p.false_easting.unwrap_or(d.x_0),
        y_0: p.false_northing.unwrap_or(d.y_0),
    }
}

/// Extract `(zone, south)` from text like "WGS 84 / UTM zone 33S".
///
/// A missing hemisphere letter means north.
pub fn parse_utm_citation(citation: &str) -> Option<(u8, bool)> {
    let lower = citation.to_ascii_lowercase();
    let idx = lower.find("utm zone")?;
    let rest = citation[idx + "utm zone".len()..].trim_start();

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let zone: u8 = digits.parse().ok()?;
    if !(1..=60).contains(&zone) {
        return None;
    }

    let south = matches!(
        rest[digits.len()..].trim_start().chars().next(),
        Some('S') | Some('s')
    );
    Some((zone, south))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geokeys::{MODEL_TYPE_PROJECTED, USER_DEFINED};

    #[test]
    fn test_geographic_is_none() {
        assert_eq!(resolve_projection(&GeoKeys::geographic_wgs84()), None);
    }

    #[test]
    fn test_utm_codes() {
        assert_eq!(
            resolve_projection(&GeoKeys::projected(32633)),
            Some(ProjectionDefinition::Utm {
                zone: 33,
                south: false
            })
        );
        assert_eq!(
            resolve_projection(&GeoKeys::projected(32756)),
            Some(ProjectionDefinition::Utm {
                zone: 56,
                south: true
            })
        );
    }

    #[test]
    fn test_utm_proj_strings() {
        let north = resolve_projection(&GeoKeys::projected(32633)).unwrap();
        assert_eq!(
            north.to_proj_string(),
            "+proj=utm +zone=33 +datum=WGS84 +units=m +no_defs"
        );
        assert!(!north.to_proj_string().contains("+south"));

        let south = resolve_projection(&GeoKeys::projected(32733)).unwrap();
        assert_eq!(
            south.to_proj_string(),
            "+proj=utm +zone=33 +south +datum=WGS84 +units=m +no_defs"
        );
    }

    #[test]
    fn test_web_mercator() {
        assert_eq!(
            resolve_projection(&GeoKeys::projected(3857)),
            Some(ProjectionDefinition::WebMercator)
        );
    }

    #[test]
    fn test_albers_by_citation_uses_defaults() {
        let keys = GeoKeys {
            model_type: Some(MODEL_TYPE_PROJECTED),
            projected_type: Some(USER_DEFINED),
            citation: Some("USA_Contiguous_Albers_Equal_Area_Conic_USGS_version".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_projection(&keys),
            Some(ProjectionDefinition::Albers(ConicParams::CONUS_ALBERS))
        );
    }

    #[test]
    fn test_albers_tag_params_override_defaults() {
        let mut keys = GeoKeys::projected(USER_DEFINED);
        keys.coord_transform = Some(method::ALBERS_EQUAL_AREA);
        keys.params.std_parallel_1 = Some(55.0);
        keys.params.std_parallel_2 = Some(65.0);
        keys.params.false_origin_long = Some(-154.0);
        match resolve_projection(&keys) {
            Some(ProjectionDefinition::Albers(p)) => {
                assert_eq!(p.lat_1, 55.0);
                assert_eq!(p.lat_2, 65.0);
                assert_eq!(p.lon_0, -154.0);
                assert_eq!(p.lat_0, 23.0);
            }
            other => panic!("expected Albers, got {:?}", other),
        }
    }

    #[test]
    fn test_utm_from_citation() {
        let mut keys = GeoKeys::projected(USER_DEFINED);
        keys.citation = Some("WGS 84 / UTM zone 18S".into());
        assert_eq!(
            resolve_projection(&keys),
            Some(ProjectionDefinition::Utm {
                zone: 18,
                south: true
            })
        );
    }

    #[test]
    fn test_transverse_mercator_method_infers_zone() {
        let mut keys = GeoKeys::projected(USER_DEFINED);
        keys.coord_transform = Some(method::TRANSVERSE_MERCATOR);
        keys.params.nat_origin_long = Some(-123.0);
        assert_eq!(
            resolve_projection(&keys),
            Some(ProjectionDefinition::Utm {
                zone: 10,
                south: false
            })
        );
    }

    #[test]
    fn test_sinusoidal_method() {
        let mut keys = GeoKeys::projected(USER_DEFINED);
        keys.coord_transform = Some(method::SINUSOIDAL);
        assert_eq!(
            resolve_projection(&keys),
            Some(ProjectionDefinition::Sinusoidal {
                lon_0: 0.0,
                radius: MODIS_SPHERE_RADIUS
            })
        );
    }

    #[test]
    fn test_unknown_is_none() {
        let keys = GeoKeys::projected(2154);
        assert_eq!(resolve_projection(&keys), None);
    }

    #[test]
    fn test_parse_utm_citation_variants() {
        assert_eq!(parse_utm_citation("UTM Zone 10N"), Some((10, false)));
        assert_eq!(parse_utm_citation("NAD83 / UTM zone 15"), Some((15, false)));
        assert_eq!(parse_utm_citation("utm zone 61N"), None);
        assert_eq!(parse_utm_citation("Lambert"), None);
    }
}
