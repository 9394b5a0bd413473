//! GeoTIFF GeoKey directory parsing.
//!
//! The directory (tag 34735) is a flat `u16` array: a four-entry header
//! followed by `(key id, tag location, count, value/offset)` quadruples.
//! Values live inline, in the double params tag (34736) or in the ASCII
//! params tag (34737).

use serde::Serialize;

use crate::error::ProjectionError;

pub const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
pub const GEO_DOUBLE_PARAMS_TAG: u16 = 34736;
pub const GEO_ASCII_PARAMS_TAG: u16 = 34737;
pub const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
pub const MODEL_TIEPOINT_TAG: u16 = 33922;
pub const GDAL_NODATA_TAG: u16 = 42113;

/// GeoKey ids this crate understands.
pub mod key {
    pub const GT_MODEL_TYPE: u16 = 1024;
    pub const GT_RASTER_TYPE: u16 = 1025;
    pub const GT_CITATION: u16 = 1026;
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    pub const GEOG_CITATION: u16 = 2049;
    pub const PROJECTED_CS_TYPE: u16 = 3072;
    pub const PCS_CITATION: u16 = 3073;
    pub const PROJECTION: u16 = 3074;
    pub const PROJ_COORD_TRANS: u16 = 3075;
    pub const PROJ_STD_PARALLEL_1: u16 = 3078;
    pub const PROJ_STD_PARALLEL_2: u16 = 3079;
    pub const PROJ_NAT_ORIGIN_LONG: u16 = 3080;
    pub const PROJ_NAT_ORIGIN_LAT: u16 = 3081;
    pub const PROJ_FALSE_EASTING: u16 = 3082;
    pub const PROJ_FALSE_NORTHING: u16 = 3083;
    pub const PROJ_FALSE_ORIGIN_LONG: u16 = 3084;
    pub const PROJ_FALSE_ORIGIN_LAT: u16 = 3085;
    pub const PROJ_FALSE_ORIGIN_EASTING: u16 = 3086;
    pub const PROJ_FALSE_ORIGIN_NORTHING: u16 = 3087;
    pub const PROJ_CENTER_LONG: u16 = 3088;
    pub const PROJ_CENTER_LAT: u16 = 3089;
    pub const PROJ_SCALE_AT_NAT_ORIGIN: u16 = 3092;
}

/// ProjCoordTransGeoKey method codes.
pub mod method {
    pub const TRANSVERSE_MERCATOR: u16 = 1;
    pub const MERCATOR: u16 = 7;
    pub const LAMBERT_CONFORMAL_2SP: u16 = 8;
    pub const ALBERS_EQUAL_AREA: u16 = 11;
    pub const SINUSOIDAL: u16 = 24;
}

/// GTModelTypeGeoKey values.
pub const MODEL_TYPE_PROJECTED: u16 = 1;
pub const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

/// User-defined marker used by several GeoKeys.
pub const USER_DEFINED: u16 = 32767;

/// Projection parameters carried as double-valued GeoKeys, in degrees/meters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjParams {
    pub std_parallel_1: Option<f64>,
    pub std_parallel_2: Option<f64>,
    pub nat_origin_long: Option<f64>,
    pub nat_origin_lat: Option<f64>,
    pub false_easting: Option<f64>,
    pub false_northing: Option<f64>,
    pub false_origin_long: Option<f64>,
    pub false_origin_lat: Option<f64>,
    pub center_long: Option<f64>,
    pub center_lat: Option<f64>,
    pub scale_at_nat_origin: Option<f64>,
}

impl ProjParams {
    /// Central meridian under whichever key the writer used.
    pub fn central_meridian(&self) -> Option<f64> {
        self.nat_origin_long
            .or(self.false_origin_long)
            .or(self.center_long)
    }

    /// Latitude of origin under whichever key the writer used.
    pub fn origin_latitude(&self) -> Option<f64> {
        self.nat_origin_lat
            .or(self.false_origin_lat)
            .or(self.center_lat)
    }
}

/// The subset of GeoKeys used for projection resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoKeys {
    pub model_type: Option<u16>,
    pub geographic_type: Option<u16>,
    pub projected_type: Option<u16>,
    pub projection: Option<u16>,
    pub coord_transform: Option<u16>,
    pub citation: Option<String>,
    pub params: ProjParams,
}

impl GeoKeys {
    /// Keys for a plain geographic WGS84 raster.
    pub fn geographic_wgs84() -> Self {
        Self {
            model_type: Some(MODEL_TYPE_GEOGRAPHIC),
            geographic_type: Some(4326),
            ..Default::default()
        }
    }

    /// Keys for a raster with an EPSG projected code.
    pub fn projected(code: u16) -> Self {
        Self {
            model_type: Some(MODEL_TYPE_PROJECTED),
            projected_type: Some(code),
            ..Default::default()
        }
    }

    /// Parse the GeoKey directory and its parameter tags.
    pub fn from_directory(
        directory: &[u16],
        doubles: &[f64],
        ascii: &str,
    ) -> Result<Self, ProjectionError> {
        if directory.len() < 4 {
            return Err(ProjectionError::MalformedGeoKeys(format!(
                "header has {} entries",
                directory.len()
            )));
        }
        let count = directory[3] as usize;
        let entries = &directory[4..];
        if entries.len() < count * 4 {
            return Err(ProjectionError::MalformedGeoKeys(format!(
                "expected {} keys, found room for {}",
                count,
                entries.len() / 4
            )));
        }

        let mut keys = GeoKeys::default();
        for entry in entries.chunks_exact(4).take(count) {
            let (id, location, value_count, value) = (entry[0], entry[1], entry[2], entry[3]);
            match location {
                0 => keys.set_short(id, value),
                GEO_DOUBLE_PARAMS_TAG => {
                    if let Some(v) = doubles.get(value as usize) {
                        keys.set_double(id, *v);
                    }
                }
                GEO_ASCII_PARAMS_TAG => {
                    let start = value as usize;
                    let end = (start + value_count as usize).min(ascii.len());
                    if let Some(text) = ascii.get(start..end) {
                        keys.set_ascii(id, text.trim_end_matches(['|', '\0']).trim());
                    }
                }
                _ => {}
            }
        }
        Ok(keys)
    }

    fn set_short(&mut self, id: u16, value: u16) {
        match id {
            key::GT_MODEL_TYPE => self.model_type = Some(value),
            key::GEOGRAPHIC_TYPE => self.geographic_type = Some(value),
            key::PROJECTED_CS_TYPE => self.projected_type = Some(value),
            key::PROJECTION => self.projection = Some(value),
            key::PROJ_COORD_TRANS => self.coord_transform = Some(value),
            _ => {}
        }
    }

    fn set_double(&mut self, id: u16, value: f64) {
        let p = &mut self.params;
        match id {
            key::PROJ_STD_PARALLEL_1 => p.std_parallel_1 = Some(value),
            key::PROJ_STD_PARALLEL_2 => p.std_parallel_2 = Some(value),
            key::PROJ_NAT_ORIGIN_LONG => p.nat_origin_long = Some(value),
            key::PROJ_NAT_ORIGIN_LAT => p.nat_origin_lat = Some(value),
            key::PROJ_FALSE_EASTING | key::PROJ_FALSE_ORIGIN_EASTING => {
                p.false_easting = Some(value)
            }
            key::PROJ_FALSE_NORTHING | key::PROJ_FALSE_ORIGIN_NORTHING => {
                p.false_northing = Some(value)
            }
            key::PROJ_FALSE_ORIGIN_LONG => p.false_origin_long = Some(value),
            key::PROJ_FALSE_ORIGIN_LAT => p.false_origin_lat = Some(value),
            key::PROJ_CENTER_LONG => p.center_long = Some(value),
            key::PROJ_CENTER_LAT => p.center_lat = Some(value),
            key::PROJ_SCALE_AT_NAT_ORIGIN => p.scale_at_nat_origin = Some(value),
            _ => {}
        }
    }

    fn set_ascii(&mut self, id: u16, text: &str) {
        if text.is_empty() {
            return;
        }
        match id {
            // PCS citation is the most specific; keep it over the others
            key::PCS_CITATION => self.citation = Some(text.to_string()),
            key::GT_CITATION | key::GEOG_CITATION => {
                if self.citation.is_none() {
                    self.citation = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    /// Serialize back to directory, double and ASCII params.
    pub fn to_directory(&self) -> (Vec<u16>, Vec<f64>, String) {
        let mut entries: Vec<[u16; 4]> = Vec::new();
        let mut doubles = Vec::new();
        let mut ascii = String::new();

        let shorts = [
            (key::GT_MODEL_TYPE, self.model_type),
            (key::GT_RASTER_TYPE, Some(1)),
            (key::GEOGRAPHIC_TYPE, self.geographic_type),
            (key::PROJECTED_CS_TYPE, self.projected_type),
            (key::PROJECTION, self.projection),
            (key::PROJ_COORD_TRANS, self.coord_transform),
        ];
        for (id, value) in shorts {
            if let Some(v) = value {
                entries.push([id, 0, 1, v]);
            }
        }

        if let Some(citation) = &self.citation {
            let text = format!("{}|", citation);
            entries.push([
                key::PCS_CITATION,
                GEO_ASCII_PARAMS_TAG,
                text.len() as u16,
                ascii.len() as u16,
            ]);
            ascii.push_str(&text);
        }

        let p = &self.params;
        let params = [
            (key::PROJ_STD_PARALLEL_1, p.std_parallel_1),
            (key::PROJ_STD_PARALLEL_2, p.std_parallel_2),
            (key::PROJ_NAT_ORIGIN_LONG, p.nat_origin_long),
            (key::PROJ_NAT_ORIGIN_LAT, p.nat_origin_lat),
            (key::PROJ_FALSE_EASTING, p.false_easting),
            (key::PROJ_FALSE_NORTHING, p.false_northing),
            (key::PROJ_FALSE_ORIGIN_LONG, p.false_origin_long),
            (key::PROJ_FALSE_ORIGIN_LAT, p.false_origin_lat),
            (key::PROJ_CENTER_LONG, p.center_long),
            (key::PROJ_CENTER_LAT, p.center_lat),
            (key::PROJ_SCALE_AT_NAT_ORIGIN, p.scale_at_nat_origin),
        ];
        for (id, value) in params {
            if let Some(v) = value {
                entries.push([id, GEO_DOUBLE_PARAMS_TAG, 1, doubles.len() as u16]);
                doubles.push(v);
            }
        }

        // Keys must be sorted by id
        entries.sort_by_key(|e| e[0]);

        let mut directory = vec![1, 1, 0, entries.len() as u16];
        for e in entries {
            directory.extend_from_slice(&e);
        }
        (directory, doubles, ascii)
    }
}
