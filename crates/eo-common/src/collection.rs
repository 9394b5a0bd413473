//! Static registry of known collections.

use serde::Serialize;

use crate::bbox::BoundingBox;

/// Broad thematic category of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionCategory {
    Optical,
    Aerial,
    Sar,
    Elevation,
    LandCover,
    Climate,
    Vector,
}

/// How a collection's data is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Raster,
    ArrayStore,
    Vector,
}

/// Registry entry for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CollectionInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub category: CollectionCategory,
    pub kind: DataKind,
    /// Approximate native pixel size in degrees.
    pub native_resolution_deg: f64,
    /// Bands read for visualization.
    pub bands: u32,
    pub bytes_per_pixel: u32,
    /// Assets (or bands of a single asset) composited as red, green, blue.
    pub rgb_assets: Option<[&'static str; 3]>,
    /// Variables chosen when an array request names none.
    pub default_variables: &'static [&'static str],
}

macro_rules! raster {
    ($id:expr, $name:expr, $cat:ident, $res:expr, $bands:expr, $bpp:expr) => {
        raster!($id, $name, $cat, $res, $bands, $bpp, None)
    };
    ($id:expr, $name:expr, $cat:ident, $res:expr, $bands:expr, $bpp:expr, $rgb:expr) => {
        CollectionInfo {
            id: $id,
            name: $name,
            category: CollectionCategory::$cat,
            kind: DataKind::Raster,
            native_resolution_deg: $res,
            bands: $bands,
            bytes_per_pixel: $bpp,
            rgb_assets: $rgb,
            default_variables: &[],
        }
    };
}

macro_rules! array {
    ($id:expr, $name:expr, $res:expr, $vars:expr) => {
        CollectionInfo {
            id: $id,
            name: $name,
            category: CollectionCategory::Climate,
            kind: DataKind::ArrayStore,
            native_resolution_deg: $res,
            bands: 1,
            bytes_per_pixel: 4,
            rgb_assets: None,
            default_variables: $vars,
        }
    };
}

const DAYMET_VARS: &[&str] = &["tmax", "tmin", "prcp"];
const S2_RGB: Option<[&str; 3]> = Some(["B04", "B03", "B02"]);
const NAMED_RGB: Option<[&str; 3]> = Some(["red", "green", "blue"]);

static COLLECTIONS: &[CollectionInfo] = &[
    raster!("sentinel-2-l2a", "Sentinel-2 Level-2A", Optical, 0.0001, 3, 2, S2_RGB),
    raster!("landsat-c2-l2", "Landsat Collection 2 Level-2", Optical, 0.00027, 3, 2, NAMED_RGB),
    raster!("hls2-l30", "HLS Landsat 30m", Optical, 0.00027, 3, 2),
    raster!("hls2-s30", "HLS Sentinel-2 30m", Optical, 0.00027, 3, 2, S2_RGB),
    raster!("naip", "NAIP aerial imagery", Aerial, 0.000003, 4, 1, NAMED_RGB),
    raster!("sentinel-1-rtc", "Sentinel-1 RTC", Sar, 0.0001, 2, 4),
    raster!("sentinel-1-grd", "Sentinel-1 GRD", Sar, 0.0001, 2, 4),
    raster!("cop-dem-glo-30", "Copernicus DEM 30m", Elevation, 0.00027, 1, 4),
    raster!("cop-dem-glo-90", "Copernicus DEM 90m", Elevation, 0.00081, 1, 4),
    raster!("alos-dem", "ALOS World 3D 30m", Elevation, 0.00027, 1, 4),
    raster!("nasadem", "NASADEM", Elevation, 0.00027, 1, 4),
    raster!("3dep-seamless", "USGS 3DEP Seamless DEM", Elevation, 0.00009, 1, 4),
    raster!("esa-worldcover", "ESA WorldCover", LandCover, 0.0001, 1, 1),
    raster!("io-lulc-annual-v02", "Esri 10m Annual Land Use Land Cover", LandCover, 0.0001, 1, 1),
    raster!("usda-cdl", "USDA Cropland Data Layer", LandCover, 0.00027, 1, 1),
    raster!("mtbs", "Monitoring Trends in Burn Severity", LandCover, 0.00027, 1, 1),
    array!("gridmet", "gridMET", 0.036, &["air_temperature", "precipitation_amount"]),
    array!("terraclimate", "TerraClimate", 0.036, &["tmax", "tmin", "ppt"]),
    array!("daymet-daily-na", "Daymet Daily North America", 0.009, DAYMET_VARS),
    array!("daymet-daily-hi", "Daymet Daily Hawaii", 0.009, DAYMET_VARS),
    array!("daymet-daily-pr", "Daymet Daily Puerto Rico", 0.009, DAYMET_VARS),
    array!("daymet-monthly-na", "Daymet Monthly North America", 0.009, DAYMET_VARS),
    array!("daymet-annual-na", "Daymet Annual North America", 0.009, DAYMET_VARS),
    array!(
        "era5-pds",
        "ERA5 reanalysis",
        0.25,
        &["air_temperature_at_2_metres", "precipitation_amount_1hour_Accumulation"]
    ),
    CollectionInfo {
        id: "ms-buildings",
        name: "Microsoft Building Footprints",
        category: CollectionCategory::Vector,
        kind: DataKind::Vector,
        native_resolution_deg: 0.0001,
        bands: 0,
        bytes_per_pixel: 0,
        rgb_assets: None,
        default_variables: &[],
    },
];

/// Look up a collection by id.
pub fn lookup(id: &str) -> Option<&'static CollectionInfo> {
    COLLECTIONS.iter().find(|c| c.id == id)
}

/// All registered collections.
pub fn all() -> &'static [CollectionInfo] {
    COLLECTIONS
}

/// Preferred (time, latitude, longitude) coordinate names for an array
/// collection. Daymet stores projected `y`/`x` axes.
pub fn coordinate_names(id: &str) -> (&'static str, &'static str, &'static str) {
    if id.starts_with("daymet") {
        ("time", "y", "x")
    } else {
        ("time", "lat", "lon")
    }
}

/// Storage kind for a collection; unknown ids are treated as raster.
pub fn data_kind(id: &str) -> DataKind {
    lookup(id).map(|c| c.kind).unwrap_or(DataKind::Raster)
}

/// Default variables for an array collection, empty when unknown.
pub fn default_variables(id: &str) -> &'static [&'static str] {
    lookup(id).map(|c| c.default_variables).unwrap_or(&[])
}

/// Uncompressed size estimate for a raster request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeEstimate {
    pub width_pixels: u64,
    pub height_pixels: u64,
    pub bands: u32,
    pub bytes_per_pixel: u32,
    pub size_bytes: u64,
    pub resolution_deg: f64,
}

impl SizeEstimate {
    /// Estimate the in-memory size of reading `bbox` at `resolution_deg`.
    ///
    /// Unknown collections assume three float32 bands.
    pub fn for_request(collection_id: &str, bbox: &BoundingBox, resolution_deg: f64) -> Self {
        let (bands, bytes_per_pixel) = lookup(collection_id)
            .map(|c| (c.bands, c.bytes_per_pixel))
            .unwrap_or((3, 4));

        let (width_pixels, height_pixels) = if resolution_deg > 0.0 {
            (
                (bbox.width().abs() / resolution_deg) as u64,
                (bbox.height().abs() / resolution_deg) as u64,
            )
        } else {
            (0, 0)
        };

        Self {
            width_pixels,
            height_pixels,
            bands,
            bytes_per_pixel,
            size_bytes: width_pixels * height_pixels * bands as u64 * bytes_per_pixel as u64,
            resolution_deg,
        }
    }

    /// Human readable size, e.g. "12.3 MB".
    pub fn size_str(&self) -> String {
        let bytes = self.size_bytes as f64;
        let mb = bytes / (1024.0 * 1024.0);
        if mb < 1.0 {
            format!("{:.1} KB", bytes / 1024.0)
        } else if mb < 1024.0 {
            format!("{:.1} MB", mb)
        } else {
            format!("{:.1} GB", mb / 1024.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_kind() {
        assert_eq!(data_kind("gridmet"), DataKind::ArrayStore);
        assert_eq!(data_kind("sentinel-2-l2a"), DataKind::Raster);
        assert_eq!(data_kind("not-a-collection"), DataKind::Raster);
        assert_eq!(default_variables("terraclimate"), &["tmax", "tmin", "ppt"]);
        assert!(default_variables("naip").is_empty());
        assert_eq!(
            lookup("sentinel-2-l2a").and_then(|c| c.rgb_assets),
            Some(["B04", "B03", "B02"])
        );
        assert_eq!(coordinate_names("daymet-daily-na"), ("time", "y", "x"));
    }

    #[test]
    fn test_size_estimate() {
        let bbox = BoundingBox::new(0.0, 0.0, 0.01, 0.01);
        let est = SizeEstimate::for_request("sentinel-2-l2a", &bbox, 0.0001);
        assert_eq!(est.width_pixels, 100);
        assert_eq!(est.height_pixels, 100);
        assert_eq!(est.size_bytes, 100 * 100 * 3 * 2);
        assert_eq!(est.size_str(), "58.6 KB");
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<_> = all().iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all().len());
    }
}
