//! Visualization strategy selection.
//!
//! Strategies are tried in a fixed order and the first match wins:
//!
//! 1. dual-polarization radar false color
//! 2. elevation ramp
//! 3. classification palette
//! 4. a pre-rendered true-color asset
//! 5. channels of one stacked aerial asset
//! 6. the collection's known per-band assets
//! 7. assets whose names or common names are red, green and blue
//!
//! A classification asset that also looks like true color is rendered
//! with its palette.

use eo_common::collection::{self, CollectionCategory};
use raster::AssetRef;
use serde::Serialize;
use tracing::debug;

use crate::error::{RenderError, Result};
use crate::palette::{ClassHint, ClassificationPalette};

/// One asset of a catalog item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetInfo {
    pub name: String,
    pub href: String,
    pub roles: Vec<String>,
    /// Spectral common name such as `red` or `nir`.
    pub common_name: Option<String>,
    /// Inline class metadata.
    pub class_hints: Vec<ClassHint>,
    pub nodata: Option<f64>,
}

impl AssetInfo {
    pub fn new(name: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            href: href.into(),
            ..Default::default()
        }
    }

    pub fn with_common_name(mut self, common_name: impl Into<String>) -> Self {
        self.common_name = Some(common_name.into());
        self
    }

    pub fn with_class_hints(mut self, hints: Vec<ClassHint>) -> Self {
        self.class_hints = hints;
        self
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }
}

/// The assets of one catalog item, in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemAssets {
    pub item_id: String,
    pub assets: Vec<AssetInfo>,
}

impl ItemAssets {
    pub fn new(item_id: impl Into<String>, assets: Vec<AssetInfo>) -> Self {
        Self {
            item_id: item_id.into(),
            assets,
        }
    }

    /// Asset by exact name, falling back to a case-insensitive match.
    pub fn get(&self, name: &str) -> Option<&AssetInfo> {
        self.assets
            .iter()
            .find(|a| a.name == name)
            .or_else(|| self.assets.iter().find(|a| a.name.eq_ignore_ascii_case(name)))
    }

    pub fn names(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.name.clone()).collect()
    }

    fn first_present(&self, candidates: &[&str]) -> Option<&AssetInfo> {
        candidates.iter().find_map(|c| self.get(c))
    }

    /// Resolve an asset to a readable reference, or fail listing what the
    /// item does have.
    pub fn asset_ref(&self, name: &str) -> Result<AssetRef> {
        self.get(name)
            .map(|a| AssetRef::new(a.name.clone(), a.href.clone()))
            .ok_or_else(|| RenderError::MissingAsset {
                requested: name.to_string(),
                available: self.names(),
            })
    }
}

/// How an item is turned into a preview image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualizationStrategy {
    /// A pre-rendered true-color asset, read as is.
    DirectAsset { asset: String },
    /// Three bands of one stacked asset.
    SingleAssetChannels { asset: String, bands: [usize; 3] },
    /// Red, green and blue from three single-band assets.
    PerBandAssets { assets: [String; 3] },
    /// Terrain ramp over an elevation band.
    ElevationColormap { asset: String },
    /// Palette lookup of class values.
    ClassificationColormap {
        asset: String,
        palette: ClassificationPalette,
    },
    /// Co-pol, cross-pol and their ratio as red, green and blue.
    DualPolarizationFalseColor { co_pol: String, cross_pol: String },
}

impl VisualizationStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectAsset { .. } => "direct_asset",
            Self::SingleAssetChannels { .. } => "single_asset_channels",
            Self::PerBandAssets { .. } => "per_band_assets",
            Self::ElevationColormap { .. } => "elevation_colormap",
            Self::ClassificationColormap { .. } => "classification_colormap",
            Self::DualPolarizationFalseColor { .. } => "dual_polarization_false_color",
        }
    }

    /// Asset names this strategy reads, in read order.
    pub fn assets(&self) -> Vec<&str> {
        match self {
            Self::DirectAsset { asset }
            | Self::SingleAssetChannels { asset, .. }
            | Self::ElevationColormap { asset }
            | Self::ClassificationColormap { asset, .. } => vec![asset.as_str()],
            Self::PerBandAssets { assets } => assets.iter().map(String::as_str).collect(),
            Self::DualPolarizationFalseColor { co_pol, cross_pol } => {
                vec![co_pol.as_str(), cross_pol.as_str()]
            }
        }
    }
}

const CO_POL: &[&str] = &["vv", "hh"];
const CROSS_POL: &[&str] = &["vh", "hv"];
const ELEVATION_ASSETS: &[&str] = &["data", "elevation", "dem"];
const CLASSIFICATION_ASSETS: &[&str] = &["map", "data", "classification"];
const TRUE_COLOR_ASSETS: &[&str] = &["visual", "true_color", "pansharpened"];
const AERIAL_ASSETS: &[&str] = &["image"];

/// Pick the visualization for an item. `None` means no strategy applies and
/// the caller must say so rather than guess.
pub fn select_strategy(collection_id: &str, item: &ItemAssets) -> Option<VisualizationStrategy> {
    let category = collection::lookup(collection_id).map(|c| c.category);

    let strategy = dual_polarization(collection_id, category, item)
        .or_else(|| elevation(category, item))
        .or_else(|| classification(collection_id, category, item))
        .or_else(|| {
            item.first_present(TRUE_COLOR_ASSETS)
                .map(|a| VisualizationStrategy::DirectAsset {
                    asset: a.name.clone(),
                })
        })
        .or_else(|| {
            item.first_present(AERIAL_ASSETS)
                .map(|a| VisualizationStrategy::SingleAssetChannels {
                    asset: a.name.clone(),
                    bands: [0, 1, 2],
                })
        })
        .or_else(|| known_bands(collection_id, item))
        .or_else(|| named_rgb(item));

    debug!(
        collection = collection_id,
        item = %item.item_id,
        strategy = strategy.as_ref().map(|s| s.name()).unwrap_or("none"),
        "Selected visualization strategy"
    );
    strategy
}

/// [`select_strategy`], failing with the item's assets when nothing applies.
pub fn require_strategy(collection_id: &str, item: &ItemAssets) -> Result<VisualizationStrategy> {
    select_strategy(collection_id, item).ok_or_else(|| RenderError::NoStrategy {
        collection: collection_id.to_string(),
        assets: item.names(),
    })
}

fn dual_polarization(
    collection_id: &str,
    category: Option<CollectionCategory>,
    item: &ItemAssets,
) -> Option<VisualizationStrategy> {
    let is_radar = category == Some(CollectionCategory::Sar) || collection_id.starts_with("sentinel-1");
    if !is_radar {
        return None;
    }
    let co = item.first_present(CO_POL)?;
    let cross = item.first_present(CROSS_POL)?;
    Some(VisualizationStrategy::DualPolarizationFalseColor {
        co_pol: co.name.clone(),
        cross_pol: cross.name.clone(),
    })
}

fn elevation(category: Option<CollectionCategory>, item: &ItemAssets) -> Option<VisualizationStrategy> {
    if category != Some(CollectionCategory::Elevation) {
        return None;
    }
    // Conventional name when the item does not carry one of the candidates
    let asset = item
        .first_present(ELEVATION_ASSETS)
        .map(|a| a.name.clone())
        .unwrap_or_else(|| ELEVATION_ASSETS[0].to_string());
    Some(VisualizationStrategy::ElevationColormap { asset })
}

fn classification(
    collection_id: &str,
    category: Option<CollectionCategory>,
    item: &ItemAssets,
) -> Option<VisualizationStrategy> {
    // Inline hints take precedence over a fixed palette
    if let Some((asset, palette)) = item.assets.iter().find_map(|a| {
        let nodata = a.nodata.map(|v| v as i64);
        ClassificationPalette::from_hints(&a.class_hints, nodata).map(|p| (a, p))
    }) {
        return Some(VisualizationStrategy::ClassificationColormap {
            asset: asset.name.clone(),
            palette,
        });
    }

    if category != Some(CollectionCategory::LandCover) && !collection_id.starts_with("io-lulc") {
        return None;
    }
    let mut palette = ClassificationPalette::for_collection(collection_id)?;
    let asset = item
        .first_present(CLASSIFICATION_ASSETS)
        .or_else(|| item.assets.first())?;
    if let Some(nodata) = asset.nodata {
        palette.nodata = Some(nodata as i64);
    }
    Some(VisualizationStrategy::ClassificationColormap {
        asset: asset.name.clone(),
        palette,
    })
}

fn known_bands(collection_id: &str, item: &ItemAssets) -> Option<VisualizationStrategy> {
    let rgb = collection::lookup(collection_id)?.rgb_assets?;
    let assets = [
        item.get(rgb[0])?.name.clone(),
        item.get(rgb[1])?.name.clone(),
        item.get(rgb[2])?.name.clone(),
    ];
    Some(VisualizationStrategy::PerBandAssets { assets })
}

fn named_rgb(item: &ItemAssets) -> Option<VisualizationStrategy> {
    let find = |color: &str| {
        item.assets
            .iter()
            .find(|a| {
                a.common_name
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(color))
            })
            .or_else(|| item.get(color))
            .map(|a| a.name.clone())
    };
    Some(VisualizationStrategy::PerBandAssets {
        assets: [find("red")?, find("green")?, find("blue")?],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(names: &[&str]) -> ItemAssets {
        ItemAssets::new(
            "item-1",
            names
                .iter()
                .map(|n| AssetInfo::new(*n, format!("https://example.com/{}.tif", n)))
                .collect(),
        )
    }

    #[test]
    fn test_sentinel1_dual_pol() {
        let strategy = select_strategy("sentinel-1-rtc", &item(&["vh", "vv"])).unwrap();
        assert_eq!(
            strategy,
            VisualizationStrategy::DualPolarizationFalseColor {
                co_pol: "vv".to_string(),
                cross_pol: "vh".to_string()
            }
        );
    }

    #[test]
    fn test_single_polarization_has_no_strategy() {
        assert!(select_strategy("sentinel-1-rtc", &item(&["vv"])).is_none());
        let err = require_strategy("sentinel-1-rtc", &item(&["vv"])).unwrap_err();
        assert!(err.to_string().contains("vv"));
    }

    #[test]
    fn test_elevation_assumes_data_asset() {
        let strategy = select_strategy("cop-dem-glo-30", &item(&["data"])).unwrap();
        assert_eq!(
            strategy,
            VisualizationStrategy::ElevationColormap {
                asset: "data".to_string()
            }
        );
        let missing = select_strategy("alos-dem", &item(&["rendered_preview"])).unwrap();
        assert_eq!(missing.assets(), vec!["data"]);
    }

    #[test]
    fn test_classification_beats_true_color() {
        let strategy = select_strategy("esa-worldcover", &item(&["visual", "map"])).unwrap();
        assert!(matches!(
            strategy,
            VisualizationStrategy::ClassificationColormap { ref asset, .. } if asset == "map"
        ));
    }

    #[test]
    fn test_inline_hints_win_for_unknown_collection() {
        let mut it = item(&["visual", "cropland"]);
        it.assets[1] = AssetInfo::new("cropland", "file:///tmp/cdl.tif")
            .with_class_hints(vec![ClassHint {
                value: 1,
                label: "Corn".to_string(),
                color_hint: Some("ffd300".to_string()),
            }])
            .with_nodata(0.0);

        match select_strategy("usda-cdl", &it).unwrap() {
            VisualizationStrategy::ClassificationColormap { asset, palette } => {
                assert_eq!(asset, "cropland");
                assert_eq!(palette.nodata, Some(0));
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_visual_asset_is_direct() {
        let strategy = select_strategy("sentinel-2-l2a", &item(&["B02", "B03", "B04", "visual"])).unwrap();
        assert_eq!(strategy.name(), "direct_asset");
    }

    #[test]
    fn test_naip_image_channels() {
        let strategy = select_strategy("naip", &item(&["image", "metadata"])).unwrap();
        assert_eq!(
            strategy,
            VisualizationStrategy::SingleAssetChannels {
                asset: "image".to_string(),
                bands: [0, 1, 2]
            }
        );
    }

    #[test]
    fn test_known_band_mapping() {
        let strategy = select_strategy("sentinel-2-l2a", &item(&["B02", "B03", "B04", "B08"])).unwrap();
        assert_eq!(strategy.assets(), vec!["B04", "B03", "B02"]);
    }

    #[test]
    fn test_common_names_for_unknown_collection() {
        let it = ItemAssets::new(
            "scene",
            vec![
                AssetInfo::new("SR_B2", "b2.tif").with_common_name("blue"),
                AssetInfo::new("SR_B3", "b3.tif").with_common_name("green"),
                AssetInfo::new("SR_B4", "b4.tif").with_common_name("red"),
            ],
        );
        let strategy = select_strategy("some-new-collection", &it).unwrap();
        assert_eq!(strategy.assets(), vec!["SR_B4", "SR_B3", "SR_B2"]);
    }

    #[test]
    fn test_no_match_is_none() {
        assert!(select_strategy("unknown", &item(&["thumbnail", "metadata"])).is_none());
    }

    #[test]
    fn test_missing_asset_lists_available() {
        let err = item(&["B02", "B03"]).asset_ref("B04").unwrap_err();
        match err {
            RenderError::MissingAsset { requested, available } => {
                assert_eq!(requested, "B04");
                assert_eq!(available, vec!["B02", "B03"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
