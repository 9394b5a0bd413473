//! Classification palettes for land-cover products.

use serde::Serialize;

use crate::ramp::Color;

/// One class of a palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaletteEntry {
    pub value: i64,
    pub color: Color,
    pub label: String,
}

/// Class value to color and label mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationPalette {
    entries: Vec<PaletteEntry>,
    /// Value excluded from class accounting.
    pub nodata: Option<i64>,
}

/// Inline class metadata carried on an asset, e.g. from
/// `classification:classes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHint {
    pub value: i64,
    pub label: String,
    /// Hex color, with or without leading `#`.
    pub color_hint: Option<String>,
}

const ESA_WORLDCOVER: &[(i64, (u8, u8, u8), &str)] = &[
    (10, (0, 100, 0), "Tree cover"),
    (20, (255, 187, 34), "Shrubland"),
    (30, (255, 255, 76), "Grassland"),
    (40, (240, 150, 255), "Cropland"),
    (50, (250, 0, 0), "Built-up"),
    (60, (180, 180, 180), "Bare / sparse vegetation"),
    (70, (240, 240, 240), "Snow and ice"),
    (80, (0, 100, 200), "Permanent water bodies"),
    (90, (0, 150, 160), "Herbaceous wetland"),
    (95, (0, 207, 117), "Mangroves"),
    (100, (250, 230, 160), "Moss and lichen"),
];

const IO_LULC: &[(i64, (u8, u8, u8), &str)] = &[
    (1, (65, 155, 223), "Water"),
    (2, (57, 125, 73), "Trees"),
    (4, (122, 135, 198), "Flooded vegetation"),
    (5, (228, 150, 53), "Crops"),
    (7, (196, 40, 27), "Built area"),
    (8, (165, 155, 143), "Bare ground"),
    (9, (168, 235, 255), "Snow/ice"),
    (10, (97, 97, 97), "Clouds"),
    (11, (227, 226, 195), "Rangeland"),
];

impl ClassificationPalette {
    pub fn new(entries: Vec<PaletteEntry>, nodata: Option<i64>) -> Self {
        let mut entries = entries;
        entries.sort_by_key(|e| e.value);
        Self { entries, nodata }
    }

    fn from_table(table: &[(i64, (u8, u8, u8), &str)], nodata: Option<i64>) -> Self {
        Self::new(
            table
                .iter()
                .map(|&(value, (r, g, b), label)| PaletteEntry {
                    value,
                    color: Color::rgb(r, g, b),
                    label: label.to_string(),
                })
                .collect(),
            nodata,
        )
    }

    /// Fixed palette of a known land-cover collection.
    pub fn for_collection(collection_id: &str) -> Option<Self> {
        match collection_id {
            "esa-worldcover" => Some(Self::from_table(ESA_WORLDCOVER, Some(0))),
            id if id.starts_with("io-lulc") => Some(Self::from_table(IO_LULC, Some(0))),
            _ => None,
        }
    }

    /// Palette from inline class hints. Hints without a parseable color are
    /// skipped; returns `None` when no hint carries a color.
    pub fn from_hints(hints: &[ClassHint], nodata: Option<i64>) -> Option<Self> {
        let entries: Vec<PaletteEntry> = hints
            .iter()
            .filter_map(|h| {
                let color = Color::from_hex(h.color_hint.as_deref()?)?;
                Some(PaletteEntry {
                    value: h.value,
                    color,
                    label: h.label.clone(),
                })
            })
            .collect();
        if entries.is_empty() {
            return None;
        }
        Some(Self::new(entries, nodata))
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    fn entry(&self, value: i64) -> Option<&PaletteEntry> {
        self.entries
            .binary_search_by_key(&value, |e| e.value)
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Display color of a class value; unknown values are neutral gray.
    pub fn color_of(&self, value: i64) -> Color {
        self.entry(value)
            .map(|e| e.color)
            .unwrap_or_else(Color::unmapped)
    }

    pub fn label_of(&self, value: i64) -> Option<&str> {
        self.entry(value).map(|e| e.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worldcover_lookup() {
        let palette = ClassificationPalette::for_collection("esa-worldcover").unwrap();
        assert_eq!(palette.entries().len(), 11);
        assert_eq!(palette.color_of(80), Color::rgb(0, 100, 200));
        assert_eq!(palette.label_of(50), Some("Built-up"));
        assert_eq!(palette.color_of(99), Color::rgb(128, 128, 128));
        assert_eq!(palette.nodata, Some(0));
    }

    #[test]
    fn test_io_lulc_variants_share_palette() {
        let a = ClassificationPalette::for_collection("io-lulc-annual-v02").unwrap();
        let b = ClassificationPalette::for_collection("io-lulc-9-class").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.color_of(1), Color::rgb(65, 155, 223));
        assert!(ClassificationPalette::for_collection("sentinel-2-l2a").is_none());
    }

    #[test]
    fn test_palette_from_hints() {
        let hints = vec![
            ClassHint {
                value: 3,
                label: "Wheat".to_string(),
                color_hint: Some("a87000".to_string()),
            },
            ClassHint {
                value: 1,
                label: "Corn".to_string(),
                color_hint: Some("#ffd300".to_string()),
            },
            ClassHint {
                value: 2,
                label: "No color".to_string(),
                color_hint: None,
            },
        ];
        let palette = ClassificationPalette::from_hints(&hints, None).unwrap();
        assert_eq!(palette.entries().len(), 2);
        assert_eq!(palette.entries()[0].value, 1);
        assert_eq!(palette.color_of(3), Color::rgb(168, 112, 0));
        assert_eq!(palette.color_of(2), Color::unmapped());
    }

    #[test]
    fn test_hints_without_colors_give_no_palette() {
        let hints = vec![ClassHint {
            value: 1,
            label: "Water".to_string(),
            color_hint: None,
        }];
        assert!(ClassificationPalette::from_hints(&hints, Some(0)).is_none());
    }
}
