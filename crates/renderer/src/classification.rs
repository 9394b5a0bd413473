//! Palette rendering of classification bands.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::palette::ClassificationPalette;
use crate::png::RgbaImage;
use crate::ramp::Color;

/// Pixel count of one class observed in a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    pub value: i64,
    pub label: Option<String>,
    pub pixels: usize,
}

/// Color each class value through `palette`.
///
/// Values without an entry render neutral gray. No-data and non-finite
/// samples are transparent and left out of the returned counts, which
/// are ordered by class value.
pub fn colorize_classes(
    values: &[f64],
    width: u32,
    height: u32,
    palette: &ClassificationPalette,
) -> (RgbaImage, Vec<ClassCount>) {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    let colors: Vec<Color> = values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return Color::transparent();
            }
            let class = v.round() as i64;
            if palette.nodata == Some(class) {
                return Color::transparent();
            }
            *counts.entry(class).or_default() += 1;
            palette.color_of(class)
        })
        .collect();

    let observed = counts
        .into_iter()
        .map(|(value, pixels)| ClassCount {
            value,
            label: palette.label_of(value).map(str::to_string),
            pixels,
        })
        .collect();

    (RgbaImage::from_colors(width, height, &colors), observed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_classes() {
        let palette = ClassificationPalette::for_collection("io-lulc-annual-v02").unwrap();
        let values = [0.0, 1.0, 2.0, 99.0];
        let (image, counts) = colorize_classes(&values, 4, 1, &palette);

        assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(image.pixel(1, 0), Some([65, 155, 223, 255]));
        assert_eq!(image.pixel(2, 0), Some([57, 125, 73, 255]));
        assert_eq!(image.pixel(3, 0), Some([128, 128, 128, 255]));

        // No-data class 0 is not reported
        let values: Vec<i64> = counts.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![1, 2, 99]);
        assert_eq!(counts[0].label.as_deref(), Some("Water"));
        assert_eq!(counts[2].label, None);
    }

    #[test]
    fn test_counts_over_striped_grid() {
        let palette = ClassificationPalette::for_collection("esa-worldcover").unwrap();
        let grid: Vec<f64> = test_utils::create_classification_grid(8, 4, &[10, 80, 0, 50], 2)
            .into_iter()
            .map(f64::from)
            .collect();
        let (_, counts) = colorize_classes(&grid, 8, 4, &palette);
        let summary: Vec<(i64, usize)> = counts.iter().map(|c| (c.value, c.pixels)).collect();
        assert_eq!(summary, vec![(10, 8), (50, 8), (80, 8)]);
    }
}
