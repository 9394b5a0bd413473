//! Terrain coloring of elevation bands.

use rayon::prelude::*;
use serde::Serialize;

use crate::png::RgbaImage;
use crate::ramp::{Color, ELEVATION};

/// Values below this many meters are treated as no-data.
pub const MIN_PLAUSIBLE_ELEVATION: f64 = -500.0;

/// Values above this many meters are treated as no-data.
pub const MAX_PLAUSIBLE_ELEVATION: f64 = 9000.0;

/// Range used when a window has no valid samples.
pub const FALLBACK_RANGE: (f64, f64) = (0.0, 1000.0);

/// Observed elevation range of a rendered window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElevationStats {
    pub min: f64,
    pub max: f64,
    pub valid_pixels: usize,
}

fn is_valid(v: f64, nodata: Option<f64>) -> bool {
    v.is_finite()
        && (MIN_PLAUSIBLE_ELEVATION..=MAX_PLAUSIBLE_ELEVATION).contains(&v)
        && nodata.map_or(true, |nd| v != nd)
}

/// Min/max over valid samples, or [`FALLBACK_RANGE`] when there are none.
pub fn elevation_range(values: &[f64], nodata: Option<f64>) -> ElevationStats {
    let (min, max, count) = values
        .iter()
        .filter(|&&v| is_valid(v, nodata))
        .fold((f64::INFINITY, f64::NEG_INFINITY, 0usize), |(lo, hi, n), &v| {
            (lo.min(v), hi.max(v), n + 1)
        });
    if count == 0 {
        return ElevationStats {
            min: FALLBACK_RANGE.0,
            max: FALLBACK_RANGE.1,
            valid_pixels: 0,
        };
    }
    ElevationStats {
        min,
        max,
        valid_pixels: count,
    }
}

/// Color an elevation band through the terrain ramp. Invalid samples are
/// transparent.
pub fn colorize_elevation(
    values: &[f64],
    width: u32,
    height: u32,
    nodata: Option<f64>,
) -> (RgbaImage, ElevationStats) {
    let stats = elevation_range(values, nodata);
    let colors: Vec<Color> = values
        .par_iter()
        .map(|&v| {
            if is_valid(v, nodata) {
                ELEVATION.color_for(v, stats.min, stats.max)
            } else {
                Color::transparent()
            }
        })
        .collect();
    (RgbaImage::from_colors(width, height, &colors), stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_nodata_uses_fallback_range() {
        let values = vec![-9999.0; 16];
        let (image, stats) = colorize_elevation(&values, 4, 4, Some(-9999.0));
        assert_eq!((stats.min, stats.max), FALLBACK_RANGE);
        assert_eq!(stats.valid_pixels, 0);
        assert!(image.pixels.chunks_exact(4).all(|p| p[3] == 0));
    }

    #[test]
    fn test_implausible_values_are_excluded() {
        let values = [-600.0, 100.0, 200.0, 9500.0, f64::NAN, 0.0];
        let stats = elevation_range(&values, Some(0.0));
        assert_eq!((stats.min, stats.max, stats.valid_pixels), (100.0, 200.0, 2));
    }

    #[test]
    fn test_low_and_high_map_to_ramp_ends() {
        let values = [100.0, 2000.0];
        let (image, _) = colorize_elevation(&values, 2, 1, None);
        assert_eq!(image.pixel(0, 0), Some([0, 97, 71, 255]));
        assert_eq!(image.pixel(1, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_peak_is_brighter_than_base() {
        let grid: Vec<f64> = test_utils::create_elevation_grid(9, 9, 200.0, 3000.0)
            .into_iter()
            .map(f64::from)
            .collect();
        let (image, stats) = colorize_elevation(&grid, 9, 9, None);
        assert!(stats.max > 2500.0);
        let corner = image.pixel(0, 0).unwrap();
        let peak = image.pixel(4, 4).unwrap();
        let brightness = |p: [u8; 4]| p[0] as u32 + p[1] as u32 + p[2] as u32;
        assert!(brightness(peak) > brightness(corner));
    }
}
