//! Dual-polarization radar false color.
//!
//! Red is the co-polarized channel, green the cross-polarized one, both
//! percentile-stretched in decibels. Blue is their difference in dB,
//! mapped from a fixed ±10 dB window.

use raster::normalize::{stretch_bounds, stretch_with};
use raster::ReaderConfig;

use crate::png::RgbaImage;

/// Decibel values beyond ±50 dB are invalid.
pub const DB_LIMIT: f64 = 50.0;

/// Half-width of the co/cross ratio window in dB.
pub const RATIO_WINDOW_DB: f64 = 10.0;

/// Convert linear backscatter to dB.
///
/// A channel containing negative values is taken to be in dB already.
/// Non-positive linear values become NaN.
pub fn to_decibels(values: &[f64]) -> Vec<f64> {
    if values.iter().any(|&v| v.is_finite() && v < 0.0) {
        return values.to_vec();
    }
    values
        .iter()
        .map(|&v| if v > 0.0 { 10.0 * v.log10() } else { f64::NAN })
        .collect()
}

fn valid_db(v: f64) -> bool {
    v.is_finite() && v.abs() <= DB_LIMIT
}

/// Stretch over valid samples only.
fn stretch_valid(db: &[f64], config: &ReaderConfig) -> Vec<u8> {
    let valid: Vec<f64> = db.iter().copied().filter(|&v| valid_db(v)).collect();
    let (low, high) = stretch_bounds(
        &valid,
        config.stretch_low_percentile,
        config.stretch_high_percentile,
        config.stretch_max_samples,
    );
    stretch_with(db, low, high)
}

/// Blue channel: co minus cross in dB, `-10..=10` mapped to 0..=255.
pub fn ratio_channel(co_db: f64, cross_db: f64) -> u8 {
    let scaled = (co_db - cross_db + RATIO_WINDOW_DB) / (2.0 * RATIO_WINDOW_DB) * 255.0;
    scaled.clamp(0.0, 255.0).round() as u8
}

/// Compose a false-color image from co- and cross-polarized bands of the
/// same window. Pixels invalid in either band are transparent.
pub fn dual_pol_false_color(
    co: &[f64],
    cross: &[f64],
    width: u32,
    height: u32,
    config: &ReaderConfig,
) -> RgbaImage {
    let co_db = to_decibels(co);
    let cross_db = to_decibels(cross);

    let (red, green) = rayon::join(
        || stretch_valid(&co_db, config),
        || stretch_valid(&cross_db, config),
    );

    let mut image = RgbaImage::new(width, height);
    for (i, px) in image.pixels.chunks_exact_mut(4).enumerate() {
        let (c, x) = match (co_db.get(i), cross_db.get(i)) {
            (Some(&c), Some(&x)) => (c, x),
            _ => continue,
        };
        if !valid_db(c) || !valid_db(x) {
            continue;
        }
        px.copy_from_slice(&[red[i], green[i], ratio_channel(c, x), 255]);
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_power_converts_to_db() {
        let db = to_decibels(&[1.0, 0.1, 0.0]);
        assert!((db[0] - 0.0).abs() < 1e-12);
        assert!((db[1] + 10.0).abs() < 1e-12);
        assert!(db[2].is_nan());
    }

    #[test]
    fn test_db_input_is_kept() {
        let values = [-12.0, -8.5, 3.0];
        assert_eq!(to_decibels(&values), values.to_vec());
    }

    #[test]
    fn test_ratio_window() {
        assert_eq!(ratio_channel(-8.0, -8.0), 128);
        assert_eq!(ratio_channel(-5.0, -15.0), 255);
        assert_eq!(ratio_channel(-20.0, -5.0), 0);
    }

    #[test]
    fn test_false_color_from_backscatter() {
        let (co, cross) = test_utils::create_backscatter_pair(16, 16, 3);
        let co: Vec<f64> = co.into_iter().map(f64::from).collect();
        let cross: Vec<f64> = cross.into_iter().map(f64::from).collect();

        let image = dual_pol_false_color(&co, &cross, 16, 16, &ReaderConfig::default());
        let alpha: Vec<u8> = image.pixels.chunks_exact(4).map(|p| p[3]).collect();
        assert!(alpha.iter().all(|&a| a == 255));

        let reds: Vec<u8> = image.pixels.chunks_exact(4).map(|p| p[0]).collect();
        assert_eq!(reds.iter().min(), Some(&0));
        assert_eq!(reds.iter().max(), Some(&255));

        // Co-pol sits roughly 7 dB above cross-pol
        let blue_mean: f64 = image.pixels.chunks_exact(4).map(|p| p[2] as f64).sum::<f64>() / 256.0;
        assert!(blue_mean > 180.0 && blue_mean < 250.0);
    }

    #[test]
    fn test_out_of_range_db_is_transparent() {
        let co = [-10.0, -80.0];
        let cross = [-15.0, -20.0];
        let image = dual_pol_false_color(&co, &cross, 2, 1, &ReaderConfig::default());
        assert_eq!(image.pixel(0, 0).map(|p| p[3]), Some(255));
        assert_eq!(image.pixel(1, 0), Some([0, 0, 0, 0]));
    }
}
