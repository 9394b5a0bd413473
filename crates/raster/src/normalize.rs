//! Conversion of raw samples to 8-bit display values.
//!
//! Percentile stretching is not idempotent: re-stretching an already
//! stretched 0-255 channel moves its percentiles unless its 2nd and 98th
//! percentiles are already exactly 0 and 255.

use rayon::prelude::*;

use crate::config::ReaderConfig;
use crate::types::Normalization;

/// Linear-interpolated percentile of an ascending slice, `p` in 0..=100.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// At most `max_samples` values, evenly strided.
fn sample(values: &[f64], max_samples: usize) -> impl Iterator<Item = f64> + '_ {
    let stride = values.len().div_ceil(max_samples.max(1)).max(1);
    values.iter().step_by(stride).copied()
}

/// Stretch bounds `(low, high)` of one channel.
///
/// Falls back to the sampled min/max when the percentiles coincide.
pub fn stretch_bounds(values: &[f64], low_pct: f64, high_pct: f64, max_samples: usize) -> (f64, f64) {
    let mut sampled: Vec<f64> = sample(values, max_samples).map(finite_or_zero).collect();
    sampled.sort_by(f64::total_cmp);

    let low = percentile(&sampled, low_pct);
    let high = percentile(&sampled, high_pct);
    if high > low {
        return (low, high);
    }
    match (sampled.first(), sampled.last()) {
        (Some(&min), Some(&max)) => (min, max),
        _ => (0.0, 0.0),
    }
}

/// Map `values` linearly from `(low, high)` to 0..=255, clamping.
pub fn stretch_with(values: &[f64], low: f64, high: f64) -> Vec<u8> {
    let range = high - low;
    values
        .iter()
        .map(|&v| {
            let v = finite_or_zero(v);
            if range <= 0.0 {
                return 0;
            }
            ((v - low) / range * 255.0).clamp(0.0, 255.0).round() as u8
        })
        .collect()
}

/// Percentile contrast stretch of one channel.
pub fn percentile_stretch(values: &[f64], config: &ReaderConfig) -> Vec<u8> {
    let (low, high) = stretch_bounds(
        values,
        config.stretch_low_percentile,
        config.stretch_high_percentile,
        config.stretch_max_samples,
    );
    stretch_with(values, low, high)
}

/// Clamp values already in display range.
pub fn pass_through(values: &[f64]) -> Vec<u8> {
    values
        .iter()
        .map(|&v| finite_or_zero(v).clamp(0.0, 255.0).round() as u8)
        .collect()
}

/// Normalize each channel independently.
pub fn normalize_channels(channels: &[Vec<f64>], mode: Normalization, config: &ReaderConfig) -> Vec<Vec<u8>> {
    channels
        .par_iter()
        .map(|c| match mode {
            Normalization::PercentileStretch => percentile_stretch(c, config),
            Normalization::PassThrough => pass_through(c),
        })
        .collect()
}

/// True when every sampled value of every channel is zero or non-finite.
pub fn is_signal_less(channels: &[Vec<f64>], max_samples: usize) -> bool {
    channels
        .par_iter()
        .all(|c| sample(c, max_samples).all(|v| finite_or_zero(v) == 0.0))
}

/// Interleave equally sized channels pixel by pixel.
pub fn interleave(channels: &[Vec<u8>]) -> Vec<u8> {
    let n = channels.first().map(Vec::len).unwrap_or(0);
    let mut out = Vec::with_capacity(n * channels.len());
    for i in 0..n {
        for c in channels {
            out.push(c[i]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let sorted: Vec<f64> = (0..=10).map(f64::from).collect();
        assert_eq!(percentile(&sorted, 50.0), 5.0);
        assert!((percentile(&sorted, 2.0) - 0.2).abs() < 1e-12);
        assert!((percentile(&sorted, 98.0) - 9.8).abs() < 1e-12);
    }

    #[test]
    fn test_stretch_maps_percentiles_to_full_range() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let out = percentile_stretch(&values, &ReaderConfig::default());
        // 2nd percentile is 2.0, 98th is 98.0
        assert_eq!(out[0], 0);
        assert_eq!(out[2], 0);
        assert_eq!(out[50], 128);
        assert_eq!(out[98], 255);
        assert_eq!(out[100], 255);
    }

    #[test]
    fn test_stretch_falls_back_to_min_max() {
        // Percentiles coincide on a mostly constant channel
        let mut values = vec![10.0; 100];
        values[0] = 0.0;
        values[99] = 20.0;
        let (low, high) = stretch_bounds(&values, 2.0, 98.0, 1_000);
        assert_eq!((low, high), (0.0, 20.0));
    }

    #[test]
    fn test_non_finite_values_become_zero() {
        let out = pass_through(&[f64::NAN, f64::INFINITY, 300.0, -4.0, 12.4]);
        assert_eq!(out, vec![0, 0, 255, 0, 12]);
    }

    #[test]
    fn test_restretch_is_not_idempotent() {
        // Percentile ranks fall between samples, so the output tails move
        let values: Vec<f64> = (0..76).map(f64::from).collect();
        let config = ReaderConfig::default();
        let once = percentile_stretch(&values, &config);
        let once_f: Vec<f64> = once.iter().map(|&v| f64::from(v)).collect();
        let twice = percentile_stretch(&once_f, &config);
        assert_ne!(once, twice);
    }

    #[test]
    fn test_signal_less_detection() {
        assert!(is_signal_less(&[vec![0.0; 10], vec![0.0, f64::NAN]], 100));
        assert!(!is_signal_less(&[vec![0.0; 10], vec![0.0, 1.0]], 100));
    }

    #[test]
    fn test_interleave() {
        let out = interleave(&[vec![1, 2], vec![3, 4], vec![5, 6]]);
        assert_eq!(out, vec![1, 3, 5, 2, 4, 6]);
    }
}
