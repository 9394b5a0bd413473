//! Configuration for raster reading and compositing.

use serde::{Deserialize, Serialize};

/// Configuration for window resolution and normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Side length of the window used when a bbox misses the raster.
    pub recovery_window_size: u32,

    /// Lower percentile of the contrast stretch.
    pub stretch_low_percentile: f64,

    /// Upper percentile of the contrast stretch.
    pub stretch_high_percentile: f64,

    /// Maximum number of values sampled per channel when computing
    /// percentiles. Larger channels are strided.
    pub stretch_max_samples: usize,

    /// Default cap on the output's larger dimension.
    pub max_output_size: Option<u32>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            recovery_window_size: 512,
            stretch_low_percentile: 2.0,
            stretch_high_percentile: 98.0,
            stretch_max_samples: 1_000_000,
            max_output_size: None,
        }
    }
}

impl ReaderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RECOVERY_WINDOW_SIZE") {
            if let Ok(size) = val.parse() {
                config.recovery_window_size = size;
            }
        }

        if let Ok(val) = std::env::var("STRETCH_LOW_PERCENTILE") {
            if let Ok(p) = val.parse() {
                config.stretch_low_percentile = p;
            }
        }

        if let Ok(val) = std::env::var("STRETCH_HIGH_PERCENTILE") {
            if let Ok(p) = val.parse() {
                config.stretch_high_percentile = p;
            }
        }

        if let Ok(val) = std::env::var("STRETCH_MAX_SAMPLES") {
            if let Ok(n) = val.parse() {
                config.stretch_max_samples = n;
            }
        }

        if let Ok(val) = std::env::var("MAX_OUTPUT_SIZE") {
            config.max_output_size = val.parse().ok().filter(|&size: &u32| size > 0);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.recovery_window_size == 0 {
            return Err("recovery_window_size must be > 0".to_string());
        }

        if !(0.0..100.0).contains(&self.stretch_low_percentile)
            || !(0.0..=100.0).contains(&self.stretch_high_percentile)
            || self.stretch_low_percentile >= self.stretch_high_percentile
        {
            return Err(format!(
                "stretch percentiles must satisfy 0 <= low < high <= 100, got {} and {}",
                self.stretch_low_percentile, self.stretch_high_percentile
            ));
        }

        if self.stretch_max_samples == 0 {
            return Err("stretch_max_samples must be > 0".to_string());
        }

        if self.max_output_size == Some(0) {
            return Err("max_output_size must be > 0".to_string());
        }

        Ok(())
    }
}
