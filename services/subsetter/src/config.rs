//! Subsetter configuration.
//!
//! Library defaults, then environment variables (including a `.env` file
//! loaded at startup), then command-line flags.

use anyhow::{anyhow, Result};
use array_slicer::{SliceCompression, SlicerConfig};
use clap::Args;
use raster::ReaderConfig;

/// Flags that override the library configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Side of the window read when a bbox misses the raster
    #[arg(long, global = true, env = "RECOVERY_WINDOW_SIZE")]
    pub recovery_window_size: Option<u32>,

    /// Cap on the larger side of rendered output
    #[arg(long, global = true, env = "MAX_OUTPUT_SIZE")]
    pub max_output_size: Option<u32>,

    /// Output chunk length of sliced arrays
    #[arg(long, global = true, env = "SLICER_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Compression of sliced arrays (none, blosc_lz4, blosc_zstd)
    #[arg(long, global = true, env = "SLICER_COMPRESSION")]
    pub compression: Option<String>,
}

/// Configuration of every library the subsetter drives.
#[derive(Debug, Clone)]
pub struct SubsetterConfig {
    pub reader: ReaderConfig,
    pub slicer: SlicerConfig,
}

impl SubsetterConfig {
    /// Environment-derived configuration with `overrides` applied.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        Self::from_parts(ReaderConfig::from_env(), SlicerConfig::from_env(), overrides)
    }

    fn from_parts(
        mut reader: ReaderConfig,
        mut slicer: SlicerConfig,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        if let Some(size) = overrides.recovery_window_size {
            reader.recovery_window_size = size;
        }
        if let Some(size) = overrides.max_output_size {
            reader.max_output_size = Some(size).filter(|&s| s > 0);
        }
        if let Some(size) = overrides.chunk_size {
            slicer.output_chunk_size = size;
        }
        if let Some(name) = &overrides.compression {
            slicer.compression = SliceCompression::from_str(name);
        }

        reader
            .validate()
            .map_err(|e| anyhow!("invalid reader configuration: {}", e))?;
        slicer
            .validate()
            .map_err(|e| anyhow!("invalid slicer configuration: {}", e))?;

        Ok(Self { reader, slicer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win() {
        let overrides = ConfigOverrides {
            recovery_window_size: Some(256),
            max_output_size: Some(0),
            chunk_size: Some(64),
            compression: Some("none".to_string()),
        };
        let config =
            SubsetterConfig::from_parts(ReaderConfig::default(), SlicerConfig::default(), &overrides)
                .unwrap();

        assert_eq!(config.reader.recovery_window_size, 256);
        assert_eq!(config.reader.max_output_size, None);
        assert_eq!(config.slicer.output_chunk_size, 64);
        assert_eq!(config.slicer.compression, SliceCompression::None);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let overrides = ConfigOverrides {
            recovery_window_size: Some(0),
            ..Default::default()
        };
        assert!(
            SubsetterConfig::from_parts(ReaderConfig::default(), SlicerConfig::default(), &overrides)
                .is_err()
        );
    }
}
