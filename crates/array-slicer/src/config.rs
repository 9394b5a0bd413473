//! Configuration for array slicing and persistence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the coordinate cache and the local array writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicerConfig {
    /// Seconds a cached coordinate array stays valid.
    pub coordinate_cache_ttl_secs: u64,

    /// Maximum number of coordinate arrays kept in the cache.
    pub coordinate_cache_capacity: usize,

    /// Chunk length along each output dimension.
    pub output_chunk_size: usize,

    /// Compression codec for the output store.
    pub compression: SliceCompression,

    /// Compression level (1-9).
    pub compression_level: u8,

    /// Slices along the leading dimension read per step. The cancellation
    /// flag is checked between steps.
    pub rows_per_step: usize,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            coordinate_cache_ttl_secs: 3600,
            coordinate_cache_capacity: 256,
            output_chunk_size: 256,
            compression: SliceCompression::BloscZstd,
            compression_level: 3,
            rows_per_step: 8,
        }
    }
}

impl SlicerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SLICER_CACHE_TTL_SECS") {
            if let Ok(secs) = val.parse() {
                config.coordinate_cache_ttl_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("SLICER_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.coordinate_cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("SLICER_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                config.output_chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("SLICER_COMPRESSION") {
            config.compression = SliceCompression::from_str(&val);
        }

        if let Ok(val) = std::env::var("SLICER_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("SLICER_ROWS_PER_STEP") {
            if let Ok(rows) = val.parse() {
                config.rows_per_step = rows;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.coordinate_cache_capacity == 0 {
            return Err("coordinate_cache_capacity must be > 0".to_string());
        }

        if self.output_chunk_size == 0 {
            return Err("output_chunk_size must be > 0".to_string());
        }

        if self.compression != SliceCompression::None
            && (self.compression_level == 0 || self.compression_level > 9)
        {
            return Err("compression_level must be 1-9".to_string());
        }

        if self.rows_per_step == 0 {
            return Err("rows_per_step must be > 0".to_string());
        }

        Ok(())
    }

    /// Time-to-live of cached coordinate arrays.
    pub fn coordinate_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.coordinate_cache_ttl_secs)
    }
}

/// Compression codec for persisted slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SliceCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd.
    #[default]
    BloscZstd,
}

impl SliceCompression {
    /// Parse from string (case-insensitive). Unknown names fall back to Blosc Zstd.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "lz4" | "blosc_lz4" => Self::BloscLz4,
            _ => Self::BloscZstd,
        }
    }

    /// Get the codec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for SliceCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
