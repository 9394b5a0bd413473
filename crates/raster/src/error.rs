//! Error types for raster reading.

use thiserror::Error;

/// Errors that can occur while reading and compositing rasters.
#[derive(Error, Debug)]
pub enum RasterError {
    /// Failed to open the raster asset.
    #[error("failed to open raster {url}: {message}")]
    OpenFailed { url: String, message: String },

    /// Failed to read pixels from the raster.
    #[error("failed to read raster data: {0}")]
    ReadFailed(String),

    /// A read failed for one asset of a multi-asset composite.
    #[error("asset '{asset}' failed: {source}")]
    AssetRead {
        asset: String,
        #[source]
        source: Box<RasterError>,
    },

    /// Requested asset or band is not present on the item.
    #[error("asset '{requested}' not found; available: {}", available.join(", "))]
    MissingAsset {
        requested: String,
        available: Vec<String>,
    },

    /// Band index beyond the raster's band count.
    #[error("band {band} out of range; raster has {count} bands")]
    BandOutOfRange { band: usize, count: usize },

    /// Every sampled value in the window was zero.
    #[error("no signal in {assets:?} for window {window}; try another item or date")]
    SignalLess { assets: Vec<String>, window: String },

    /// Unsupported sample layout or data type.
    #[error("unsupported raster format: {0}")]
    Unsupported(String),

    /// Invalid metadata in the raster file.
    #[error("invalid raster metadata: {0}")]
    InvalidMetadata(String),

    /// Failed to write output.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Storage/IO error.
    #[error("storage error: {0}")]
    StorageError(String),
}

impl RasterError {
    /// Create an OpenFailed error.
    pub fn open_failed(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::OpenFailed {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Wrap an error with the asset it came from.
    pub fn for_asset(self, asset: impl Into<String>) -> Self {
        match self {
            // Already attributed
            e @ Self::AssetRead { .. } => e,
            e => Self::AssetRead {
                asset: asset.into(),
                source: Box::new(e),
            },
        }
    }

    /// True when the caller should retry with a different item or time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SignalLess { .. } => true,
            Self::AssetRead { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for RasterError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<tiff::TiffError> for RasterError {
    fn from(err: tiff::TiffError) -> Self {
        Self::ReadFailed(format!("TIFF: {}", err))
    }
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
