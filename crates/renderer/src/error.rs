//! Error types for rendering.

use raster::RasterError;
use thiserror::Error;

/// Errors that can occur while selecting a strategy or rendering output.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Reading the source rasters failed.
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// The strategy names an asset the item does not have.
    #[error("asset '{requested}' not found on item; available: {}", available.join(", "))]
    MissingAsset {
        requested: String,
        available: Vec<String>,
    },

    /// No strategy applies to the item.
    #[error("no visualization strategy available for collection '{collection}' (assets: {})", assets.join(", "))]
    NoStrategy {
        collection: String,
        assets: Vec<String>,
    },

    /// Input data cannot be rendered.
    #[error("invalid render input: {0}")]
    InvalidInput(String),

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(String),

    /// Writing the output file failed.
    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },
}

impl RenderError {
    /// Create an InvalidInput error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True when the caller should retry with a different item or time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Raster(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
