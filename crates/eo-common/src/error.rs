//! Error types shared by the eo-subset crates.

use thiserror::Error;

/// Result type alias using EoError.
pub type EoResult<T> = Result<T, EoError>;

/// Request validation errors raised before any data is touched.
#[derive(Debug, Error)]
pub enum EoError {
    #[error("Invalid bbox: {0}")]
    InvalidBbox(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("AOI too large ({area_km2:.0} km²). Maximum allowed is {limit_km2:.0} km²")]
    AoiTooLarge { area_km2: f64, limit_km2: f64 },

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),
}

impl EoError {
    /// Short machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            EoError::InvalidBbox(_) => "InvalidBBox",
            EoError::InvalidTime(_) => "InvalidTime",
            EoError::AoiTooLarge { .. } => "AoiTooLarge",
            EoError::UnknownCollection(_) => "UnknownCollection",
        }
    }
}
