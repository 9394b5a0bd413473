//! Projection errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Invalid projection parameters: {0}")]
    InvalidParameters(String),

    #[error("Malformed GeoKey directory: {0}")]
    MalformedGeoKeys(String),
}
