//! Error types for array slicing.

use thiserror::Error;

/// Errors that can occur while resolving, reading or persisting array slices.
#[derive(Error, Debug)]
pub enum SliceError {
    /// The store location uses a protocol this build cannot open.
    #[error("unsupported array store protocol '{scheme}' in {url}")]
    UnsupportedProtocol { url: String, scheme: String },

    /// Failed to open the array store or one of its arrays.
    #[error("failed to open {location}: {message}")]
    OpenFailed { location: String, message: String },

    /// Requested variable is not present in the store.
    #[error("variable '{requested}' not found; available: {}", available.join(", "))]
    MissingVariable {
        requested: String,
        available: Vec<String>,
    },

    /// A time, latitude or longitude dimension could not be matched.
    #[error("{variable}: no {axis} axis among dimensions [{}]", dimensions.join(", "))]
    AxisNotFound {
        variable: String,
        axis: String,
        dimensions: Vec<String>,
    },

    /// The requested bounds select nothing along an axis.
    #[error("{variable}: requested {axis} range {requested} does not overlap the data")]
    NoOverlap {
        variable: String,
        axis: String,
        requested: String,
    },

    /// The caller cancelled the slice.
    #[error("slice of '{0}' cancelled")]
    Cancelled(String),

    /// Failed to read array data.
    #[error("failed to read array data: {0}")]
    ReadFailed(String),

    /// Invalid or unsupported array metadata.
    #[error("invalid array metadata: {0}")]
    InvalidMetadata(String),

    /// Failed to write the output store.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Every variable of a multi-variable slice failed.
    #[error("no variable could be sliced: {}", warnings.join("; "))]
    NothingSliced { warnings: Vec<String> },

    /// Storage/IO error.
    #[error("storage error: {0}")]
    StorageError(String),
}

impl SliceError {
    /// Create an OpenFailed error.
    pub fn open_failed(location: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::OpenFailed {
            location: location.into(),
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

    /// Create a WriteFailed error.
    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }

    /// Create an AxisNotFound error.
    pub fn axis_not_found(
        variable: impl Into<String>,
        axis: impl Into<String>,
        dimensions: &[String],
    ) -> Self {
        Self::AxisNotFound {
            variable: variable.into(),
            axis: axis.into(),
            dimensions: dimensions.to_vec(),
        }
    }

    /// True for conditions reported as warnings rather than failures.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::AxisNotFound { .. } | Self::NoOverlap { .. })
    }

    /// True when the caller should retry with a different area or time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoOverlap { .. } => true,
            Self::NothingSliced { .. } => true,
            _ => false,
        }
    }
}

impl From<std::io::Error> for SliceError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for SliceError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMetadata(err.to_string())
    }
}

/// Result type for array slicing operations.
pub type Result<T> = std::result::Result<T, SliceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variable_lists_alternatives() {
        let err = SliceError::MissingVariable {
            requested: "tas".to_string(),
            available: vec!["tmax".to_string(), "tmin".to_string()],
        };
        assert_eq!(err.to_string(), "variable 'tas' not found; available: tmax, tmin");
    }

    #[test]
    fn test_warning_classification() {
        let dims = vec!["band".to_string()];
        assert!(SliceError::axis_not_found("tmax", "time", &dims).is_warning());
        assert!(!SliceError::Cancelled("tmax".to_string()).is_warning());
        assert!(!SliceError::read_failed("boom").is_retryable());
    }
}
