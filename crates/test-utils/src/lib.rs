//! Shared test utilities for the eo-subset workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic raster, terrain, land-cover, radar and climate generators
//! - Temporary output directories
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{create_elevation_grid, temp_test_dir_with_prefix};
//! ```

pub mod generators;

// Re-export commonly used items at the crate root
pub use generators::*;

/// Creates a temporary directory with a specific prefix.
///
/// # Arguments
///
/// * `prefix` - A prefix for the directory name (e.g., "slice_test")
///
/// # Returns
///
/// A `tempfile::TempDir` that is removed when dropped.
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}
