//! Common types and utilities shared across the eo-subset crates.

pub mod bbox;
pub mod collection;
pub mod error;
pub mod time;
pub mod window;

pub use bbox::{AoiAssessment, AoiPolicy, BoundingBox};
pub use collection::{CollectionCategory, CollectionInfo, DataKind, SizeEstimate};
pub use error::{EoError, EoResult};
pub use time::TimeRange;
pub use window::PixelWindow;
