//! Subsetting of chunked climate arrays by bounding box and time range.
//!
//! Given a store of named n-dimensional arrays (a local Zarr hierarchy or
//! memory), the slicer figures out which dimensions are time, latitude
//! and longitude, turns the request into index ranges along them and
//! writes the selected block, with its coordinates, to a local Zarr store.
//!
//! # Architecture
//!
//! ```text
//! SliceRequest
//!      │
//!      ▼
//! select_variables()      requested / collection defaults / all
//!      │
//!      ▼  per variable
//! resolve_axes_and_slice()
//!      │
//!      ├─► resolve_axes()          dimension names -> time/lat/lon
//!      │
//!      ├─► CoordinateCache         coordinate arrays (LRU + TTL)
//!      │
//!      ├─► DatasetFamily           time encoding, Daymet fallbacks, LCC bounds
//!      │
//!      └─► find_index_range()      two-pointer scan, seam-aware longitude
//!               │
//!               ▼
//!          AxisSelection (+ warnings)
//!               │
//!               ▼
//! persist_slice()         block reads, decode, Zarr write
//! ```
//!
//! # Example
//!
//! ```ignore
//! use array_slicer::{open_store, slice_variables, CancellationFlag, CoordinateCache,
//!     SliceRequest, SlicerConfig};
//!
//! let store = open_store("/data/gridmet.zarr")?;
//! let config = SlicerConfig::from_env();
//! let cache = CoordinateCache::from_config(&config);
//! let request = SliceRequest {
//!     collection_id: "gridmet".into(),
//!     variables: vec![],
//!     bbox: Some(BoundingBox::new(-110.0, 40.0, -105.0, 45.0)),
//!     time: Some(TimeRange::parse("2020-07-01/2020-07-31")?),
//! };
//! let outcome = slice_variables(store.as_ref(), &request, "out.zarr".as_ref(),
//!     &config, &cache, &CancellationFlag::new()).await?;
//! ```

pub mod axes;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod error;
pub mod family;
pub mod index_range;
pub mod persist;
pub mod preview;
pub mod slice;
pub mod store;
pub mod time;

// Re-export commonly used types at crate root
pub use axes::{resolve_axes, AxisKind, ResolvedAxes};
pub use cache::CoordinateCache;
pub use cancel::CancellationFlag;
pub use config::{SliceCompression, SlicerConfig};
pub use error::{Result, SliceError};
pub use family::{DatasetFamily, DaymetCadence};
pub use index_range::{find_index_range, find_longitude_ranges, IndexRange, LongitudeConvention};
pub use persist::{persist_slice, ArraySummary, SlicedArrayResult, TimeSummary, ValueRange};
pub use preview::{read_preview_plane, PreviewPlane};
pub use slice::{
    list_variables, resolve_axes_and_slice, select_variables, slice_variables, ArrayRequest,
    AxisSelection, DimensionSelection, MultiSliceOutcome, SliceRequest,
};
pub use store::{open_store, ArrayInfo, ArrayStore, MemoryArray, MemoryArrayStore, ZarrStore};
pub use time::{Calendar, TimeEncoding, TimeUnit};
