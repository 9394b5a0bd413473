//! Windowed Raster Reads and Compositing
//!
//! This crate reads only the pixels a request needs from tiled raster
//! assets and turns them into analysis or display output:
//!
//! - **Window resolution**: lon/lat bounding box to native pixel window,
//!   reprojecting through the raster's GeoKeys
//! - **Band stacking**: one multi-band asset, or several single-band assets
//!   aligned onto the first asset's grid
//! - **Normalization**: per-channel percentile stretch or pass-through
//! - **Output**: interleaved 8-bit RGB, or a cropped float GeoTIFF
//!
//! # Architecture
//!
//! ```text
//! read_composite(assets, bbox)
//!      │
//!      ├─► ScopedRaster::open(first asset)
//!      │         │
//!      │         └─► resolve_window(metadata, bbox)  (4 projected corners)
//!      │
//!      ├─► try_join_all(read_window per asset)
//!      │         │
//!      │         └─► resample_nearest onto the output size (capped, full extent)
//!      │
//!      ├─► signal check (all sampled values zero?)
//!      │
//!      └─► normalize_channels + interleave
//!               │
//!               ▼
//!          RgbComposite
//! ```
//!
//! Every opened asset is held by a [`ScopedRaster`] guard and released on
//! all exit paths.
//!
//! # Example
//!
//! ```ignore
//! use raster::{read_composite, AssetRef, ChannelSelection, GeoTiffSource,
//!              Normalization, ReaderConfig, WindowRequest};
//! use eo_common::BoundingBox;
//!
//! let source = GeoTiffSource::new();
//! let assets = [AssetRef::new("visual", "/data/tile.tif")];
//! let request = WindowRequest::Bbox {
//!     bbox: BoundingBox::new(14.9, 44.9, 15.1, 45.0),
//!     max_size: Some(1024),
//! };
//! let rgb = read_composite(&source, &assets, request, &ChannelSelection::default(),
//!                          Normalization::PercentileStretch, &ReaderConfig::default())
//!     .await?
//!     .require_signal()?;
//! ```

pub mod composite;
pub mod config;
pub mod error;
pub mod normalize;
pub mod resample;
pub mod signing;
pub mod source;
pub mod types;
pub mod window;
pub mod writer;

// Re-export commonly used types at crate root
pub use composite::{compose_rgb, read_band_stack, read_composite};
pub use config::ReaderConfig;
pub use error::{RasterError, Result};
pub use signing::{NoopSigner, SignedSource, UrlSigner};
pub use source::{
    GeoTiffSource, MemoryRaster, MemoryRasterSource, RasterHandle, RasterSource, ScopedRaster,
};
pub use types::{
    AssetRef, BandArray, BandStack, ChannelSelection, GeoTransform, Normalization,
    RasterMetadata, RgbComposite, SampleBuffer, SampleType, WindowRequest,
};
pub use window::{output_size, resolve_window, window_for_bbox, ResolvedWindow};
pub use writer::{write_geotiff, GeoTiffCompression};
