//! Preview rendering for earth-observation subsets.
//!
//! Chooses how an item should be visualized and renders it to PNG:
//! - True-color composites from a pre-rendered asset, a stacked aerial
//!   asset or three single-band assets
//! - Terrain ramp for elevation models
//! - Palette lookup for land-cover classifications
//! - False color for dual-polarization radar
//! - Heatmaps of sliced climate arrays
//!
//! # Architecture
//!
//! ```text
//! select_strategy(collection, item)  ──►  VisualizationStrategy
//!                                                │
//! render(strategy, item, source, output)         ▼
//!      │                                  raster::read_band_stack
//!      ├─► DirectAsset / SingleAssetChannels / PerBandAssets
//!      │        └─► compose_rgb (pass-through or percentile stretch)
//!      ├─► ElevationColormap ─► colorize_elevation
//!      ├─► ClassificationColormap ─► colorize_classes
//!      └─► DualPolarizationFalseColor ─► dual_pol_false_color
//!               │
//!               ▼
//!          encode_png ─► output file
//! ```

pub mod classification;
pub mod elevation;
pub mod error;
pub mod palette;
pub mod png;
pub mod preview;
pub mod ramp;
pub mod render;
pub mod sar;
pub mod strategy;

// Re-export commonly used types at crate root
pub use classification::{colorize_classes, ClassCount};
pub use elevation::{colorize_elevation, ElevationStats};
pub use error::{RenderError, Result};
pub use palette::{ClassHint, ClassificationPalette, PaletteEntry};
pub use png::{encode_png, write_png, RgbaImage};
pub use preview::{render_array_preview, ArrayPlane, PreviewSummary};
pub use ramp::{Color, ColorRamp};
pub use render::{render, RenderSummary};
pub use strategy::{require_strategy, select_strategy, AssetInfo, ItemAssets, VisualizationStrategy};
