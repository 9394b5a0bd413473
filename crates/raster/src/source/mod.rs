//! Raster access traits and scoped handles.

mod geotiff;
mod memory;

pub use geotiff::GeoTiffSource;
pub use memory::{MemoryRaster, MemoryRasterSource};

use async_trait::async_trait;
use eo_common::PixelWindow;
use tracing::debug;

use crate::error::Result;
use crate::types::{BandArray, RasterMetadata};

/// Opens raster assets by URL.
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// Open an asset. The handle stays open until `close` is called.
    async fn open(&self, url: &str) -> Result<Box<dyn RasterHandle>>;
}

/// An opened raster asset.
#[async_trait]
pub trait RasterHandle: Send + Sync {
    /// Dimensions, band count and georeferencing.
    fn metadata(&self) -> &RasterMetadata;

    /// Read the given zero-based bands over a pixel window.
    ///
    /// The window must lie inside the raster.
    async fn read_window(&self, window: &PixelWindow, bands: &[usize]) -> Result<Vec<BandArray>>;

    /// Release the underlying connection. Calling twice is a no-op.
    fn close(&mut self);
}

/// Owns a raster handle and closes it when dropped, on every exit path.
pub struct ScopedRaster {
    url: String,
    handle: Box<dyn RasterHandle>,
}

impl ScopedRaster {
    /// Open `url` from `source` for the lifetime of the returned guard.
    pub async fn open(source: &dyn RasterSource, url: &str) -> Result<Self> {
        let handle = source.open(url).await?;
        debug!(url = %url, "Opened raster");
        Ok(Self {
            url: url.to_string(),
            handle,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn metadata(&self) -> &RasterMetadata {
        self.handle.metadata()
    }

    pub async fn read_window(
        &self,
        window: &PixelWindow,
        bands: &[usize],
    ) -> Result<Vec<BandArray>> {
        self.handle.read_window(window, bands).await
    }
}

impl Drop for ScopedRaster {
    fn drop(&mut self) {
        self.handle.close();
        debug!(url = %self.url, "Released raster");
    }
}
