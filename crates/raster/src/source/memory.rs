//! In-memory raster source.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use eo_common::PixelWindow;
use projection::GeoKeys;

use super::{RasterHandle, RasterSource};
use crate::error::{RasterError, Result};
use crate::types::{BandArray, GeoTransform, RasterMetadata, SampleBuffer};

/// A raster held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    metadata: RasterMetadata,
    bands: Vec<SampleBuffer>,
}

impl MemoryRaster {
    /// Build a raster from row-major bands of equal type and size.
    pub fn new(
        width: u32,
        height: u32,
        transform: GeoTransform,
        geokeys: GeoKeys,
        bands: Vec<SampleBuffer>,
    ) -> Result<Self> {
        let first = bands
            .first()
            .ok_or_else(|| RasterError::invalid_metadata("raster has no bands"))?;
        let expected = width as usize * height as usize;
        for (i, band) in bands.iter().enumerate() {
            if band.len() != expected {
                return Err(RasterError::invalid_metadata(format!(
                    "band {} has {} samples, expected {}",
                    i,
                    band.len(),
                    expected
                )));
            }
            if band.sample_type() != first.sample_type() {
                return Err(RasterError::invalid_metadata("bands differ in sample type"));
            }
        }

        Ok(Self {
            metadata: RasterMetadata {
                width,
                height,
                band_count: bands.len(),
                sample_type: first.sample_type(),
                transform,
                geokeys,
                nodata: None,
            },
            bands,
        })
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.metadata.nodata = Some(nodata);
        self
    }

    pub fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }
}

/// Serves [`MemoryRaster`]s by URL and counts open handles.
#[derive(Debug, Default)]
pub struct MemoryRasterSource {
    rasters: HashMap<String, Arc<MemoryRaster>>,
    failing_reads: HashSet<String>,
    open_handles: Arc<AtomicUsize>,
    opened_total: Arc<AtomicUsize>,
}

impl MemoryRasterSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster under `url`.
    pub fn with_raster(mut self, url: impl Into<String>, raster: MemoryRaster) -> Self {
        self.rasters.insert(url.into(), Arc::new(raster));
        self
    }

    /// Make every read of `url` fail after a successful open.
    pub fn with_failing_reads(mut self, url: impl Into<String>) -> Self {
        self.failing_reads.insert(url.into());
        self
    }

    /// Handles opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Handles opened over the source's lifetime.
    pub fn opened_total(&self) -> usize {
        self.opened_total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RasterSource for MemoryRasterSource {
    async fn open(&self, url: &str) -> Result<Box<dyn RasterHandle>> {
        let raster = self
            .rasters
            .get(url)
            .cloned()
            .ok_or_else(|| RasterError::open_failed(url, "no such raster"))?;

        self.open_handles.fetch_add(1, Ordering::SeqCst);
        self.opened_total.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemoryHandle {
            raster,
            fail_reads: self.failing_reads.contains(url),
            open_handles: Arc::clone(&self.open_handles),
            closed: false,
        }))
    }
}

struct MemoryHandle {
    raster: Arc<MemoryRaster>,
    fail_reads: bool,
    open_handles: Arc<AtomicUsize>,
    closed: bool,
}

#[async_trait]
impl RasterHandle for MemoryHandle {
    fn metadata(&self) -> &RasterMetadata {
        &self.raster.metadata
    }

    async fn read_window(&self, window: &PixelWindow, bands: &[usize]) -> Result<Vec<BandArray>> {
        if self.closed {
            return Err(RasterError::read_failed("handle is closed"));
        }
        if self.fail_reads {
            return Err(RasterError::read_failed("simulated read failure"));
        }

        let meta = &self.raster.metadata;
        if !window.fits_within(meta.width, meta.height) {
            return Err(RasterError::read_failed(format!(
                "window {} outside {}x{} raster",
                window, meta.width, meta.height
            )));
        }

        bands
            .iter()
            .map(|&b| {
                let band = self.raster.bands.get(b).ok_or(RasterError::BandOutOfRange {
                    band: b,
                    count: meta.band_count,
                })?;
                Ok(BandArray::new(
                    window.width(),
                    window.height(),
                    band.crop(meta.width, window),
                ))
            })
            .collect()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_handles.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
