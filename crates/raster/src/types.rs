//! Core types for raster reads.

use eo_common::{BoundingBox, PixelWindow};
use projection::{resolve_projection, GeoKeys, ProjectionDefinition};
use serde::Serialize;

/// Affine georeferencing of a north-up raster.
///
/// Pixel `(col, row)` has its top-left corner at
/// `(origin_x + col * pixel_width, origin_y + row * pixel_height)`.
/// `pixel_height` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// World coordinates of a (fractional) pixel position.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Fractional pixel position of a world coordinate.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Transform of a sub-window of this raster.
    pub fn for_window(&self, window: &PixelWindow) -> Self {
        let (x, y) = self.pixel_to_world(window.left as f64, window.top as f64);
        Self::new(x, y, self.pixel_width, self.pixel_height)
    }

    /// Transform after resampling `src` pixels to `dst` pixels on each axis.
    pub fn resampled(&self, src: (u32, u32), dst: (u32, u32)) -> Self {
        let sx = src.0 as f64 / dst.0.max(1) as f64;
        let sy = src.1 as f64 / dst.1.max(1) as f64;
        Self::new(
            self.origin_x,
            self.origin_y,
            self.pixel_width * sx,
            self.pixel_height * sy,
        )
    }

    /// World-coordinate bounds of a window.
    pub fn window_bounds(&self, window: &PixelWindow) -> BoundingBox {
        let (x0, y0) = self.pixel_to_world(window.left as f64, window.top as f64);
        let (x1, y1) = self.pixel_to_world(window.right as f64, window.bottom as f64);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// Numeric type of raster samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    U8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

/// Sample values with their source numeric type preserved.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! each_buffer {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            SampleBuffer::U8($v) => $body,
            SampleBuffer::U16($v) => $body,
            SampleBuffer::I16($v) => $body,
            SampleBuffer::U32($v) => $body,
            SampleBuffer::I32($v) => $body,
            SampleBuffer::F32($v) => $body,
            SampleBuffer::F64($v) => $body,
        }
    };
}

macro_rules! map_buffer {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            SampleBuffer::U8($v) => SampleBuffer::U8($body),
            SampleBuffer::U16($v) => SampleBuffer::U16($body),
            SampleBuffer::I16($v) => SampleBuffer::I16($body),
            SampleBuffer::U32($v) => SampleBuffer::U32($body),
            SampleBuffer::I32($v) => SampleBuffer::I32($body),
            SampleBuffer::F32($v) => SampleBuffer::F32($body),
            SampleBuffer::F64($v) => SampleBuffer::F64($body),
        }
    };
}

impl SampleBuffer {
    /// Zero-filled buffer of `len` samples.
    pub fn zeros(sample_type: SampleType, len: usize) -> Self {
        match sample_type {
            SampleType::U8 => SampleBuffer::U8(vec![0; len]),
            SampleType::U16 => SampleBuffer::U16(vec![0; len]),
            SampleType::I16 => SampleBuffer::I16(vec![0; len]),
            SampleType::U32 => SampleBuffer::U32(vec![0; len]),
            SampleType::I32 => SampleBuffer::I32(vec![0; len]),
            SampleType::F32 => SampleBuffer::F32(vec![0.0; len]),
            SampleType::F64 => SampleBuffer::F64(vec![0.0; len]),
        }
    }

    /// Copy `count` samples into `self` at `dst_start`, taking every
    /// `src_stride`-th value of `src` from `src_start`.
    ///
    /// Returns false when the two buffers hold different sample types.
    pub fn copy_strided(
        &mut self,
        dst_start: usize,
        src: &SampleBuffer,
        src_start: usize,
        src_stride: usize,
        count: usize,
    ) -> bool {
        macro_rules! copy {
            ($dst:expr, $src:expr) => {{
                let values = $src.iter().skip(src_start).step_by(src_stride.max(1)).take(count);
                for (slot, value) in $dst[dst_start..dst_start + count].iter_mut().zip(values) {
                    *slot = *value;
                }
                true
            }};
        }
        match (self, src) {
            (SampleBuffer::U8(d), SampleBuffer::U8(s)) => copy!(d, s),
            (SampleBuffer::U16(d), SampleBuffer::U16(s)) => copy!(d, s),
            (SampleBuffer::I16(d), SampleBuffer::I16(s)) => copy!(d, s),
            (SampleBuffer::U32(d), SampleBuffer::U32(s)) => copy!(d, s),
            (SampleBuffer::I32(d), SampleBuffer::I32(s)) => copy!(d, s),
            (SampleBuffer::F32(d), SampleBuffer::F32(s)) => copy!(d, s),
            (SampleBuffer::F64(d), SampleBuffer::F64(s)) => copy!(d, s),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        each_buffer!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            SampleBuffer::U8(_) => SampleType::U8,
            SampleBuffer::U16(_) => SampleType::U16,
            SampleBuffer::I16(_) => SampleType::I16,
            SampleBuffer::U32(_) => SampleType::U32,
            SampleBuffer::I32(_) => SampleType::I32,
            SampleBuffer::F32(_) => SampleType::F32,
            SampleBuffer::F64(_) => SampleType::F64,
        }
    }

    /// Value at `index` widened to f64.
    pub fn get(&self, index: usize) -> Option<f64> {
        each_buffer!(self, v => v.get(index).map(|x| *x as f64))
    }

    /// All values widened to f64.
    pub fn to_f64(&self) -> Vec<f64> {
        each_buffer!(self, v => v.iter().map(|x| *x as f64).collect())
    }

    /// All values narrowed to f32.
    pub fn to_f32(&self) -> Vec<f32> {
        each_buffer!(self, v => v.iter().map(|x| *x as f32).collect())
    }

    /// New buffer of the same type holding the values at `indices`.
    pub fn gather(&self, indices: &[usize]) -> SampleBuffer {
        map_buffer!(self, v => indices.iter().map(|&i| v[i]).collect())
    }

    /// Every `stride`-th value starting at `offset`, for de-interleaving
    /// pixel-interleaved samples.
    pub fn deinterleave(&self, offset: usize, stride: usize) -> SampleBuffer {
        map_buffer!(self, v => v.iter().skip(offset).step_by(stride.max(1)).copied().collect())
    }

    /// Rows/columns of `window` out of a row-major buffer `width` wide.
    pub fn crop(&self, width: u32, window: &PixelWindow) -> SampleBuffer {
        let width = width as usize;
        let (left, right) = (window.left as usize, window.right as usize);
        map_buffer!(self, v => {
            let mut out = Vec::with_capacity(window.pixel_count());
            for row in window.top as usize..window.bottom as usize {
                let start = row * width;
                out.extend_from_slice(&v[start + left..start + right]);
            }
            out
        })
    }
}

/// One band of pixels in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct BandArray {
    pub width: u32,
    pub height: u32,
    pub data: SampleBuffer,
}

impl BandArray {
    pub fn new(width: u32, height: u32, data: SampleBuffer) -> Self {
        Self {
            width,
            height,
            data,
        }
    }
}

/// Georeferencing and layout of an opened raster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterMetadata {
    pub width: u32,
    pub height: u32,
    pub band_count: usize,
    pub sample_type: SampleType,
    pub transform: GeoTransform,
    pub geokeys: GeoKeys,
    pub nodata: Option<f64>,
}

impl RasterMetadata {
    /// Projection of the raster, `None` when already geographic.
    pub fn projection(&self) -> Option<ProjectionDefinition> {
        resolve_projection(&self.geokeys)
    }
}

/// A named asset and where to read it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRef {
    pub name: String,
    pub href: String,
}

impl AssetRef {
    pub fn new(name: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            href: href.into(),
        }
    }
}

/// Which part of the raster to read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowRequest {
    /// The whole raster.
    Full,
    /// An explicit pixel window of the first asset.
    Window(PixelWindow),
    /// A geographic bbox, optionally capped in output size.
    Bbox {
        bbox: BoundingBox,
        max_size: Option<u32>,
    },
}

/// Which bands of a single multi-band asset to composite.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChannelSelection {
    /// First three bands; a single-band raster is repeated.
    #[default]
    FirstThree,
    /// Explicit zero-based band indices.
    Bands(Vec<usize>),
}

/// How raw samples become 8-bit display values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Per-channel percentile contrast stretch.
    PercentileStretch,
    /// Values already in display range, clamped to 0..=255.
    PassThrough,
}

impl Normalization {
    /// Pass-through for 8-bit sources, stretch otherwise.
    pub fn for_sample_type(sample_type: SampleType) -> Self {
        match sample_type {
            SampleType::U8 => Normalization::PassThrough,
            _ => Normalization::PercentileStretch,
        }
    }
}

/// Bands read from one or more assets, aligned to a common grid.
#[derive(Debug, Clone)]
pub struct BandStack {
    pub bands: Vec<BandArray>,
    pub names: Vec<String>,
    pub width: u32,
    pub height: u32,
    /// Window of the first asset the stack covers.
    pub window: PixelWindow,
    /// Georeferencing of the stack's pixel grid.
    pub transform: GeoTransform,
    pub geokeys: GeoKeys,
    pub nodata: Option<f64>,
}

/// An 8-bit interleaved RGB image.
#[derive(Debug, Clone)]
pub struct RgbComposite {
    pub width: u32,
    pub height: u32,
    /// Interleaved RGB, `width * height * 3` bytes.
    pub pixels: Vec<u8>,
    /// True when every sampled input value was zero.
    pub signal_less: bool,
    pub window: PixelWindow,
    pub transform: GeoTransform,
    pub assets: Vec<String>,
}

impl RgbComposite {
    /// Turn a signal-less composite into a retryable error.
    pub fn require_signal(self) -> crate::Result<Self> {
        if self.signal_less {
            return Err(crate::RasterError::SignalLess {
                assets: self.assets,
                window: self.window.to_string(),
            });
        }
        Ok(self)
    }
}
