//! Local GeoTIFF raster source.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eo_common::PixelWindow;
use projection::geokeys::{
    GDAL_NODATA_TAG, GEO_ASCII_PARAMS_TAG, GEO_DOUBLE_PARAMS_TAG, GEO_KEY_DIRECTORY_TAG,
    MODEL_PIXEL_SCALE_TAG, MODEL_TIEPOINT_TAG,
};
use projection::GeoKeys;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::{debug, warn};

use super::{RasterHandle, RasterSource};
use crate::error::{RasterError, Result};
use crate::types::{BandArray, GeoTransform, RasterMetadata, SampleBuffer, SampleType};

const MODEL_TRANSFORMATION_TAG: u16 = 34264;

/// Reads GeoTIFFs from the local filesystem.
///
/// Accepts plain paths and `file://` URLs. Reads decode only the strips or
/// tiles a window overlaps, on the blocking thread pool.
#[derive(Debug, Clone, Default)]
pub struct GeoTiffSource;

impl GeoTiffSource {
    pub fn new() -> Self {
        Self
    }
}

fn local_path(url: &str) -> Result<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") {
        return Err(RasterError::open_failed(
            url,
            "only local paths and file:// URLs are supported",
        ));
    }
    Ok(PathBuf::from(url))
}

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited()))
}

fn samples_per_pixel(color: ColorType) -> Result<usize> {
    Ok(match color {
        ColorType::Gray(_) => 1,
        ColorType::GrayA(_) => 2,
        ColorType::RGB(_) => 3,
        ColorType::RGBA(_) | ColorType::CMYK(_) => 4,
        ColorType::Multiband { num_samples, .. } => num_samples as usize,
        other => {
            return Err(RasterError::Unsupported(format!(
                "color type {:?}",
                other
            )))
        }
    })
}

fn sample_type(decoder: &mut Decoder<BufReader<File>>, color: ColorType) -> Result<SampleType> {
    let bits = match color {
        ColorType::Gray(b)
        | ColorType::GrayA(b)
        | ColorType::RGB(b)
        | ColorType::RGBA(b)
        | ColorType::CMYK(b) => b,
        ColorType::Multiband { bit_depth, .. } => bit_depth,
        other => {
            return Err(RasterError::Unsupported(format!(
                "color type {:?}",
                other
            )))
        }
    };
    // SampleFormat: 1 = unsigned, 2 = signed, 3 = float
    let format = decoder
        .get_tag_u16_vec(Tag::SampleFormat)
        .ok()
        .and_then(|v| v.first().copied())
        .unwrap_or(1);

    Ok(match (format, bits) {
        (1, 8) => SampleType::U8,
        (1, 16) => SampleType::U16,
        (1, 32) => SampleType::U32,
        (2, 8) | (2, 16) => SampleType::I16,
        (2, 32) => SampleType::I32,
        (3, 32) => SampleType::F32,
        (3, 64) | (1, 64) | (2, 64) => SampleType::F64,
        _ => {
            return Err(RasterError::Unsupported(format!(
                "sample format {} with {} bits",
                format, bits
            )))
        }
    })
}

fn read_transform(decoder: &mut Decoder<BufReader<File>>) -> Result<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE_TAG)).ok();
    let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT_TAG)).ok();

    if let (Some(scale), Some(tie)) = (scale, tiepoint) {
        if scale.len() >= 2 && tie.len() >= 6 {
            return Ok(GeoTransform::new(
                tie[3] - tie[0] * scale[0],
                tie[4] + tie[1] * scale[1],
                scale[0],
                -scale[1],
            ));
        }
    }

    if let Ok(m) = decoder.get_tag_f64_vec(tag(MODEL_TRANSFORMATION_TAG)) {
        if m.len() >= 8 {
            return Ok(GeoTransform::new(m[3], m[7], m[0], m[5]));
        }
    }

    Err(RasterError::invalid_metadata(
        "missing ModelPixelScale/ModelTiepoint or ModelTransformation tags",
    ))
}

fn read_geokeys(decoder: &mut Decoder<BufReader<File>>) -> GeoKeys {
    let Ok(directory) = decoder.get_tag_u16_vec(tag(GEO_KEY_DIRECTORY_TAG)) else {
        warn!("GeoTIFF has no GeoKey directory");
        return GeoKeys::default();
    };
    let doubles = decoder
        .get_tag_f64_vec(tag(GEO_DOUBLE_PARAMS_TAG))
        .unwrap_or_default();
    let ascii = decoder
        .get_tag_ascii_string(tag(GEO_ASCII_PARAMS_TAG))
        .unwrap_or_default();

    GeoKeys::from_directory(&directory, &doubles, &ascii).unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring malformed GeoKey directory");
        GeoKeys::default()
    })
}

fn read_metadata(path: &Path) -> Result<RasterMetadata> {
    let mut decoder = open_decoder(path)?;
    let (width, height) = decoder.dimensions()?;
    let color = decoder.colortype()?;
    let band_count = samples_per_pixel(color)?;
    let sample_type = sample_type(&mut decoder, color)?;
    let transform = read_transform(&mut decoder)?;
    let geokeys = read_geokeys(&mut decoder);
    let nodata = decoder
        .get_tag_ascii_string(tag(GDAL_NODATA_TAG))
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse().ok());

    Ok(RasterMetadata {
        width,
        height,
        band_count,
        sample_type,
        transform,
        geokeys,
        nodata,
    })
}

fn into_buffer(result: DecodingResult) -> Result<SampleBuffer> {
    Ok(match result {
        DecodingResult::U8(v) => SampleBuffer::U8(v),
        DecodingResult::U16(v) => SampleBuffer::U16(v),
        DecodingResult::U32(v) => SampleBuffer::U32(v),
        DecodingResult::U64(v) => SampleBuffer::F64(v.into_iter().map(|x| x as f64).collect()),
        DecodingResult::I8(v) => SampleBuffer::I16(v.into_iter().map(i16::from).collect()),
        DecodingResult::I16(v) => SampleBuffer::I16(v),
        DecodingResult::I32(v) => SampleBuffer::I32(v),
        DecodingResult::I64(v) => SampleBuffer::F64(v.into_iter().map(|x| x as f64).collect()),
        DecodingResult::F32(v) => SampleBuffer::F32(v),
        DecodingResult::F64(v) => SampleBuffer::F64(v),
        #[allow(unreachable_patterns)]
        _ => return Err(RasterError::Unsupported("sample type".into())),
    })
}

/// Strip or tile grid of an image. Strips are chunks as wide as the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkLayout {
    width: u32,
    height: u32,
    chunk_width: u32,
    chunk_height: u32,
}

/// Image-space rectangle covered by one chunk's decoded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkSpan {
    index: u32,
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

impl ChunkLayout {
    fn across(&self) -> u32 {
        self.width.div_ceil(self.chunk_width.max(1))
    }

    /// Chunks overlapping `window`, row by row.
    fn chunks_for(&self, window: &PixelWindow) -> Vec<ChunkSpan> {
        if window.is_degenerate() || self.chunk_width == 0 || self.chunk_height == 0 {
            return Vec::new();
        }
        let (first_col, last_col) = (
            window.left / self.chunk_width,
            (window.right - 1) / self.chunk_width,
        );
        let (first_row, last_row) = (
            window.top / self.chunk_height,
            (window.bottom - 1) / self.chunk_height,
        );

        let mut spans = Vec::new();
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                let left = col * self.chunk_width;
                let top = row * self.chunk_height;
                spans.push(ChunkSpan {
                    index: row * self.across() + col,
                    left,
                    top,
                    // Edge chunks decode without their padding
                    width: self.chunk_width.min(self.width - left),
                    height: self.chunk_height.min(self.height - top),
                });
            }
        }
        spans
    }
}

/// Decode the chunks `window` touches and copy the requested bands out of
/// them. Pixels outside the window are never decoded.
fn read_chunked_window(
    path: &Path,
    meta: &RasterMetadata,
    window: &PixelWindow,
    bands: &[usize],
) -> Result<Vec<SampleBuffer>> {
    let mut decoder = open_decoder(path)?;
    // PlanarConfiguration: 1 = chunky, 2 = planar
    let planar = decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap_or(1);
    if planar == 2 && meta.band_count > 1 {
        return Err(RasterError::Unsupported(
            "band-sequential (planar) GeoTIFF".into(),
        ));
    }

    let (chunk_width, chunk_height) = decoder.chunk_dimensions();
    let layout = ChunkLayout {
        width: meta.width,
        height: meta.height,
        chunk_width,
        chunk_height,
    };
    let spans = layout.chunks_for(window);
    let band_count = meta.band_count;
    let out_width = window.width() as usize;
    let mut out: Vec<Option<SampleBuffer>> = vec![None; bands.len()];

    for span in &spans {
        let chunk = into_buffer(decoder.read_chunk(span.index)?)?;
        let x0 = window.left.max(span.left);
        let x1 = window.right.min(span.left + span.width);
        let y0 = window.top.max(span.top);
        let y1 = window.bottom.min(span.top + span.height);
        let count = (x1 - x0) as usize;

        for (slot, &band) in out.iter_mut().zip(bands) {
            let buffer = slot.get_or_insert_with(|| {
                SampleBuffer::zeros(chunk.sample_type(), window.pixel_count())
            });
            for y in y0..y1 {
                let src_pixel = (y - span.top) as usize * span.width as usize
                    + (x0 - span.left) as usize;
                let dst = (y - window.top) as usize * out_width + (x0 - window.left) as usize;
                if !buffer.copy_strided(dst, &chunk, src_pixel * band_count + band, band_count, count)
                {
                    return Err(RasterError::read_failed(format!(
                        "chunk {} changes sample type",
                        span.index
                    )));
                }
            }
        }
    }

    debug!(
        chunks = spans.len(),
        chunk_width,
        chunk_height,
        window = %window,
        "Decoded GeoTIFF window"
    );
    Ok(out
        .into_iter()
        .map(|b| b.unwrap_or_else(|| SampleBuffer::zeros(meta.sample_type, window.pixel_count())))
        .collect())
}

#[async_trait]
impl RasterSource for GeoTiffSource {
    async fn open(&self, url: &str) -> Result<Box<dyn RasterHandle>> {
        let path = local_path(url)?;
        let meta_path = path.clone();
        let metadata = tokio::task::spawn_blocking(move || read_metadata(&meta_path))
            .await
            .map_err(|e| RasterError::open_failed(url, e.to_string()))?
            .map_err(|e| RasterError::open_failed(url, e.to_string()))?;

        debug!(
            url = %url,
            width = metadata.width,
            height = metadata.height,
            bands = metadata.band_count,
            "Opened GeoTIFF"
        );

        Ok(Box::new(GeoTiffHandle {
            path,
            metadata,
            closed: false,
        }))
    }
}

struct GeoTiffHandle {
    path: PathBuf,
    metadata: RasterMetadata,
    closed: bool,
}

#[async_trait]
impl RasterHandle for GeoTiffHandle {
    fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    async fn read_window(&self, window: &PixelWindow, bands: &[usize]) -> Result<Vec<BandArray>> {
        if self.closed {
            return Err(RasterError::read_failed("handle is closed"));
        }
        let meta = &self.metadata;
        if !window.fits_within(meta.width, meta.height) {
            return Err(RasterError::read_failed(format!(
                "window {} outside {}x{} raster",
                window, meta.width, meta.height
            )));
        }
        if let Some(&bad) = bands.iter().find(|&&b| b >= meta.band_count) {
            return Err(RasterError::BandOutOfRange {
                band: bad,
                count: meta.band_count,
            });
        }

        let path = self.path.clone();
        let meta = meta.clone();
        let window = *window;
        let requested = bands.to_vec();
        let buffers = tokio::task::spawn_blocking(move || {
            read_chunked_window(&path, &meta, &window, &requested)
        })
        .await
        .map_err(|e| RasterError::read_failed(e.to_string()))??;

        Ok(buffers
            .into_iter()
            .map(|data| BandArray::new(window.width(), window.height(), data))
            .collect())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::temp_test_dir_with_prefix;

    fn sample(x: u32, y: u32) -> u8 {
        ((x * 7 + y * 13) % 256) as u8
    }

    /// Minimal little-endian, uncompressed, single-band u8 GeoTIFF cut into
    /// `tile` x `tile` tiles. Edge tiles are padded as TIFF requires.
    fn write_tiled_tiff(path: &Path, width: u32, height: u32, tile: u32) {
        let across = width.div_ceil(tile);
        let down = height.div_ceil(tile);
        let tile_bytes = tile * tile;

        let mut data = Vec::new();
        let mut offsets = Vec::new();
        for ty in 0..down {
            for tx in 0..across {
                offsets.push(8 + data.len() as u32);
                for row in 0..tile {
                    for col in 0..tile {
                        let (x, y) = (tx * tile + col, ty * tile + row);
                        data.push(if x < width && y < height { sample(x, y) } else { 0 });
                    }
                }
            }
        }

        let mut buf: Vec<u8> = vec![b'I', b'I', 42, 0, 0, 0, 0, 0];
        buf.extend_from_slice(&data);
        let scale_at = buf.len() as u32;
        for v in [1.0f64, 1.0, 0.0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        let tie_at = buf.len() as u32;
        for v in [0.0f64, 0.0, 0.0, 10.0, 50.0, 0.0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        let offsets_at = buf.len() as u32;
        for o in &offsets {
            buf.extend_from_slice(&o.to_le_bytes());
        }
        let counts_at = buf.len() as u32;
        for _ in &offsets {
            buf.extend_from_slice(&tile_bytes.to_le_bytes());
        }

        // (tag, type, count, value or offset); SHORT = 3, LONG = 4, DOUBLE = 12
        let n = offsets.len() as u32;
        let entries: [(u16, u16, u32, u32); 13] = [
            (256, 3, 1, width),
            (257, 3, 1, height),
            (258, 3, 1, 8),
            (259, 3, 1, 1),
            (262, 3, 1, 1),
            (277, 3, 1, 1),
            (322, 3, 1, tile),
            (323, 3, 1, tile),
            (324, 4, n, offsets_at),
            (325, 4, n, counts_at),
            (339, 3, 1, 1),
            (MODEL_PIXEL_SCALE_TAG, 12, 3, scale_at),
            (MODEL_TIEPOINT_TAG, 12, 6, tie_at),
        ];
        let ifd_at = buf.len() as u32;
        buf[4..8].copy_from_slice(&ifd_at.to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, kind, count, value) in entries {
            buf.extend_from_slice(&tag.to_le_bytes());
            buf.extend_from_slice(&kind.to_le_bytes());
            buf.extend_from_slice(&count.to_le_bytes());
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf.extend_from_slice(&0u32.to_le_bytes());
        std::fs::write(path, buf).unwrap();
    }

    #[test]
    fn test_chunks_for_window() {
        let layout = ChunkLayout {
            width: 40,
            height: 24,
            chunk_width: 16,
            chunk_height: 16,
        };
        let spans = layout.chunks_for(&PixelWindow::new(10, 12, 20, 20));
        let indices: Vec<u32> = spans.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 3, 4]);
        // Bottom row of tiles is clipped to the image
        assert_eq!((spans[3].left, spans[3].top), (16, 16));
        assert_eq!((spans[3].width, spans[3].height), (16, 8));

        // Right-most tile only
        let spans = layout.chunks_for(&PixelWindow::new(35, 0, 40, 5));
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].index, spans[0].width), (2, 8));
    }

    #[test]
    fn test_strips_are_full_width_chunks() {
        let layout = ChunkLayout {
            width: 100,
            height: 50,
            chunk_width: 100,
            chunk_height: 8,
        };
        let indices: Vec<u32> = layout
            .chunks_for(&PixelWindow::new(5, 20, 50, 33))
            .iter()
            .map(|s| s.index)
            .collect();
        assert_eq!(indices, vec![2, 3, 4]);
        assert!(layout.chunks_for(&PixelWindow::new(5, 5, 5, 9)).is_empty());
    }

    #[tokio::test]
    async fn test_window_from_tiled_geotiff() {
        let dir = temp_test_dir_with_prefix("tiled_geotiff");
        let path = dir.path().join("tiled.tif");
        write_tiled_tiff(&path, 40, 24, 16);

        let handle = GeoTiffSource::new()
            .open(&format!("file://{}", path.display()))
            .await
            .unwrap();
        let meta = handle.metadata();
        assert_eq!((meta.width, meta.height, meta.band_count), (40, 24, 1));
        assert_eq!(meta.transform.origin_x, 10.0);

        // Straddles four tiles, including the clipped bottom row
        let window = PixelWindow::new(10, 12, 38, 22);
        let bands = handle.read_window(&window, &[0]).await.unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!((bands[0].width, bands[0].height), (28, 10));

        let SampleBuffer::U8(values) = &bands[0].data else {
            panic!("expected u8 samples, got {:?}", bands[0].data.sample_type());
        };
        for y in 12..22 {
            for x in 10..38 {
                let i = ((y - 12) * 28 + (x - 10)) as usize;
                assert_eq!(values[i], sample(x, y), "pixel ({}, {})", x, y);
            }
        }
    }
}
