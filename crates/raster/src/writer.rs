//! Cropped GeoTIFF output for band stacks.
//!
//! Samples are written as 32-bit floats, pixel-interleaved, with the
//! stack's georeferencing and the first asset's GeoKeys. Band names go in
//! `ImageDescription`, one per line.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use projection::geokeys::{
    GDAL_NODATA_TAG, GEO_ASCII_PARAMS_TAG, GEO_DOUBLE_PARAMS_TAG, GEO_KEY_DIRECTORY_TAG,
    MODEL_PIXEL_SCALE_TAG, MODEL_TIEPOINT_TAG,
};
use tiff::encoder::colortype::{Gray32Float, RGB32Float};
use tiff::encoder::{Compression, DeflateLevel, DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::info;

use crate::error::{RasterError, Result};
use crate::types::BandStack;

/// Compression of GeoTIFF output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeoTiffCompression {
    #[default]
    None,
    Lzw,
    Deflate,
}

/// Encoder failures, kept apart from decode errors.
struct WriteError(String);

impl From<tiff::TiffError> for WriteError {
    fn from(e: tiff::TiffError) -> Self {
        WriteError(e.to_string())
    }
}

impl From<WriteError> for RasterError {
    fn from(e: WriteError) -> Self {
        RasterError::WriteFailed(e.0)
    }
}

/// Write `stack` to `path` as a GeoTIFF.
pub fn write_geotiff(stack: &BandStack, path: &Path, compression: GeoTiffCompression) -> Result<()> {
    if stack.bands.is_empty() || stack.width == 0 || stack.height == 0 {
        return Err(RasterError::WriteFailed("band stack is empty".to_string()));
    }
    let expected = stack.width as usize * stack.height as usize;
    if let Some(bad) = stack.bands.iter().find(|b| b.data.len() != expected) {
        return Err(RasterError::WriteFailed(format!(
            "band has {} samples, expected {}",
            bad.data.len(),
            expected
        )));
    }

    let file = File::create(path)?;
    write_to(stack, BufWriter::new(file), compression)?;

    info!(
        path = %path.display(),
        width = stack.width,
        height = stack.height,
        bands = stack.bands.len(),
        "Wrote GeoTIFF"
    );
    Ok(())
}

fn write_to<W: Write + Seek>(
    stack: &BandStack,
    writer: W,
    compression: GeoTiffCompression,
) -> std::result::Result<(), WriteError> {
    let compression = match compression {
        GeoTiffCompression::None => Compression::Uncompressed,
        GeoTiffCompression::Lzw => Compression::Lzw,
        GeoTiffCompression::Deflate => Compression::Deflate(DeflateLevel::Balanced),
    };
    let mut encoder = TiffEncoder::new(writer)?.with_compression(compression);
    let pixels = interleaved_f32(stack);

    match stack.bands.len() {
        1 => {
            let mut image = encoder.new_image::<Gray32Float>(stack.width, stack.height)?;
            write_geo_tags(stack, image.encoder())?;
            image.write_data(&pixels)?;
        }
        3 => {
            let mut image = encoder.new_image::<RGB32Float>(stack.width, stack.height)?;
            write_geo_tags(stack, image.encoder())?;
            image.write_data(&pixels)?;
        }
        n => write_multiband(stack, &mut encoder, n, &pixels)?,
    }
    Ok(())
}

fn interleaved_f32(stack: &BandStack) -> Vec<f32> {
    let bands: Vec<Vec<f32>> = stack.bands.iter().map(|b| b.data.to_f32()).collect();
    let n = stack.width as usize * stack.height as usize;
    let mut out = Vec::with_capacity(n * bands.len());
    for i in 0..n {
        out.extend(bands.iter().map(|b| b[i]));
    }
    out
}

/// Arbitrary band counts go through the directory encoder, uncompressed.
fn write_multiband<W: Write + Seek>(
    stack: &BandStack,
    encoder: &mut TiffEncoder<W>,
    bands: usize,
    pixels: &[f32],
) -> std::result::Result<(), WriteError> {
    let mut dir = encoder.image_directory()?;

    dir.write_tag(Tag::ImageWidth, stack.width)?;
    dir.write_tag(Tag::ImageLength, stack.height)?;
    dir.write_tag(Tag::BitsPerSample, vec![32u16; bands].as_slice())?;
    dir.write_tag(Tag::Compression, 1u16)?;
    // BlackIsZero
    dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
    dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
    // IEEE float
    dir.write_tag(Tag::SampleFormat, vec![3u16; bands].as_slice())?;
    // Chunky
    dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
    dir.write_tag(Tag::RowsPerStrip, stack.height)?;
    if bands > 1 {
        dir.write_tag(Tag::ExtraSamples, vec![0u16; bands - 1].as_slice())?;
    }

    write_geo_tags(stack, &mut dir)?;

    let bytes: Vec<u8> = pixels.iter().flat_map(|v| v.to_le_bytes()).collect();
    let offset = dir.write_data(bytes.as_slice())?;
    dir.write_tag(Tag::StripOffsets, offset as u32)?;
    dir.write_tag(Tag::StripByteCounts, bytes.len() as u32)?;
    dir.finish()?;
    Ok(())
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    stack: &BandStack,
    dir: &mut DirectoryEncoder<W, K>,
) -> std::result::Result<(), WriteError> {
    let t = &stack.transform;

    let scale = [t.pixel_width.abs(), t.pixel_height.abs(), 0.0];
    dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE_TAG), &scale[..])?;

    // Pixel (0, 0) to the window's top-left corner
    let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(MODEL_TIEPOINT_TAG), &tiepoint[..])?;

    let (keys, doubles, ascii) = stack.geokeys.to_directory();
    dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY_TAG), keys.as_slice())?;
    if !doubles.is_empty() {
        dir.write_tag(Tag::Unknown(GEO_DOUBLE_PARAMS_TAG), doubles.as_slice())?;
    }
    if !ascii.is_empty() {
        dir.write_tag(Tag::Unknown(GEO_ASCII_PARAMS_TAG), ascii.as_str())?;
    }

    if let Some(nodata) = stack.nodata {
        dir.write_tag(Tag::Unknown(GDAL_NODATA_TAG), nodata.to_string().as_str())?;
    }

    if !stack.names.is_empty() {
        dir.write_tag(Tag::ImageDescription, stack.names.join("\n").as_str())?;
    }
    Ok(())
}
