//! Writing a resolved selection to a local Zarr store.
//!
//! The variable is read in blocks of `rows_per_step` along its leading
//! dimension, decoded (fill values to NaN, scale and offset applied) and
//! written as float64. Each recognized axis gets a 1-D coordinate array
//! so the output opens as a self-describing dataset.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

use crate::axes::AxisKind;
use crate::cancel::CancellationFlag;
use crate::config::{SliceCompression, SlicerConfig};
use crate::error::{Result, SliceError};
use crate::index_range::IndexRange;
use crate::slice::{AxisSelection, DimensionSelection};
use crate::store::ArrayStore;
use crate::time::from_epoch_seconds;

/// Attributes describing the source encoding; they do not apply to the
/// decoded output.
const ENCODING_ATTRIBUTES: &[&str] = &[
    "_FillValue",
    "missing_value",
    "scale_factor",
    "add_offset",
    "_ARRAY_DIMENSIONS",
    "dtype",
];

/// Units written on the output time coordinate.
pub const OUTPUT_TIME_UNITS: &str = "seconds since 1970-01-01 00:00:00";

/// Length and name of one output dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSize {
    pub name: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSummary {
    pub start: Option<String>,
    pub end: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    fn of(values: &[f64]) -> Option<Self> {
        let mut finite = values.iter().copied().filter(|v| v.is_finite());
        let first = finite.next()?;
        Some(finite.fold(Self { min: first, max: first }, |r, v| Self {
            min: r.min.min(v),
            max: r.max.max(v),
        }))
    }
}

/// Human-oriented description of a sliced array.
#[derive(Debug, Clone, Serialize)]
pub struct ArraySummary {
    pub variable: String,
    pub units: Option<String>,
    pub dims: Vec<DimensionSize>,
    pub time: Option<TimeSummary>,
    pub lat_range: Option<ValueRange>,
    pub lon_range: Option<ValueRange>,
}

impl ArraySummary {
    pub fn from_selection(selection: &AxisSelection) -> Self {
        let coordinates = |kind| {
            selection
                .dimension(kind)
                .and_then(|d| d.coordinates.as_deref())
        };

        let time = selection.dimension(AxisKind::Time).map(|dim| {
            let values = dim.coordinates.as_deref().unwrap_or_default();
            let mut finite = values.iter().copied().filter(|v| v.is_finite());
            let first = finite.next();
            let last = finite.last().or(first);
            TimeSummary {
                start: first.and_then(iso_instant),
                end: last.and_then(iso_instant),
                count: dim.selected_len(),
            }
        });

        Self {
            variable: selection.variable.clone(),
            units: selection.units().map(str::to_string),
            dims: selection
                .dimensions
                .iter()
                .map(|d| DimensionSize {
                    name: d.name.clone(),
                    size: d.selected_len(),
                })
                .collect(),
            time,
            lat_range: coordinates(AxisKind::Latitude).and_then(ValueRange::of),
            lon_range: coordinates(AxisKind::Longitude).and_then(ValueRange::of),
        }
    }
}

fn iso_instant(seconds: f64) -> Option<String> {
    from_epoch_seconds(seconds).map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// One variable written to the output store.
#[derive(Debug, Clone, Serialize)]
pub struct SlicedArrayResult {
    pub variable: String,
    pub output: PathBuf,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    /// Range of the finite decoded values; `None` when all are missing.
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub valid_values: usize,
    /// Uncompressed size of the written values.
    pub bytes_written: u64,
    pub summary: ArraySummary,
}

/// Running statistics over decoded blocks.
#[derive(Default)]
struct BlockStats {
    range: Option<ValueRange>,
    valid: usize,
}

impl BlockStats {
    fn update(&mut self, block: &[f64]) {
        self.valid += block.iter().filter(|v| v.is_finite()).count();
        if let Some(r) = ValueRange::of(block) {
            self.range = Some(match self.range {
                Some(prev) => ValueRange {
                    min: prev.min.min(r.min),
                    max: prev.max.max(r.max),
                },
                None => r,
            });
        }
    }
}

/// Persist `selection` as an array (plus coordinates) of the Zarr store at
/// `output`, creating the store if needed.
///
/// `cancel` is checked before every block read. A cancelled slice leaves
/// a partially written array behind and returns [`SliceError::Cancelled`].
#[instrument(skip_all, fields(variable = %selection.variable, output = %output.display()))]
pub async fn persist_slice(
    store: &dyn ArrayStore,
    selection: &AxisSelection,
    output: &Path,
    config: &SlicerConfig,
    cancel: &CancellationFlag,
) -> Result<SlicedArrayResult> {
    let variable = selection.variable.as_str();
    if selection.dimensions.is_empty() {
        return Err(SliceError::invalid_metadata(format!(
            "variable '{}' is a scalar and has no axes to slice",
            variable
        )));
    }
    if let Some(dim) = selection.dimensions.iter().find(|d| d.is_empty()) {
        return Err(SliceError::NoOverlap {
            variable: variable.to_string(),
            axis: dim.name.clone(),
            requested: dim
                .requested
                .map(|(lo, hi)| format!("[{}, {}]", lo, hi))
                .unwrap_or_default(),
        });
    }

    let zarr = open_output(output)?;
    let shape = selection.shape();
    let dims: Vec<String> = selection.dimensions.iter().map(|d| d.name.clone()).collect();

    for dim in &selection.dimensions {
        if let Some(coords) = &dim.coordinates {
            write_coordinate(&zarr, output, dim, coords, selection.family.is_projected(), config)?;
        }
    }

    let array = build_array(
        &zarr,
        output,
        variable,
        &shape,
        variable_attributes(store, selection, &dims),
        config,
    )?;

    // Spans of every dimension with their offsets in the output
    let placed: Vec<Vec<(IndexRange, usize)>> = selection
        .dimensions
        .iter()
        .map(|d| {
            let mut offset = 0;
            d.pieces
                .iter()
                .map(|p| {
                    let placed = (*p, offset);
                    offset += p.len();
                    placed
                })
                .collect()
        })
        .collect();
    let combinations = piece_combinations(&placed[1..]);
    let inner: usize = shape[1..].iter().product();
    let step = config.rows_per_step.max(1);

    let mut stats = BlockStats::default();
    let mut out_row = 0usize;
    for (lead, _) in &placed[0] {
        let mut row = lead.start;
        while row < lead.end {
            cancel.check(variable)?;
            let rows = step.min(lead.end - row);
            let mut block_shape = shape.clone();
            block_shape[0] = rows;
            let mut block = vec![f64::NAN; rows * inner];

            for combination in &combinations {
                let mut start = vec![row as u64];
                let mut count = vec![rows];
                let mut offset = vec![0];
                for (range, at) in combination {
                    start.push(range.start as u64);
                    count.push(range.len());
                    offset.push(*at);
                }
                let count_u64: Vec<u64> = count.iter().map(|&c| c as u64).collect();
                let values = store.read_subset(variable, &start, &count_u64).await?;
                place_block(&mut block, &block_shape, &values, &count, &offset);
            }

            selection.info.decode(&mut block);
            stats.update(&block);

            let mut out_start = vec![0u64; shape.len()];
            out_start[0] = out_row as u64;
            let subset = ArraySubset::new_with_start_shape(
                out_start,
                block_shape.iter().map(|&s| s as u64).collect(),
            )
            .map_err(|e| SliceError::write_failed(e.to_string()))?;
            array
                .store_array_subset_elements(&subset, &block)
                .map_err(|e| SliceError::write_failed(e.to_string()))?;

            debug!(row, rows, "Wrote block");
            row += rows;
            out_row += rows;
        }
    }

    let total: usize = shape.iter().product();
    let result = SlicedArrayResult {
        variable: variable.to_string(),
        output: output.to_path_buf(),
        dims,
        shape: shape.clone(),
        min: stats.range.map(|r| r.min),
        max: stats.range.map(|r| r.max),
        valid_values: stats.valid,
        bytes_written: (total * std::mem::size_of::<f64>()) as u64,
        summary: ArraySummary::from_selection(selection),
    };

    info!(
        shape = ?result.shape,
        valid = result.valid_values,
        bytes = result.bytes_written,
        "Persisted slice"
    );
    Ok(result)
}

/// Open (or create) the output hierarchy and write its root group.
fn open_output(output: &Path) -> Result<Arc<FilesystemStore>> {
    std::fs::create_dir_all(output)?;
    let store = Arc::new(
        FilesystemStore::new(output)
            .map_err(|e| SliceError::open_failed(output.display().to_string(), e.to_string()))?,
    );
    let group = GroupBuilder::new()
        .build(store.clone(), "/")
        .map_err(|e| SliceError::write_failed(e.to_string()))?;
    group
        .store_metadata()
        .map_err(|e| SliceError::write_failed(e.to_string()))?;
    Ok(store)
}

fn variable_attributes(
    store: &dyn ArrayStore,
    selection: &AxisSelection,
    dims: &[String],
) -> Map<String, Value> {
    let mut attrs: Map<String, Value> = selection
        .info
        .attributes
        .iter()
        .filter(|(k, _)| !ENCODING_ATTRIBUTES.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    attrs.insert("_ARRAY_DIMENSIONS".to_string(), json!(dims));
    attrs.insert("source".to_string(), json!(store.location()));
    attrs.insert("collection_id".to_string(), json!(selection.collection_id));
    attrs.insert("dataset_family".to_string(), json!(selection.family.as_str()));
    if let Some(bbox) = &selection.requested_bbox {
        attrs.insert(
            "requested_bbox".to_string(),
            json!([bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]),
        );
    }
    if let Some(time) = &selection.requested_time {
        attrs.insert("requested_time".to_string(), json!(time.to_attribute_string()));
    }
    attrs
}

fn write_coordinate(
    zarr: &Arc<FilesystemStore>,
    output: &Path,
    dim: &DimensionSelection,
    coords: &[f64],
    projected: bool,
    config: &SlicerConfig,
) -> Result<()> {
    let mut attrs = Map::new();
    attrs.insert("_ARRAY_DIMENSIONS".to_string(), json!([dim.name]));
    match dim.axis {
        Some(AxisKind::Time) => {
            attrs.insert("units".to_string(), json!(OUTPUT_TIME_UNITS));
            attrs.insert("calendar".to_string(), json!("standard"));
            attrs.insert("standard_name".to_string(), json!("time"));
        }
        Some(AxisKind::Latitude) => {
            let units = if projected { "m" } else { "degrees_north" };
            attrs.insert("units".to_string(), json!(units));
        }
        Some(AxisKind::Longitude) => {
            let units = if projected { "m" } else { "degrees_east" };
            attrs.insert("units".to_string(), json!(units));
        }
        None => {}
    }

    let array = build_array(zarr, output, &dim.name, &[coords.len()], attrs, config)?;
    let subset = ArraySubset::new_with_start_shape(vec![0], vec![coords.len() as u64])
        .map_err(|e| SliceError::write_failed(e.to_string()))?;
    array
        .store_array_subset_elements(&subset, coords)
        .map_err(|e| SliceError::write_failed(e.to_string()))
}

/// Create a float64 array at `/{name}`, replacing any previous one.
fn build_array(
    zarr: &Arc<FilesystemStore>,
    output: &Path,
    name: &str,
    shape: &[usize],
    attrs: Map<String, Value>,
    config: &SlicerConfig,
) -> Result<Array<FilesystemStore>> {
    // Stale chunks of a differently shaped array would otherwise survive
    let existing = output.join(name);
    if existing.is_dir() {
        std::fs::remove_dir_all(&existing)?;
    }

    let chunk = config.output_chunk_size.max(1);
    let chunk_grid: zarrs::array::ChunkGrid = shape
        .iter()
        .map(|&len| len.clamp(1, chunk) as u64)
        .collect::<Vec<u64>>()
        .try_into()
        .map_err(|e| SliceError::write_failed(format!("invalid chunk shape: {:?}", e)))?;

    let mut binding = ArrayBuilder::new(
        shape.iter().map(|&s| s as u64).collect::<Vec<u64>>(),
        DataType::Float64,
        chunk_grid,
        FillValue::from(f64::NAN),
    );
    let mut builder = binding.attributes(attrs);

    if config.compression != SliceCompression::None {
        builder = builder.bytes_to_bytes_codecs(vec![compression_codec(config)?]);
    }

    let array = builder
        .build(zarr.clone(), &format!("/{}", name))
        .map_err(|e| SliceError::write_failed(e.to_string()))?;
    array
        .store_metadata()
        .map_err(|e| SliceError::write_failed(e.to_string()))?;
    Ok(array)
}

fn compression_codec(
    config: &SlicerConfig,
) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
    let level = BloscCompressionLevel::try_from(config.compression_level)
        .map_err(|_| SliceError::write_failed("invalid compression level"))?;
    let compressor = match config.compression {
        SliceCompression::None => {
            return Err(SliceError::write_failed("no compression configured"));
        }
        SliceCompression::BloscLz4 => BloscCompressor::LZ4,
        SliceCompression::BloscZstd => BloscCompressor::Zstd,
    };

    // Byte shuffle over 8-byte floats
    let codec = BloscCodec::new(
        compressor,
        level,
        None,
        BloscShuffleMode::Shuffle,
        Some(std::mem::size_of::<f64>()),
    )
    .map_err(|e| SliceError::write_failed(e.to_string()))?;
    Ok(Arc::new(codec))
}

/// Every way of picking one span per dimension.
fn piece_combinations(dims: &[Vec<(IndexRange, usize)>]) -> Vec<Vec<(IndexRange, usize)>> {
    dims.iter().fold(vec![Vec::new()], |acc, pieces| {
        acc.iter()
            .flat_map(|prefix| {
                pieces.iter().map(move |piece| {
                    let mut combination = prefix.clone();
                    combination.push(*piece);
                    combination
                })
            })
            .collect()
    })
}

/// Copy a row-major `src` block into `dst` at `offset`.
fn place_block(dst: &mut [f64], dst_shape: &[usize], src: &[f64], src_shape: &[usize], offset: &[usize]) {
    let ndim = dst_shape.len();
    let mut strides = vec![1usize; ndim];
    for axis in (0..ndim.saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * dst_shape[axis + 1];
    }

    let mut index = vec![0usize; ndim];
    for &value in src {
        let at: usize = (0..ndim).map(|a| (index[a] + offset[a]) * strides[a]).sum();
        dst[at] = value;

        for axis in (0..ndim).rev() {
            index[axis] += 1;
            if index[axis] < src_shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_block_at_offset() {
        let mut dst = vec![0.0; 6];
        place_block(&mut dst, &[2, 3], &[1.0, 2.0], &[2, 1], &[0, 2]);
        assert_eq!(dst, vec![0.0, 0.0, 1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_piece_combinations() {
        let lat = vec![(IndexRange::new(0, 2), 0)];
        let lon = vec![(IndexRange::new(8, 10), 0), (IndexRange::new(0, 1), 2)];
        let combinations = piece_combinations(&[lat, lon]);
        assert_eq!(combinations.len(), 2);
        assert_eq!(combinations[1][1], (IndexRange::new(0, 1), 2));
        assert_eq!(piece_combinations(&[]), vec![Vec::new()]);
    }

    #[test]
    fn test_value_range_skips_missing() {
        assert_eq!(ValueRange::of(&[f64::NAN, 3.0, -1.0]), Some(ValueRange { min: -1.0, max: 3.0 }));
        assert_eq!(ValueRange::of(&[f64::NAN]), None);
    }

    #[tokio::test]
    async fn test_scalar_variable_is_rejected() {
        use crate::cache::CoordinateCache;
        use crate::slice::{resolve_axes_and_slice, ArrayRequest};
        use crate::store::{MemoryArray, MemoryArrayStore};

        let store = MemoryArrayStore::new("mem://scalar")
            .with_array("crs", MemoryArray::new(&[], &[], vec![0.0]).unwrap());
        let selection = resolve_axes_and_slice(
            &store,
            &ArrayRequest {
                collection_id: "gridmet".to_string(),
                variable: "crs".to_string(),
                bbox: None,
                time: None,
            },
            &CoordinateCache::default(),
        )
        .await
        .unwrap();
        assert!(selection.dimensions.is_empty());

        let dir = tempfile::tempdir().unwrap();
        let err = persist_slice(
            &store,
            &selection,
            &dir.path().join("out.zarr"),
            &SlicerConfig::default(),
            &CancellationFlag::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SliceError::InvalidMetadata(_)), "{:?}", err);
        assert!(!dir.path().join("out.zarr").exists());
    }

    #[test]
    fn test_block_stats() {
        let mut stats = BlockStats::default();
        stats.update(&[1.0, f64::NAN]);
        stats.update(&[-2.0, 5.0]);
        assert_eq!(stats.valid, 3);
        assert_eq!(stats.range, Some(ValueRange { min: -2.0, max: 5.0 }));
    }
}
