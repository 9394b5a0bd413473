//! Resolving request bounds to per-dimension index selections.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use eo_common::{collection, BoundingBox, TimeRange};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::axes::{resolve_axes, time_candidates, AxisKind};
use crate::cache::CoordinateCache;
use crate::cancel::CancellationFlag;
use crate::config::SlicerConfig;
use crate::error::{Result, SliceError};
use crate::family::DatasetFamily;
use crate::index_range::{find_index_range, find_longitude_ranges, IndexRange, LongitudeConvention};
use crate::persist::{persist_slice, SlicedArrayResult};
use crate::store::{ArrayInfo, ArrayStore};

/// One variable to slice.
#[derive(Debug, Clone)]
pub struct ArrayRequest {
    pub collection_id: String,
    pub variable: String,
    pub bbox: Option<BoundingBox>,
    pub time: Option<TimeRange>,
}

/// Selection along one dimension of a variable.
#[derive(Debug, Clone, Serialize)]
pub struct DimensionSelection {
    pub name: String,
    pub axis: Option<AxisKind>,
    /// Length of the dimension in the store.
    pub len: usize,
    /// Selected spans, in output order. Only a longitude request crossing
    /// the store's seam yields more than one.
    pub pieces: Vec<IndexRange>,
    /// Requested bounds in the axis' native units, when restricted.
    pub requested: Option<(f64, f64)>,
    /// Coordinates of the selected indices (Unix seconds for time).
    #[serde(skip)]
    pub coordinates: Option<Vec<f64>>,
    /// Array the coordinates came from; `None` when synthesized.
    pub coordinate_source: Option<String>,
}

impl DimensionSelection {
    fn full(name: &str, len: usize, axis: Option<AxisKind>) -> Self {
        Self {
            name: name.to_string(),
            axis,
            len,
            pieces: vec![IndexRange::full(len)],
            requested: None,
            coordinates: None,
            coordinate_source: None,
        }
    }

    /// Number of selected indices.
    pub fn selected_len(&self) -> usize {
        self.pieces.iter().map(IndexRange::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_len() == 0
    }

    pub fn is_restricted(&self) -> bool {
        self.requested.is_some()
    }

    fn select(&mut self, pieces: Vec<IndexRange>, requested: (f64, f64)) {
        self.pieces = pieces;
        self.requested = Some(requested);
    }

    /// Keep the coordinates of the selected pieces.
    fn attach_coordinates(&mut self, all: &[f64], source: Option<String>) {
        let selected = self
            .pieces
            .iter()
            .flat_map(|p| all[p.start..p.end].iter().copied())
            .collect();
        self.coordinates = Some(selected);
        self.coordinate_source = source;
    }
}

/// Resolved selection of one variable, ready to persist.
#[derive(Debug, Clone, Serialize)]
pub struct AxisSelection {
    pub collection_id: String,
    pub family: DatasetFamily,
    pub variable: String,
    #[serde(skip)]
    pub info: ArrayInfo,
    pub dimensions: Vec<DimensionSelection>,
    /// The bounds this selection was resolved from, kept for provenance.
    pub requested_bbox: Option<BoundingBox>,
    pub requested_time: Option<TimeRange>,
    /// Non-fatal problems: unmatched axes, undecodable time, no overlap.
    pub warnings: Vec<String>,
}

impl AxisSelection {
    /// Output shape.
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(DimensionSelection::selected_len).collect()
    }

    /// True when some dimension selects nothing: no data in the requested
    /// window. Distinct from a resolution failure.
    pub fn is_empty(&self) -> bool {
        self.dimensions.iter().any(DimensionSelection::is_empty)
    }

    pub fn dimension(&self, axis: AxisKind) -> Option<&DimensionSelection> {
        self.dimensions.iter().find(|d| d.axis == Some(axis))
    }

    pub fn units(&self) -> Option<&str> {
        self.info.units()
    }
}

/// Resolve `request` against the variable's dimensions.
///
/// Axes are matched by name, coordinates loaded through `cache`, and the
/// bbox and time range turned into index ranges. Unmatched axes,
/// undecodable time axes and empty overlaps are recorded as warnings on
/// the returned selection rather than failing the call.
#[instrument(skip(store, cache), fields(variable = %request.variable, collection = %request.collection_id))]
pub async fn resolve_axes_and_slice(
    store: &dyn ArrayStore,
    request: &ArrayRequest,
    cache: &CoordinateCache,
) -> Result<AxisSelection> {
    let info = store.array_info(&request.variable).await?;
    let family = DatasetFamily::for_collection(&request.collection_id);
    let preferred = collection::coordinate_names(&request.collection_id);
    let axes = resolve_axes(&info.dimensions, preferred);
    let available = store.list_arrays().await?;
    let variable = request.variable.as_str();
    let mut warnings = Vec::new();

    let mut dimensions: Vec<DimensionSelection> = info
        .dimensions
        .iter()
        .zip(&info.shape)
        .enumerate()
        .map(|(i, (name, &len))| DimensionSelection::full(name, len as usize, axes.kind_of(i)))
        .collect();

    // Spatial axes
    let native = match &request.bbox {
        Some(bbox) => Some(family.native_bounds(bbox)?),
        None => None,
    };
    for kind in [AxisKind::Latitude, AxisKind::Longitude] {
        let Some(index) = axes.get(kind) else {
            if request.bbox.is_some() {
                warnings.push(SliceError::axis_not_found(variable, kind.as_str(), &info.dimensions).to_string());
            }
            continue;
        };
        let dim = &mut dimensions[index];
        let loaded = load_spatial_coordinates(store, cache, &available, &dim.name, kind, dim.len).await;
        let (coords, source) = match loaded {
            Some((coords, name)) => (coords, Some(name)),
            None => match family.fallback_spatial_axis(kind, dim.len) {
                Some(coords) => (coords, None),
                None => {
                    if request.bbox.is_some() {
                        warnings.push(format!("{}: no coordinates for {} axis '{}'", variable, kind, dim.name));
                    }
                    continue;
                }
            },
        };

        if let (Some((min_x, min_y, max_x, max_y)), Some(bbox)) = (native, &request.bbox) {
            let (lo, hi) = match kind {
                AxisKind::Latitude => (min_y, max_y),
                _ => (min_x, max_x),
            };
            let pieces = if kind == AxisKind::Longitude && !family.is_projected() {
                find_longitude_ranges(&coords, lo, hi)
            } else {
                let range = find_index_range(&coords, lo, hi);
                if range.is_empty() { Vec::new() } else { vec![range] }
            };
            if pieces.is_empty() {
                warnings.push(
                    SliceError::NoOverlap {
                        variable: variable.to_string(),
                        axis: kind.to_string(),
                        requested: format!("[{}, {}]", lo, hi),
                    }
                    .to_string(),
                );
            }
            dim.select(pieces, (lo, hi));
            dim.attach_coordinates(&coords, source);

            if kind == AxisKind::Longitude && !family.is_projected() {
                if let Some(selected) = dim.coordinates.as_mut() {
                    align_longitudes(selected, LongitudeConvention::detect(&coords), bbox);
                }
            }
        } else {
            dim.attach_coordinates(&coords, source);
        }
        debug!(axis = %kind, dimension = %dim.name, pieces = ?dim.pieces, "Resolved spatial axis");
    }

    // Time axis
    match axes.time {
        None => {
            if request.time.is_some() {
                warnings.push(SliceError::axis_not_found(variable, "time", &info.dimensions).to_string());
            }
        }
        Some(index) => {
            let dim = &mut dimensions[index];
            match decode_time_axis(store, cache, family, &available, &dim.name, preferred.0, dim.len).await {
                Some((seconds, source)) => {
                    if let Some(range) = &request.time {
                        let (start, end) = range.as_epoch_seconds();
                        let found = find_index_range(&seconds, start, end);
                        if found.is_empty() {
                            warnings.push(
                                SliceError::NoOverlap {
                                    variable: variable.to_string(),
                                    axis: "time".to_string(),
                                    requested: format!("{} to {}", range.start, range.end),
                                }
                                .to_string(),
                            );
                        }
                        dim.select(if found.is_empty() { Vec::new() } else { vec![found] }, (start, end));
                    }
                    dim.attach_coordinates(&seconds, source);
                    debug!(dimension = %dim.name, pieces = ?dim.pieces, "Resolved time axis");
                }
                None => {
                    if request.time.is_some() {
                        warnings.push(format!(
                            "{}: time axis '{}' could not be decoded; time range ignored",
                            variable, dim.name
                        ));
                    }
                }
            }
        }
    }

    for message in &warnings {
        warn!(variable, "{}", message);
    }

    Ok(AxisSelection {
        collection_id: request.collection_id.clone(),
        family,
        variable: request.variable.clone(),
        info,
        dimensions,
        requested_bbox: request.bbox,
        requested_time: request.time,
        warnings,
    })
}

/// Express selected longitudes in the request's convention and keep them
/// increasing across a seam.
fn align_longitudes(values: &mut [f64], convention: LongitudeConvention, bbox: &BoundingBox) {
    if convention == LongitudeConvention::Positive && (bbox.min_x < 0.0 || bbox.max_x < 0.0) {
        for v in values.iter_mut() {
            if *v > 180.0 {
                *v -= 360.0;
            }
        }
    }
    let mut shift = 0.0;
    for i in 1..values.len() {
        if values[i] + shift < values[i - 1] {
            shift += 360.0;
        }
        values[i] += shift;
    }
}

/// Coordinates of a spatial dimension: an array named after the dimension,
/// or any alias of the axis with the same length.
async fn load_spatial_coordinates(
    store: &dyn ArrayStore,
    cache: &CoordinateCache,
    available: &[String],
    dimension: &str,
    kind: AxisKind,
    len: usize,
) -> Option<(Vec<f64>, String)> {
    let candidates = std::iter::once(dimension).chain(kind.aliases().iter().copied());
    for name in candidates {
        if !available.iter().any(|a| a == name) {
            continue;
        }
        match cache.get_or_load(store, name).await {
            Ok(values) if values.len() == len => return Some((values.to_vec(), name.to_string())),
            Ok(_) => continue,
            Err(e) => debug!(array = name, error = %e, "Skipping coordinate candidate"),
        }
    }
    None
}

/// Decode the time axis to Unix seconds.
///
/// Candidates are tried in order and the first decodable one wins. The
/// family's fallback axis applies when none decodes.
async fn decode_time_axis(
    store: &dyn ArrayStore,
    cache: &CoordinateCache,
    family: DatasetFamily,
    available: &[String],
    dimension: &str,
    preferred: &str,
    len: usize,
) -> Option<(Vec<f64>, Option<String>)> {
    for name in time_candidates(Some(dimension), preferred) {
        if !available.contains(&name) {
            continue;
        }
        let Ok(info) = store.array_info(&name).await else {
            continue;
        };
        if info.ndim() != 1 || info.shape[0] as usize != len {
            continue;
        }
        let Ok(raw) = cache.get_or_load(store, &name).await else {
            continue;
        };
        let Some(encoding) = family.time_encoding(info.units(), info.calendar(), &raw) else {
            debug!(array = %name, "Time candidate has no usable encoding");
            continue;
        };
        let seconds = encoding.decode_axis(&raw);
        if seconds.iter().any(|v| v.is_finite()) {
            return Some((seconds, Some(name)));
        }
    }

    let fallback = family.fallback_time_axis(len)?;
    info!(%family, len, "Using cadence heuristic for time axis");
    Some((fallback, None))
}

fn is_bounds_array(name: &str) -> bool {
    name.ends_with("_bnds") || name.ends_with("_bounds")
}

/// Data variables of a store: arrays that are not coordinates.
///
/// An array is a coordinate when some array uses its name as a dimension,
/// when its name is an axis alias, or when it holds cell bounds.
pub async fn list_variables(store: &dyn ArrayStore) -> Result<Vec<String>> {
    let mut infos = Vec::new();
    for name in store.list_arrays().await? {
        infos.push(store.array_info(&name).await?);
    }
    let dimension_names: BTreeSet<&str> = infos
        .iter()
        .flat_map(|i| i.dimensions.iter().map(String::as_str))
        .collect();

    Ok(infos
        .iter()
        .filter(|i| i.ndim() > 0)
        .filter(|i| !dimension_names.contains(i.name.as_str()))
        .filter(|i| AxisKind::classify(&i.name).is_none())
        .filter(|i| !is_bounds_array(&i.name))
        .map(|i| i.name.clone())
        .collect())
}

/// Choose the variables to slice.
///
/// Requested variables must all exist. With none requested, the
/// collection's defaults present in the store are used, or every data
/// variable when none of those are present.
pub async fn select_variables(
    store: &dyn ArrayStore,
    requested: &[String],
    collection_id: &str,
) -> Result<Vec<String>> {
    let available = list_variables(store).await?;

    if !requested.is_empty() {
        if let Some(missing) = requested.iter().find(|r| !available.contains(r)) {
            return Err(SliceError::MissingVariable {
                requested: missing.clone(),
                available,
            });
        }
        return Ok(requested.to_vec());
    }

    let defaults: Vec<String> = collection::default_variables(collection_id)
        .iter()
        .filter(|d| available.iter().any(|a| a == *d))
        .map(|d| d.to_string())
        .collect();
    if !defaults.is_empty() {
        return Ok(defaults);
    }
    if available.is_empty() {
        return Err(SliceError::invalid_metadata(format!(
            "{} has no data variables",
            store.location()
        )));
    }
    Ok(available)
}

/// A multi-variable slice request.
#[derive(Debug, Clone)]
pub struct SliceRequest {
    pub collection_id: String,
    /// Variables to slice; empty selects the collection defaults.
    pub variables: Vec<String>,
    pub bbox: Option<BoundingBox>,
    pub time: Option<TimeRange>,
}

/// What a multi-variable slice produced.
#[derive(Debug, Clone, Serialize)]
pub struct MultiSliceOutcome {
    pub output: PathBuf,
    pub results: Vec<SlicedArrayResult>,
    pub warnings: Vec<String>,
}

/// Slice each selected variable and persist it into the store at `output`.
///
/// Variables are isolated: a failure or empty overlap on one is recorded
/// as a warning and the others continue. The call fails only when no
/// variable succeeds, or on cancellation.
#[instrument(skip_all, fields(collection = %request.collection_id, store = %store.location()))]
pub async fn slice_variables(
    store: &dyn ArrayStore,
    request: &SliceRequest,
    output: &Path,
    config: &SlicerConfig,
    cache: &CoordinateCache,
    cancel: &CancellationFlag,
) -> Result<MultiSliceOutcome> {
    let variables = select_variables(store, &request.variables, &request.collection_id).await?;
    info!(variables = ?variables, "Slicing variables");

    let mut results = Vec::new();
    let mut warnings = Vec::new();

    for variable in &variables {
        cancel.check(variable)?;
        let array_request = ArrayRequest {
            collection_id: request.collection_id.clone(),
            variable: variable.clone(),
            bbox: request.bbox,
            time: request.time,
        };

        let selection = match resolve_axes_and_slice(store, &array_request, cache).await {
            Ok(selection) => selection,
            Err(e) => {
                warn!(variable = %variable, error = %e, "Skipping variable");
                warnings.push(format!("{}: {}", variable, e));
                continue;
            }
        };
        warnings.extend(selection.warnings.iter().cloned());
        if selection.is_empty() {
            continue;
        }

        match persist_slice(store, &selection, output, config, cancel).await {
            Ok(result) => results.push(result),
            Err(e @ SliceError::Cancelled(_)) => return Err(e),
            Err(e) => {
                warn!(variable = %variable, error = %e, "Failed to persist variable");
                warnings.push(format!("{}: {}", variable, e));
            }
        }
    }

    if results.is_empty() {
        return Err(SliceError::NothingSliced { warnings });
    }

    info!(
        written = results.len(),
        warnings = warnings.len(),
        output = %output.display(),
        "Slice complete"
    );
    Ok(MultiSliceOutcome {
        output: output.to_path_buf(),
        results,
        warnings,
    })
}
