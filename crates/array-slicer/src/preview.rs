//! Extracting a 2-D plane from a sliced array for a quick-look image.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::axes::{resolve_axes, AxisKind};
use crate::error::{Result, SliceError};
use crate::family::DatasetFamily;
use crate::store::ArrayStore;
use crate::time::from_epoch_seconds;

/// A lat/lon plane, row 0 northernmost.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewPlane {
    pub variable: String,
    pub units: Option<String>,
    /// Instant of the time step shown, when the array has a time axis.
    pub time: Option<String>,
    pub width: usize,
    pub height: usize,
    #[serde(skip)]
    pub values: Vec<f64>,
}

/// Read the middle time step of `variable` as a north-up plane.
///
/// Other non-spatial dimensions are taken at index 0.
#[instrument(skip(store), fields(store = %store.location()))]
pub async fn read_preview_plane(store: &dyn ArrayStore, variable: &str) -> Result<PreviewPlane> {
    let info = store.array_info(variable).await?;
    let axes = resolve_axes(&info.dimensions, ("time", "lat", "lon"));
    let lat = axes
        .latitude
        .ok_or_else(|| SliceError::axis_not_found(variable, AxisKind::Latitude.as_str(), &info.dimensions))?;
    let lon = axes
        .longitude
        .ok_or_else(|| SliceError::axis_not_found(variable, AxisKind::Longitude.as_str(), &info.dimensions))?;

    let mut start = vec![0u64; info.ndim()];
    let mut count = vec![1u64; info.ndim()];
    count[lat] = info.shape[lat];
    count[lon] = info.shape[lon];
    if let Some(t) = axes.time {
        start[t] = info.shape[t] / 2;
    }

    let height = info.shape[lat] as usize;
    let width = info.shape[lon] as usize;
    let mut values = store.read_subset(variable, &start, &count).await?;
    info.decode(&mut values);

    // Singleton dimensions drop out; only the lat/lon order matters
    if lon < lat {
        values = transpose(&values, width, height);
    }

    let available = store.list_arrays().await?;
    let lat_name = &info.dimensions[lat];
    if available.contains(lat_name) {
        let coords = store.read_coordinates(lat_name).await?;
        if coords.len() == height && coords.first() < coords.last() {
            flip_rows(&mut values, width);
        }
    }

    let time = match axes.time {
        Some(t) => step_instant(store, &available, &info.dimensions[t], start[t] as usize).await,
        None => None,
    };
    debug!(variable, width, height, time = ?time, "Read preview plane");

    Ok(PreviewPlane {
        variable: variable.to_string(),
        units: info.units().map(str::to_string),
        time,
        width,
        height,
        values,
    })
}

async fn step_instant(
    store: &dyn ArrayStore,
    available: &[String],
    name: &str,
    index: usize,
) -> Option<String> {
    if !available.iter().any(|a| a == name) {
        return None;
    }
    let info = store.array_info(name).await.ok()?;
    let raw = store.read_coordinates(name).await.ok()?;
    let encoding = DatasetFamily::Generic.time_encoding(info.units(), info.calendar(), &raw)?;
    let seconds = encoding.to_epoch_seconds(*raw.get(index)?)?;
    from_epoch_seconds(seconds).map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// `values` is `rows x cols`; returns `cols x rows`.
fn transpose(values: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = values[r * cols + c];
        }
    }
    out
}

fn flip_rows(values: &mut [f64], width: usize) {
    if width == 0 {
        return;
    }
    let height = values.len() / width;
    for row in 0..height / 2 {
        let (top, bottom) = values.split_at_mut((height - 1 - row) * width);
        top[row * width..(row + 1) * width].swap_with_slice(&mut bottom[..width]);
    }
}
