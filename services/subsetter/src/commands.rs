//! Subcommand implementations. Each prints a JSON report on stdout.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use array_slicer::{
    open_store, read_preview_plane, slice_variables, CancellationFlag, CoordinateCache,
    SliceError, SliceRequest,
};
use eo_common::{collection, AoiPolicy, BoundingBox, SizeEstimate, TimeRange};
use raster::{
    read_band_stack, resolve_window, write_geotiff, AssetRef, ChannelSelection, GeoTiffCompression,
    GeoTiffSource, ScopedRaster, WindowRequest,
};
use renderer::{render, render_array_preview, require_strategy, ArrayPlane, AssetInfo, ItemAssets};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::SubsetterConfig;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse `name=path` asset arguments.
pub fn parse_asset(s: &str) -> Result<AssetRef, String> {
    match s.split_once('=') {
        Some((name, href)) if !name.is_empty() && !href.is_empty() => Ok(AssetRef::new(name, href)),
        _ => Err(format!("expected NAME=PATH, got '{}'", s)),
    }
}

pub fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    BoundingBox::parse(s).map_err(|e| e.to_string())
}

pub fn parse_time(s: &str) -> Result<TimeRange, String> {
    TimeRange::parse(s).map_err(|e| e.to_string())
}

/// Pixel window a bbox maps to on one raster.
pub async fn window(
    raster_path: &str,
    bbox: &BoundingBox,
    max_size: Option<u32>,
    config: &SubsetterConfig,
) -> Result<()> {
    let source = GeoTiffSource::new();
    let raster = ScopedRaster::open(&source, raster_path)
        .await
        .with_context(|| format!("opening {}", raster_path))?;
    let meta = raster.metadata();
    let resolved = resolve_window(meta, bbox, max_size.or(config.reader.max_output_size), &config.reader);

    print_json(&json!({
        "raster": raster_path,
        "width": meta.width,
        "height": meta.height,
        "projection": meta.projection().map(|p| p.to_proj_string()),
        "window": resolved.window,
        "window_width": resolved.window.width(),
        "window_height": resolved.window.height(),
        "output_width": resolved.output_width,
        "output_height": resolved.output_height,
    }))
}

/// Crop one or more assets to a GeoTIFF.
pub async fn crop(
    assets: &[AssetRef],
    bbox: Option<BoundingBox>,
    bands: Option<Vec<usize>>,
    output: &Path,
    compression: GeoTiffCompression,
    config: &SubsetterConfig,
) -> Result<()> {
    if assets.is_empty() {
        bail!("at least one --asset is required");
    }
    let request = match bbox {
        Some(bbox) => WindowRequest::Bbox {
            bbox,
            max_size: config.reader.max_output_size,
        },
        None => WindowRequest::Full,
    };
    let selection = match bands {
        Some(bands) => ChannelSelection::Bands(bands),
        None => ChannelSelection::FirstThree,
    };

    let source = GeoTiffSource::new();
    let stack = read_band_stack(&source, assets, request, &selection, &config.reader)
        .await
        .context("reading band stack")?;
    write_geotiff(&stack, output, compression)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(output = %output.display(), bands = stack.bands.len(), "Wrote GeoTIFF");
    print_json(&json!({
        "output": output,
        "width": stack.width,
        "height": stack.height,
        "bands": stack.names,
        "window": stack.window,
    }))
}

/// Render an item preview with the strategy its collection calls for.
pub async fn render_item(
    collection_id: &str,
    assets: &[AssetRef],
    bbox: Option<BoundingBox>,
    output: &Path,
    config: &SubsetterConfig,
) -> Result<()> {
    let item = ItemAssets::new(
        output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("item"),
        assets
            .iter()
            .map(|a| AssetInfo::new(a.name.clone(), a.href.clone()))
            .collect(),
    );
    let strategy = require_strategy(collection_id, &item)?;
    info!(strategy = strategy.name(), "Selected visualization strategy");

    let source = GeoTiffSource::new();
    let summary = render(
        &strategy,
        &item,
        &source,
        output,
        config.reader.max_output_size,
        bbox.as_ref(),
        &config.reader,
    )
    .await
    .map_err(|e| {
        if e.is_retryable() {
            anyhow!("{} (retry with another item or time)", e)
        } else {
            anyhow!(e)
        }
    })?;
    print_json(&summary)
}

/// Arguments of the `slice` subcommand.
pub struct SliceArgs {
    pub collection_id: String,
    pub store: String,
    pub variables: Vec<String>,
    pub bbox: Option<BoundingBox>,
    pub time: Option<TimeRange>,
    pub output: PathBuf,
    pub preview: Option<PathBuf>,
}

/// Slice an array store into a local Zarr store, optionally rendering a
/// preview of the first sliced variable.
pub async fn slice(args: SliceArgs, config: &SubsetterConfig) -> Result<()> {
    let store = open_store(&args.store).with_context(|| format!("opening {}", args.store))?;
    let cache = CoordinateCache::from_config(&config.slicer);

    // Ctrl-C stops the slice at the next block boundary
    let cancel = CancellationFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling slice");
            on_signal.cancel();
        }
    });

    let request = SliceRequest {
        collection_id: args.collection_id,
        variables: args.variables,
        bbox: args.bbox,
        time: args.time,
    };
    let outcome = match slice_variables(
        store.as_ref(),
        &request,
        &args.output,
        &config.slicer,
        &cache,
        &cancel,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e @ SliceError::NothingSliced { .. }) => {
            bail!("{} (retry with a different area or time)", e)
        }
        Err(e) => return Err(e.into()),
    };

    let preview = match (&args.preview, outcome.results.first()) {
        (Some(path), Some(first)) => {
            let written = open_store(&args.output.to_string_lossy())?;
            let plane = read_preview_plane(written.as_ref(), &first.variable).await?;
            let array_plane = ArrayPlane {
                variable: plane.variable,
                units: plane.units,
                width: u32::try_from(plane.width)?,
                height: u32::try_from(plane.height)?,
                values: plane.values,
            };
            Some(render_array_preview(&array_plane, path, config.reader.max_output_size)?)
        }
        _ => None,
    };

    print_json(&json!({
        "outcome": outcome,
        "preview": preview,
    }))
}

/// Area, resolution scale and size estimate of a request.
pub fn aoi(collection_id: &str, bbox: &BoundingBox, resolution_deg: Option<f64>) -> Result<()> {
    let assessment = AoiPolicy::default().assess(bbox)?;
    let native = collection::lookup(collection_id).map(|c| c.native_resolution_deg);
    let resolution = resolution_deg
        .or_else(|| native.map(|r| r * assessment.resolution_scale as f64))
        .unwrap_or(0.0001);
    let estimate = SizeEstimate::for_request(collection_id, bbox, resolution);

    print_json(&json!({
        "collection": collection_id,
        "data_kind": collection::data_kind(collection_id),
        "assessment": assessment,
        "estimate": estimate,
        "size": estimate.size_str(),
    }))
}
