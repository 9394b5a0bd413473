//! Windowed band reads and RGB compositing.
//!
//! A single multi-band asset is read once and its selected bands are kept
//! in order. Several single-band assets are stacked: the first asset fixes
//! the output grid, every other asset is read over the same ground area
//! from its own grid and resampled onto the first. A size cap keeps the
//! full window and lowers the output resolution.

use eo_common::PixelWindow;
use futures::future::try_join_all;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::config::ReaderConfig;
use crate::error::{RasterError, Result};
use crate::normalize::{interleave, is_signal_less, normalize_channels};
use crate::resample::resample_nearest;
use crate::source::{RasterSource, ScopedRaster};
use crate::types::{
    AssetRef, BandArray, BandStack, ChannelSelection, Normalization, RasterMetadata,
    RgbComposite, WindowRequest,
};
use crate::window::{resolve_window, window_for_bbox, ResolvedWindow};

/// Read bands from one or more assets over a common window.
///
/// Source sample types are preserved. Any failing asset fails the whole
/// stack, with the asset named in the error.
#[instrument(skip_all, fields(assets = assets.len()))]
pub async fn read_band_stack(
    source: &dyn RasterSource,
    assets: &[AssetRef],
    request: WindowRequest,
    selection: &ChannelSelection,
    config: &ReaderConfig,
) -> Result<BandStack> {
    let (first_asset, others) = assets.split_first().ok_or_else(|| RasterError::MissingAsset {
        requested: "at least one asset".to_string(),
        available: Vec::new(),
    })?;

    let first = ScopedRaster::open(source, &first_asset.href)
        .await
        .map_err(|e| e.for_asset(&first_asset.name))?;
    let meta = first.metadata().clone();
    let resolved = first_window(&meta, request, config)
        .map_err(|e| e.for_asset(&first_asset.name))?;
    let window = resolved.window;
    let (width, height) = (resolved.output_width, resolved.output_height);

    debug!(
        asset = %first_asset.name,
        window = %window,
        width,
        height,
        "Resolved composite window"
    );

    let (bands, names) = if others.is_empty() {
        let indices = band_indices(selection, meta.band_count);
        let bands = first
            .read_window(&window, &indices)
            .await
            .map_err(|e| e.for_asset(&first_asset.name))?;
        let bands = bands
            .iter()
            .map(|band| resample_nearest(band, width, height))
            .collect();
        let names = indices
            .iter()
            .map(|i| format!("{}:{}", first_asset.name, i + 1))
            .collect();
        (bands, names)
    } else {
        let first_read = async {
            let mut bands = first
                .read_window(&window, &[0])
                .await
                .map_err(|e| e.for_asset(&first_asset.name))?;
            for band in bands.iter_mut() {
                *band = resample_nearest(band, width, height);
            }
            Ok::<_, RasterError>(bands)
        };
        let rest = try_join_all(
            others
                .iter()
                .map(|asset| read_aligned(source, asset, &meta, &resolved, config)),
        );
        let (mut bands, rest) = futures::try_join!(first_read, rest)?;
        bands.extend(rest);
        let names = assets.iter().map(|a| a.name.clone()).collect();
        (bands, names)
    };

    drop(first);

    Ok(BandStack {
        bands,
        names,
        width,
        height,
        window,
        transform: meta
            .transform
            .for_window(&window)
            .resampled((window.width(), window.height()), (width, height)),
        geokeys: meta.geokeys,
        nodata: meta.nodata,
    })
}

/// Read and normalize up to three channels into an 8-bit RGB image.
///
/// The result is flagged `signal_less` when every sampled value is zero;
/// see [`RgbComposite::require_signal`].
#[instrument(skip_all, fields(assets = assets.len(), ?normalization))]
pub async fn read_composite(
    source: &dyn RasterSource,
    assets: &[AssetRef],
    request: WindowRequest,
    selection: &ChannelSelection,
    normalization: Normalization,
    config: &ReaderConfig,
) -> Result<RgbComposite> {
    let stack = read_band_stack(source, assets, request, selection, config).await?;
    compose_rgb(stack, normalization, config)
}

/// Normalize up to three bands of an already-read stack into RGB.
///
/// One band is repeated as gray; a fourth and later bands are dropped.
pub fn compose_rgb(
    stack: BandStack,
    normalization: Normalization,
    config: &ReaderConfig,
) -> Result<RgbComposite> {
    let mut channels: Vec<Vec<f64>> = stack
        .bands
        .par_iter()
        .map(|b| b.data.to_f64())
        .collect();
    match channels.len() {
        0 => return Err(RasterError::read_failed("band stack has no bands")),
        1 => {
            let gray = channels[0].clone();
            channels.push(gray.clone());
            channels.push(gray);
        }
        2 => {
            return Err(RasterError::Unsupported(
                "two-channel composites need a third channel".to_string(),
            ))
        }
        _ => channels.truncate(3),
    }

    let signal_less = is_signal_less(&channels, config.stretch_max_samples);
    let asset_names = asset_names(&stack.names);
    if signal_less {
        warn!(assets = ?asset_names, window = %stack.window, "Composite has no signal");
    }

    let pixels = interleave(&normalize_channels(&channels, normalization, config));

    info!(
        width = stack.width,
        height = stack.height,
        signal_less,
        "Composite ready"
    );

    Ok(RgbComposite {
        width: stack.width,
        height: stack.height,
        pixels,
        signal_less,
        window: stack.window,
        transform: stack.transform,
        assets: asset_names,
    })
}

/// Asset names of a stack, with single-asset band suffixes removed.
fn asset_names(band_names: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in band_names {
        let asset = name.split(':').next().unwrap_or(name).to_string();
        if !names.contains(&asset) {
            names.push(asset);
        }
    }
    names
}

fn first_window(
    meta: &RasterMetadata,
    request: WindowRequest,
    config: &ReaderConfig,
) -> Result<ResolvedWindow> {
    match request {
        WindowRequest::Full => Ok(ResolvedWindow::native(PixelWindow::full(meta.width, meta.height))),
        WindowRequest::Window(w) => {
            let clipped = PixelWindow::new(
                w.left.min(meta.width),
                w.top.min(meta.height),
                w.right.min(meta.width),
                w.bottom.min(meta.height),
            );
            if clipped.is_degenerate() {
                return Err(RasterError::read_failed(format!(
                    "window {} does not intersect {}x{} raster",
                    w, meta.width, meta.height
                )));
            }
            Ok(ResolvedWindow::native(clipped))
        }
        WindowRequest::Bbox { bbox, max_size } => Ok(resolve_window(
            meta,
            &bbox,
            max_size.or(config.max_output_size),
            config,
        )),
    }
}

/// Band indices to read. `FirstThree` never repeats or invents bands:
/// rasters with fewer than three bands give fewer indices.
fn band_indices(selection: &ChannelSelection, band_count: usize) -> Vec<usize> {
    match selection {
        ChannelSelection::FirstThree => (0..band_count.min(3)).collect(),
        ChannelSelection::Bands(bands) => bands.clone(),
    }
}

/// Read band 0 of `asset` over the ground area of the first asset's
/// window, resampled to the output size.
async fn read_aligned(
    source: &dyn RasterSource,
    asset: &AssetRef,
    reference: &RasterMetadata,
    resolved: &ResolvedWindow,
    config: &ReaderConfig,
) -> Result<BandArray> {
    let read = async {
        let raster = ScopedRaster::open(source, &asset.href).await?;
        let meta = raster.metadata();
        let bounds = reference.transform.window_bounds(&resolved.window);
        let own_window = window_for_bbox(
            meta.width,
            meta.height,
            &meta.transform,
            None,
            &bounds,
            config.recovery_window_size,
        );
        debug!(asset = %asset.name, window = %own_window, "Aligned asset window");

        let mut bands = raster.read_window(&own_window, &[0]).await?;
        let band = bands
            .pop()
            .ok_or_else(|| RasterError::read_failed("no band returned"))?;
        Ok::<_, RasterError>(resample_nearest(
            &band,
            resolved.output_width,
            resolved.output_height,
        ))
    };
    read.await.map_err(|e| e.for_asset(&asset.name))
}
