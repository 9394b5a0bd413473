//! Applying a visualization strategy to an item.

use std::path::{Path, PathBuf};

use eo_common::{BoundingBox, PixelWindow};
use raster::normalize::is_signal_less;
use raster::{
    compose_rgb, read_band_stack, AssetRef, BandStack, ChannelSelection, Normalization,
    RasterError, RasterSource, ReaderConfig, WindowRequest,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::classification::{colorize_classes, ClassCount};
use crate::elevation::{colorize_elevation, ElevationStats};
use crate::error::{RenderError, Result};
use crate::palette::ClassificationPalette;
use crate::png::{write_png, RgbaImage};
use crate::sar::dual_pol_false_color;
use crate::strategy::{ItemAssets, VisualizationStrategy};

/// What a render produced.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary {
    pub strategy: &'static str,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
    pub assets: Vec<String>,
    /// Window read from the first asset.
    pub window: PixelWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<ElevationStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassCount>>,
}

struct Rendered {
    image: RgbaImage,
    window: PixelWindow,
    elevation: Option<ElevationStats>,
    classes: Option<Vec<ClassCount>>,
}

impl Rendered {
    fn image(image: RgbaImage, window: PixelWindow) -> Self {
        Self {
            image,
            window,
            elevation: None,
            classes: None,
        }
    }
}

/// Render `item` with `strategy` and write a PNG to `output`.
///
/// With a `bbox` only the covering window is read; `max_size` caps the
/// image's larger side. Composites without signal fail with a retryable
/// error instead of writing a blank image.
#[instrument(skip_all, fields(strategy = strategy.name(), item = %item.item_id))]
pub async fn render(
    strategy: &VisualizationStrategy,
    item: &ItemAssets,
    source: &dyn RasterSource,
    output: &Path,
    max_size: Option<u32>,
    bbox: Option<&BoundingBox>,
    config: &ReaderConfig,
) -> Result<RenderSummary> {
    let request = match bbox {
        Some(bbox) => WindowRequest::Bbox {
            bbox: *bbox,
            max_size,
        },
        None => WindowRequest::Full,
    };
    let assets = strategy
        .assets()
        .into_iter()
        .map(|name| item.asset_ref(name))
        .collect::<Result<Vec<AssetRef>>>()?;

    let rendered = match strategy {
        VisualizationStrategy::DirectAsset { .. } => {
            render_composite(source, &assets, request, ChannelSelection::FirstThree, None, config).await?
        }
        VisualizationStrategy::SingleAssetChannels { bands, .. } => {
            let selection = ChannelSelection::Bands(bands.to_vec());
            render_composite(source, &assets, request, selection, None, config).await?
        }
        VisualizationStrategy::PerBandAssets { .. } => {
            let stretch = Some(Normalization::PercentileStretch);
            render_composite(source, &assets, request, ChannelSelection::FirstThree, stretch, config)
                .await?
        }
        VisualizationStrategy::ElevationColormap { asset } => {
            let stack = read_first_band(source, &assets, request, config).await?;
            let nodata = item.get(asset).and_then(|a| a.nodata).or(stack.nodata);
            let (image, stats) =
                colorize_elevation(&stack.bands[0].data.to_f64(), stack.width, stack.height, nodata);
            info!(min = stats.min, max = stats.max, valid = stats.valid_pixels, "Elevation range");
            Rendered {
                elevation: Some(stats),
                ..Rendered::image(image, stack.window)
            }
        }
        VisualizationStrategy::ClassificationColormap { palette, .. } => {
            let stack = read_first_band(source, &assets, request, config).await?;
            let palette = with_raster_nodata(palette, stack.nodata);
            let (image, classes) =
                colorize_classes(&stack.bands[0].data.to_f64(), stack.width, stack.height, &palette);
            info!(classes = classes.len(), "Classes observed");
            Rendered {
                classes: Some(classes),
                ..Rendered::image(image, stack.window)
            }
        }
        VisualizationStrategy::DualPolarizationFalseColor { .. } => {
            let stack = read_band_stack(source, &assets, request, &ChannelSelection::FirstThree, config)
                .await?;
            let channels: Vec<Vec<f64>> = stack.bands.iter().map(|b| b.data.to_f64()).collect();
            require_signal(&stack, &channels, config)?;
            let image = dual_pol_false_color(&channels[0], &channels[1], stack.width, stack.height, config);
            Rendered::image(image, stack.window)
        }
    };

    let image = match max_size {
        Some(max) => rendered.image.fit_within(max),
        None => rendered.image,
    };
    let (width, height) = (image.width, image.height);
    let bytes = write_image(image, output).await?;

    info!(path = %output.display(), width, height, bytes, "Wrote preview");

    Ok(RenderSummary {
        strategy: strategy.name(),
        output: output.to_path_buf(),
        width,
        height,
        bytes,
        assets: assets.into_iter().map(|a| a.name).collect(),
        window: rendered.window,
        elevation: rendered.elevation,
        classes: rendered.classes,
    })
}

async fn render_composite(
    source: &dyn RasterSource,
    assets: &[AssetRef],
    request: WindowRequest,
    selection: ChannelSelection,
    normalization: Option<Normalization>,
    config: &ReaderConfig,
) -> Result<Rendered> {
    let stack = read_band_stack(source, assets, request, &selection, config).await?;
    let normalization = normalization.unwrap_or_else(|| {
        stack
            .bands
            .first()
            .map(|b| Normalization::for_sample_type(b.data.sample_type()))
            .unwrap_or(Normalization::PercentileStretch)
    });
    let composite = compose_rgb(stack, normalization, config)?.require_signal()?;
    Ok(Rendered::image(
        RgbaImage::from_rgb(composite.width, composite.height, &composite.pixels),
        composite.window,
    ))
}

async fn read_first_band(
    source: &dyn RasterSource,
    assets: &[AssetRef],
    request: WindowRequest,
    config: &ReaderConfig,
) -> Result<BandStack> {
    let stack = read_band_stack(source, assets, request, &ChannelSelection::Bands(vec![0]), config).await?;
    if stack.bands.is_empty() {
        return Err(RenderError::invalid_input("raster returned no bands"));
    }
    Ok(stack)
}

/// The raster's own no-data value applies when the palette has none.
fn with_raster_nodata(palette: &ClassificationPalette, nodata: Option<f64>) -> ClassificationPalette {
    let mut palette = palette.clone();
    if palette.nodata.is_none() {
        palette.nodata = nodata.map(|v| v as i64);
    }
    palette
}

fn require_signal(stack: &BandStack, channels: &[Vec<f64>], config: &ReaderConfig) -> Result<()> {
    if channels.len() < 2 {
        return Err(RenderError::invalid_input("dual-polarization render needs two bands"));
    }
    if is_signal_less(channels, config.stretch_max_samples) {
        warn!(assets = ?stack.names, window = %stack.window, "Radar window has no signal");
        return Err(RasterError::SignalLess {
            assets: stack.names.clone(),
            window: stack.window.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Encode and write off the async runtime.
async fn write_image(image: RgbaImage, output: &Path) -> Result<u64> {
    let path = output.to_path_buf();
    tokio::task::spawn_blocking(move || write_png(&image, &path))
        .await
        .map_err(|e| RenderError::Encode(format!("encoder task failed: {}", e)))?
}
