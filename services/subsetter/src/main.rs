//! Earth-observation subsetter.
//!
//! Crops and renders local raster assets and slices local array stores
//! by bounding box and time range.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use eo_common::{BoundingBox, TimeRange};
use raster::{AssetRef, GeoTiffCompression};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use commands::{parse_asset, parse_bbox, parse_time, SliceArgs};
use config::{ConfigOverrides, SubsetterConfig};

#[derive(Parser, Debug)]
#[command(name = "subsetter")]
#[command(about = "Subset earth-observation rasters and array stores")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Log as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the pixel window a bbox covers on a raster
    Window {
        /// GeoTIFF path or file:// URL
        #[arg(long)]
        raster: String,

        /// west,south,east,north in degrees
        #[arg(long, value_parser = parse_bbox)]
        bbox: BoundingBox,

        /// Cap on the window's larger side
        #[arg(long)]
        max_size: Option<u32>,
    },

    /// Crop assets to a GeoTIFF
    Crop {
        /// Asset as NAME=PATH; repeat to stack single-band assets
        #[arg(long = "asset", value_parser = parse_asset, required = true)]
        assets: Vec<AssetRef>,

        #[arg(long, value_parser = parse_bbox)]
        bbox: Option<BoundingBox>,

        /// Zero-based bands of a single multi-band asset
        #[arg(long, value_delimiter = ',')]
        bands: Option<Vec<usize>>,

        #[arg(long, value_enum, default_value_t = TiffCompression::Deflate)]
        compression: TiffCompression,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Render a preview PNG of an item
    Render {
        #[arg(long)]
        collection: String,

        /// Asset as NAME=PATH
        #[arg(long = "asset", value_parser = parse_asset, required = true)]
        assets: Vec<AssetRef>,

        #[arg(long, value_parser = parse_bbox)]
        bbox: Option<BoundingBox>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Slice variables of an array store into a local Zarr store
    Slice {
        #[arg(long)]
        collection: String,

        /// Store path or URL
        #[arg(long)]
        store: String,

        /// Variable to slice; repeat for several. Defaults to the
        /// collection's default variables.
        #[arg(long = "variable")]
        variables: Vec<String>,

        #[arg(long, value_parser = parse_bbox)]
        bbox: Option<BoundingBox>,

        /// start/end or a single date, ISO 8601
        #[arg(long, value_parser = parse_time)]
        datetime: Option<TimeRange>,

        #[arg(short, long)]
        output: PathBuf,

        /// Also render a PNG of the first variable's middle time step
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// Check a bbox against the area policy and estimate download size
    Aoi {
        #[arg(long)]
        collection: String,

        #[arg(long, value_parser = parse_bbox)]
        bbox: BoundingBox,

        /// Resolution in degrees; defaults to the collection's, scaled by area
        #[arg(long)]
        resolution: Option<f64>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum TiffCompression {
    None,
    Lzw,
    Deflate,
}

impl From<TiffCompression> for GeoTiffCompression {
    fn from(c: TiffCompression) -> Self {
        match c {
            TiffCompression::None => GeoTiffCompression::None,
            TiffCompression::Lzw => GeoTiffCompression::Lzw,
            TiffCompression::Deflate => GeoTiffCompression::Deflate,
        }
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    let config = SubsetterConfig::load(&args.overrides)?;
    info!(
        recovery_window = config.reader.recovery_window_size,
        compression = %config.slicer.compression,
        "Loaded configuration"
    );

    match args.command {
        Command::Window { raster, bbox, max_size } => {
            commands::window(&raster, &bbox, max_size, &config).await
        }
        Command::Crop {
            assets,
            bbox,
            bands,
            compression,
            output,
        } => commands::crop(&assets, bbox, bands, &output, compression.into(), &config).await,
        Command::Render {
            collection,
            assets,
            bbox,
            output,
        } => commands::render_item(&collection, &assets, bbox, &output, &config).await,
        Command::Slice {
            collection,
            store,
            variables,
            bbox,
            datetime,
            output,
            preview,
        } => {
            let args = SliceArgs {
                collection_id: collection,
                store,
                variables,
                bbox,
                time: datetime,
                output,
                preview,
            };
            commands::slice(args, &config).await
        }
        Command::Aoi {
            collection,
            bbox,
            resolution,
        } => commands::aoi(&collection, &bbox, resolution),
    }
}
