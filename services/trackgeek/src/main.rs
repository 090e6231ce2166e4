//! trackgeek command-line entry point.
//!
//! Reads GPX tracks from a file or directory and/or a track library, then
//! draws them all onto one map:
//! - PNG through an anti-aliased raster canvas
//! - SVG as stroked paths
//! - optional import of the input tracks into the library first

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use trackgeek::config::{CliOverrides, FileConfig, Settings};
use trackgeek::pipeline;

#[derive(Parser, Debug)]
#[command(name = "trackgeek")]
#[command(about = "Draw swathes of GPX tracks onto one map")]
struct Args {
    /// YAML config file supplying defaults
    #[arg(long, env = "TRACKGEEK_CONFIG")]
    config: Option<PathBuf>,

    /// GPX file or directory of GPX files
    #[arg(long)]
    input: Option<PathBuf>,

    /// Track library root directory
    #[arg(long, env = "TRACKGEEK_LIBRARY")]
    library: Option<PathBuf>,

    /// Copy the input tracks into the library before drawing
    #[arg(long)]
    import: bool,

    /// Output PNG path
    #[arg(long)]
    out_png: Option<PathBuf>,

    /// Output SVG path
    #[arg(long)]
    out_svg: Option<PathBuf>,

    /// Write a JSON summary of the run here
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Absolute output resolution, e.g. 800x600
    #[arg(long)]
    resolution: Option<String>,

    /// Output width; height follows the map's aspect ratio
    #[arg(long)]
    width: Option<u32>,

    /// Output height; width follows the map's aspect ratio
    #[arg(long)]
    height: Option<u32>,

    /// Size of the longer output side
    #[arg(long)]
    max: Option<u32>,

    /// Size of the shorter output side
    #[arg(long)]
    min: Option<u32>,

    /// Latitude range, e.g. 43.1,45.6
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<String>,

    /// Longitude range, e.g. -2.3,1.2
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<String>,

    /// Skip tracks that end before this date (YYYY-MM-DD)
    #[arg(long)]
    min_date: Option<NaiveDate>,

    /// Skip tracks that start after this date (YYYY-MM-DD)
    #[arg(long)]
    max_date: Option<NaiveDate>,

    /// Re-read tracks while drawing instead of keeping them in memory
    #[arg(long)]
    save_memory: bool,

    /// Log level
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            input: self.input.clone(),
            library: self.library.clone(),
            import: self.import,
            save_memory: self.save_memory,
            out_png: self.out_png.clone(),
            out_svg: self.out_svg.clone(),
            summary: self.summary.clone(),
            resolution: self.resolution.clone(),
            width: self.width,
            height: self.height,
            max: self.max,
            min: self.min,
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            min_date: self.min_date,
            max_date: self.max_date,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if args.log_json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Starting trackgeek");

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&file, &args.overrides())?;

    let summary = pipeline::run(&settings).await?;

    info!(
        drawn = summary.tracks_drawn,
        skipped = summary.skipped.len(),
        imported = summary.imported,
        outputs = summary.outputs.len(),
        "Done"
    );
    Ok(())
}
