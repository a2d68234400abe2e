//! Fetch an AIS density raster and write it as JSON rows indexed by latitude.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use gmtds_client::{BoundingBox, Client, ClientOptions, DensityGrid, Progress, normalize_wms_time};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gmtds-density")]
#[command(about = "Fetch an AIS density grid from the GMTDS WMS, one query per cell")]
struct Args {
    /// Western longitude bound
    #[arg(long, default_value_t = -179.5, allow_negative_numbers = true)]
    lon_min: f64,

    /// Eastern longitude bound
    #[arg(long, default_value_t = 179.5, allow_negative_numbers = true)]
    lon_max: f64,

    /// Southern latitude bound
    #[arg(long, default_value_t = -90.0, allow_negative_numbers = true)]
    lat_min: f64,

    /// Northern latitude bound
    #[arg(long, default_value_t = 90.0, allow_negative_numbers = true)]
    lat_max: f64,

    /// Number of longitude bins (raster WIDTH)
    #[arg(long, default_value_t = 718)]
    n_lon: u32,

    /// Number of latitude bins (raster HEIGHT)
    #[arg(long, default_value_t = 360)]
    n_lat: u32,

    /// Snapshot time (ISO-8601, normalized to UTC)
    #[arg(long, default_value = "2023-10-01T00:00:00Z")]
    time: String,

    /// Output JSON file
    #[arg(short, long, default_value = "data.json")]
    output: PathBuf,

    /// WMS source: "gmtds" or an explicit http(s) URL
    #[arg(long, env = "GMTDS_SOURCE")]
    source: Option<String>,

    /// Ceiling on the whole batch, in seconds
    #[arg(long, env = "GMTDS_BATCH_TIMEOUT_SECONDS")]
    timeout_seconds: Option<u64>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn validate(args: &Args) -> Result<()> {
    let bbox =
        BoundingBox::from_ranges((args.lon_min, args.lon_max), (args.lat_min, args.lat_max));
    if !bbox.is_ordered() {
        bail!(
            "inverted window: lon {}..{}, lat {}..{}",
            args.lon_min,
            args.lon_max,
            args.lat_min,
            args.lat_max
        );
    }
    if args.n_lon == 0 || args.n_lat == 0 {
        bail!("bin counts must be positive, got {}x{}", args.n_lon, args.n_lat);
    }
    Ok(())
}

fn log_progress(p: Progress) {
    let step = (p.total / 100).max(1);
    if p.completed % step == 0 || p.completed == p.total {
        info!(
            completed = p.completed,
            total = p.total,
            "{:.1}% of cells fetched",
            100.0 * p.completed as f64 / p.total as f64
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);
    validate(&args)?;

    let time = normalize_wms_time(&args.time)?;

    let mut opts = ClientOptions::from_env()?;
    if let Some(source) = &args.source {
        opts.source = source.clone();
    }
    if let Some(secs) = args.timeout_seconds {
        opts.batch_timeout = Duration::from_secs(secs);
    }
    let client = Client::new(opts)?;

    info!(
        base_url = client.base_url(),
        n_lon = args.n_lon,
        n_lat = args.n_lat,
        time = %time,
        "fetching density grid"
    );
    let values = client
        .fetch_grid_with_progress(
            (args.lon_min, args.lon_max),
            (args.lat_min, args.lat_max),
            args.n_lon,
            args.n_lat,
            &time,
            log_progress,
        )
        .await
        .context("grid fetch failed")?;

    let grid = DensityGrid::from_lon_major(&values, args.n_lon as usize, args.n_lat as usize)?;
    grid.write_json(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "Wrote {}x{} density grid to {}",
        grid.n_lat(),
        grid.n_lon(),
        args.output.display()
    );
    Ok(())
}
