//! # Tide Info Command Line
//!
//! Fetches the stations around a reference point and the tide predictions for
//! it, then prints the current height, the next tide and a chart of the height
//! curve. Settings come from tide-config.toml; flags override them.

use anyhow::{bail, Context};
use chrono::{Local, Utc};
use clap::Parser;
use std::path::PathBuf;
use tide_info_lib::config::Config;
use tide_info_lib::decoder::TideInfo;
use tide_info_lib::fallback::CurrentOrPrevious;
use tide_info_lib::renderer::draw_ascii;
use tide_info_lib::tide_data::{FetchOutcome, WorldTidesServer};
use tracing::{info, warn};

/// WorldTides tide predictions in the terminal
#[derive(Parser, Debug)]
#[command(name = "tide-info")]
#[command(about = "Show the current tide state from WorldTides predictions")]
struct Args {
    /// WorldTides API key
    #[arg(short = 'k', long)]
    key: Option<String>,

    /// Reference latitude
    #[arg(short = 'l', long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Reference longitude
    #[arg(short = 'L', long, visible_alias = "long", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Configuration file
    #[arg(long, default_value = "tide-config.toml")]
    config: PathBuf,

    /// Hours of height curve to chart
    #[arg(long, default_value = "12")]
    hours: i64,

    /// Write the plot returned by the API to this PNG file
    #[arg(long)]
    plot: Option<PathBuf>,
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load_from_path(&args.config);
    if let Some(key) = args.key {
        config.server.key = key;
    }
    if let Some(lat) = args.lat {
        config.server.lat = lat;
    }
    if let Some(lon) = args.lon {
        config.server.lon = lon;
    }
    if config.server.key.is_empty() {
        bail!("no API key: pass --key or set key in the [server] table of the config file");
    }

    let mut server = WorldTidesServer::new(config.server_parameters())
        .context("building HTTP client")?
        .with_base_url(config.server.base_url.clone());

    // One request of each kind, awaited to completion or timeout
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        server.fetch_stations().await;
        server.fetch_tide_data(true).await;
    });

    let credit: u32 = [server.station_outcome(), server.tide_outcome()]
        .into_iter()
        .flatten()
        .map(FetchOutcome::credit)
        .sum();
    info!(credit, "API credits used");

    let tide_outcome = server.take_tide_outcome();
    let reason = match tide_outcome.as_ref().and_then(FetchOutcome::error) {
        Some(e) => e.to_string(),
        None => "no request made".to_string(),
    };
    let Some(tides) = tide_outcome.and_then(FetchOutcome::into_data) else {
        bail!("no tide data: {reason}");
    };
    let stations = server.station_outcome().and_then(FetchOutcome::data);

    let info = CurrentOrPrevious::new(Some(&tides), None);
    draw_ascii(&info, Utc::now().timestamp(), args.hours, &Local);

    match TideInfo::new(stations).stations_around() {
        Ok(around) => println!(
            "\nstations within {} km ({}){}",
            config.server.station_distance, around.station_around_nb, around.station_around_name
        ),
        Err(e) => warn!(error = %e, "station list unavailable"),
    }

    if let Some(path) = args.plot {
        let png = info.plot_png().context("decoding plot")?;
        std::fs::write(&path, png).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "plot written");
    }

    Ok(())
}
