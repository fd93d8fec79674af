#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the location map tool.
//!
//! Reads a delimited table of named locations, geocodes each address,
//! and writes an interactive world map with a per-country summary table.
//!
//! The geocoding API key comes from the environment (`OPENCAGE_API_KEY`
//! for the default service). Log verbosity follows `RUST_LOG`.

mod pipeline;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use location_map_analytics::DEFAULT_JITTER_STRENGTH;
use location_map_dataset::{InvalidRowPolicy, parse_delimiter};
use location_map_geocoder::RetryPolicy;
use location_map_geocoder::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY};

use crate::pipeline::PipelineConfig;

#[derive(Parser)]
#[command(
    name = "location_map",
    about = "Geocode a location table and plot it on a world map"
)]
struct Cli {
    /// Delimited file with `Name`, `Country`, `City` and `Address` columns
    input: PathBuf,

    /// Column delimiter (a single character, or `tab`)
    #[arg(long, default_value = ";")]
    delimiter: String,

    /// Geocoding service id (`opencage` or `nominatim`). Defaults to the
    /// highest-priority enabled service.
    #[arg(long)]
    provider: Option<String>,

    /// Maximum random marker offset in degrees, to separate stacked points
    #[arg(long, default_value_t = DEFAULT_JITTER_STRENGTH)]
    jitter: f64,

    /// Attempts per query before a transient provider error becomes a failure
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Wait before the first retry, in milliseconds. Doubles on each retry.
    #[arg(long, default_value = "1000")]
    retry_delay_ms: u64,

    /// Where to write the HTML map
    #[arg(long, default_value = "location_map.html")]
    output: PathBuf,

    /// Write the map without opening it in a browser
    #[arg(long)]
    no_open: bool,

    /// What to do with rows missing a critical field: `skip`, `fail` or
    /// `proceed`
    #[arg(long, default_value = "skip")]
    on_invalid: InvalidRowPolicy,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = location_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = PipelineConfig {
        input: cli.input,
        delimiter: parse_delimiter(&cli.delimiter)?,
        policy: cli.on_invalid,
        provider: cli.provider,
        jitter: cli.jitter,
        retry: RetryPolicy::new(
            cli.max_attempts,
            Duration::from_millis(cli.retry_delay_ms),
            DEFAULT_MAX_DELAY,
        ),
        output: cli.output,
        open: !cli.no_open,
    };

    pipeline::run(&config, &multi).await?;

    Ok(())
}
