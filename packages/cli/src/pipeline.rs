//! The load -> geocode -> jitter -> aggregate -> render pipeline.
//!
//! Rows are geocoded one at a time in input order. Repeated addresses are
//! answered by the geocoder's cache, so the number of provider requests is
//! bounded by the number of distinct addresses (plus retries).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use location_map_analytics::{apply_jitter, check_strength, country_counts};
use location_map_cli_utils::{GeocodeBar, MultiProgress};
use location_map_dataset::{InvalidRowPolicy, LoadedDataset, load_locations};
use location_map_geocoder::service_registry::{create_provider, find_service};
use location_map_geocoder::{GeocodeProvider, GeocodeStats, Geocoder, RetryPolicy};
use location_map_models::progress::ProgressCallback;
use location_map_models::{GeocodeOutcome, GeocodedLocation, LocationRecord};
use location_map_render::{FigureOptions, build_figure, open_in_browser, write_html};

/// Identifies this tool to geocoding services (Nominatim requires it).
const USER_AGENT: &str = concat!("location-map/", env!("CARGO_PKG_VERSION"));

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a run needs, resolved from the command line.
pub struct PipelineConfig {
    pub input: PathBuf,
    pub delimiter: u8,
    pub policy: InvalidRowPolicy,
    pub provider: Option<String>,
    pub jitter: f64,
    pub retry: RetryPolicy,
    pub output: PathBuf,
    pub open: bool,
}

/// A row whose lookup ended in [`GeocodeOutcome::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRow {
    pub line: u64,
    pub query: String,
    pub reason: String,
}

/// End-of-run tallies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total_rows: u64,
    pub skipped_rows: u64,
    pub resolved: u64,
    pub missing: u64,
    pub failed: Vec<FailedRow>,
    pub stats: GeocodeStats,
}

impl RunSummary {
    fn new(dataset: &LoadedDataset, locations: &[GeocodedLocation], stats: GeocodeStats) -> Self {
        let mut summary = Self {
            total_rows: dataset.total_rows,
            skipped_rows: dataset.skipped_rows,
            resolved: 0,
            missing: 0,
            failed: Vec::new(),
            stats,
        };

        for location in locations {
            match &location.outcome {
                GeocodeOutcome::Resolved(_) => summary.resolved += 1,
                GeocodeOutcome::Missing => summary.missing += 1,
                GeocodeOutcome::Failed { reason } => summary.failed.push(FailedRow {
                    line: location.record.line,
                    query: location.record.query_key(),
                    reason: reason.clone(),
                }),
            }
        }

        summary
    }

    fn log(&self) {
        log::info!(
            "Rows: {} read, {} skipped for missing values",
            self.total_rows,
            self.skipped_rows,
        );
        log::info!(
            "Geocoding: {} resolved, {} no match, {} failed",
            self.resolved,
            self.missing,
            self.failed.len(),
        );
        log::info!(
            "Provider: {} request(s) for {} distinct address(es), {} retries, {} cache hit(s)",
            self.stats.provider_calls,
            self.stats.queries,
            self.stats.retries,
            self.stats.cache_hits,
        );

        for row in &self.failed {
            log::warn!("Row {} ('{}') failed: {}", row.line, row.query, row.reason);
        }
    }
}

/// Runs the full pipeline against the configured geocoding service.
///
/// # Errors
///
/// Returns an error if the input cannot be loaded, the service cannot be
/// configured, or the map cannot be written. Individual rows that fail to
/// geocode are reported in the summary instead.
pub async fn run(
    config: &PipelineConfig,
    multi: &MultiProgress,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let service = find_service(config.provider.as_deref())?;
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    let provider = create_provider(&service, client)?;
    log::info!("Geocoding with {} ({})", service.name, service.base_url());

    let summary =
        run_with_provider(config, provider, || GeocodeBar::attach(multi, "Geocoding")).await?;

    if config.open
        && let Err(e) = open_in_browser(&config.output)
    {
        log::warn!("{e}; open {} manually", config.output.display());
    }

    Ok(summary)
}

/// Runs every stage up to and including writing the map, using `provider`
/// for lookups. `progress` is only called once the input has loaded, so a
/// rejected input never draws a bar.
///
/// # Errors
///
/// See [`run`].
pub async fn run_with_provider(
    config: &PipelineConfig,
    provider: Box<dyn GeocodeProvider>,
    progress: impl FnOnce() -> Arc<dyn ProgressCallback>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let start = Instant::now();

    check_strength(config.jitter)?;

    let dataset = load_locations(&config.input, config.delimiter, config.policy)?;
    dataset.log_validation();

    let mut geocoder = Geocoder::new(provider, config.retry);
    let mut locations = geocode_all(&mut geocoder, &dataset.records, &progress()).await;

    apply_jitter(&mut locations, config.jitter, &mut rand::thread_rng())?;

    let counts = country_counts(&dataset.records);
    let options = FigureOptions::default();
    let figure = build_figure(&locations, &counts, &options);
    write_html(&config.output, &figure, &options.title)?;

    let summary = RunSummary::new(&dataset, &locations, geocoder.stats());
    summary.log();
    log::info!("Finished in {:.1}s", start.elapsed().as_secs_f64());

    Ok(summary)
}

/// Geocodes every record in order.
pub async fn geocode_all(
    geocoder: &mut Geocoder,
    records: &[LocationRecord],
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<GeocodedLocation> {
    progress.set_total(records.len() as u64);

    let mut locations = Vec::with_capacity(records.len());
    for record in records {
        progress.set_message(&record.query_key());
        let outcome = geocoder.resolve_record(record).await;
        locations.push(GeocodedLocation::new(record.clone(), outcome));
        progress.inc(1);
    }

    progress.finish(&format!(
        "Geocoded {} row(s) via {}",
        records.len(),
        geocoder.provider_id()
    ));
    locations
}
