#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `location_map` binary: logger setup and the
//! geocoding progress bar.
//!
//! Log records go through `indicatif-log-bridge`, so retry warnings from
//! the geocoder are printed above the bar instead of through it.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use location_map_models::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// Log filter used when `RUST_LOG` is unset or blank.
pub const DEFAULT_LOG_FILTER: &str = "info";

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {prefix} {msg}";
const BAR_TEMPLATE: &str = "{prefix} {wide_bar:.cyan/blue} {pos}/{len} rows [{eta}] {msg}";

/// Geocoding progress drawn as an `indicatif` bar.
///
/// Spins until the row count is known, then switches to a bar. The
/// message slot shows the query being resolved.
pub struct GeocodeBar {
    bar: ProgressBar,
    counted: ProgressStyle,
}

impl GeocodeBar {
    /// Adds a bar labelled `label` to `multi`.
    #[must_use]
    pub fn attach(multi: &MultiProgress, label: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        let counted = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        Arc::new(Self { bar, counted })
    }
}

impl ProgressCallback for GeocodeBar {
    fn set_total(&self, rows: u64) {
        self.bar.set_style(self.counted.clone());
        self.bar.set_length(rows);
        self.bar.set_position(0);
    }

    fn set_message(&self, query: &str) {
        self.bar.set_message(query.to_string());
    }

    fn inc(&self, rows: u64) {
        self.bar.inc(rows);
    }

    fn finish(&self, summary: &str) {
        self.bar.finish_with_message(summary.to_string());
    }
}

/// Picks the log filter: `RUST_LOG` when it holds something, otherwise
/// [`DEFAULT_LOG_FILTER`].
#[must_use]
pub fn log_filter(rust_log: Option<&str>) -> &str {
    match rust_log.map(str::trim) {
        Some(filter) if !filter.is_empty() => filter,
        _ => DEFAULT_LOG_FILTER,
    }
}

/// Installs `pretty_env_logger` behind the progress bridge and returns the
/// [`MultiProgress`] every bar must be attached to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();
    let rust_log = std::env::var("RUST_LOG").ok();

    let logger = pretty_env_logger::formatted_builder()
        .parse_filters(log_filter(rust_log.as_deref()))
        .build();
    let max_level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(max_level);
    }

    multi
}
