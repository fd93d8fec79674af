//! Row-level progress reporting for the geocoding stage.

use std::sync::Arc;

/// Receives updates while rows are geocoded. The CLI draws a terminal bar;
/// tests pass [`null_progress`].
pub trait ProgressCallback: Send + Sync {
    /// Number of rows that will be processed.
    fn set_total(&self, rows: u64);

    /// Shows the query currently being resolved.
    fn set_message(&self, query: &str);

    /// Marks `rows` more rows as done.
    fn inc(&self, rows: u64);

    /// Ends the stage, leaving `summary` visible.
    fn finish(&self, summary: &str);
}

struct Silent;

impl ProgressCallback for Silent {
    fn set_total(&self, _rows: u64) {}
    fn set_message(&self, _query: &str) {}
    fn inc(&self, _rows: u64) {}
    fn finish(&self, _summary: &str) {}
}

/// Returns a callback that ignores every update.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(Silent)
}
