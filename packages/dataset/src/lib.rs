#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loader and validator for delimited location tables.
//!
//! The input is a header-first table (semicolon-delimited by default) that
//! must contain the `Name`, `Country`, `City` and `Address` columns. Extra
//! columns are ignored. Each data row is checked for empty critical fields
//! and the outcome is handled according to an [`InvalidRowPolicy`].
//!
//! A missing file, malformed CSV or absent header fails the load outright.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use location_map_models::LocationRecord;

/// Default column delimiter.
pub const DEFAULT_DELIMITER: u8 = b';';

/// Columns that must be present in the header and populated in every row.
pub const CRITICAL_COLUMNS: [&str; 4] = ["Name", "Country", "City", "Address"];

/// Errors from loading a location table.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The input file could not be opened or read.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The table is not valid delimited text.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A critical column is absent from the header row.
    #[error("Required column '{column}' not found in header (found: {found})")]
    MissingColumn {
        /// The missing column name.
        column: &'static str,
        /// The header row as read, for diagnostics.
        found: String,
    },

    /// Rows with missing critical fields were found and the policy is
    /// [`InvalidRowPolicy::Fail`].
    #[error(
        "{rows} row(s) have missing values in critical columns: {}",
        list_issues(.issues)
    )]
    InvalidRows {
        /// Number of offending rows.
        rows: usize,
        /// Every empty critical field, in row order.
        issues: Vec<MissingField>,
    },

    /// The delimiter argument is not a single ASCII character.
    #[error("Invalid delimiter '{value}': expected a single ASCII character")]
    InvalidDelimiter {
        /// The rejected value.
        value: String,
    },

    /// Unrecognised invalid-row policy name.
    #[error("Unknown invalid-row policy '{value}' (expected skip, fail or proceed)")]
    UnknownPolicy {
        /// The rejected value.
        value: String,
    },
}

/// What to do with rows that have empty critical fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidRowPolicy {
    /// Drop incomplete rows and keep going.
    #[default]
    Skip,
    /// Abort the load if any row is incomplete.
    Fail,
    /// Keep incomplete rows, with empty strings for the missing fields.
    Proceed,
}

impl InvalidRowPolicy {
    /// Lowercase identifier accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Fail => "fail",
            Self::Proceed => "proceed",
        }
    }
}

impl fmt::Display for InvalidRowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvalidRowPolicy {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            "proceed" => Ok(Self::Proceed),
            _ => Err(DatasetError::UnknownPolicy {
                value: s.to_string(),
            }),
        }
    }
}

/// A critical field left empty in a data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    /// 1-based data row number.
    pub line: u64,
    /// Name of the empty column.
    pub column: &'static str,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} '{}'", self.line, self.column)
    }
}

fn list_issues(issues: &[MissingField]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of loading and validating a table.
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    /// Rows that go on to geocoding.
    pub records: Vec<LocationRecord>,
    /// Every empty critical field found, in row order.
    pub issues: Vec<MissingField>,
    /// Number of data rows read (header excluded).
    pub total_rows: u64,
    /// Number of incomplete rows dropped under [`InvalidRowPolicy::Skip`].
    pub skipped_rows: u64,
}

impl LoadedDataset {
    /// Whether any critical field was empty.
    #[must_use]
    pub fn has_missing_values(&self) -> bool {
        !self.issues.is_empty()
    }

    /// The validation diagnostic for this table, one line per empty field
    /// followed by a total. A single info line when nothing is missing.
    #[must_use]
    pub fn validation_report(&self) -> Vec<(log::Level, String)> {
        if !self.has_missing_values() {
            return vec![(
                log::Level::Info,
                "No missing values found in critical columns.".to_string(),
            )];
        }

        let mut lines: Vec<(log::Level, String)> = self
            .issues
            .iter()
            .map(|issue| {
                (
                    log::Level::Warn,
                    format!("Row {}: missing value in column '{}'", issue.line, issue.column),
                )
            })
            .collect();
        lines.push((
            log::Level::Warn,
            format!(
                "Missing values found in the CSV data: {} field(s) empty across {} row(s)",
                self.issues.len(),
                count_rows(&self.issues),
            ),
        ));
        lines
    }

    /// Logs [`Self::validation_report`].
    pub fn log_validation(&self) {
        for (level, line) in self.validation_report() {
            log::log!(level, "{line}");
        }
    }
}

/// Parses a delimiter argument. Accepts any single ASCII character plus
/// the spelled-out `tab` and `\t`.
///
/// # Errors
///
/// Returns [`DatasetError::InvalidDelimiter`] for empty, multi-character or
/// non-ASCII values.
pub fn parse_delimiter(value: &str) -> Result<u8, DatasetError> {
    if value == "\\t" || value.eq_ignore_ascii_case("tab") {
        return Ok(b'\t');
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(DatasetError::InvalidDelimiter {
            value: value.to_string(),
        }),
    }
}

/// Loads a location table from disk.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be opened, the CSV is
/// malformed, a critical column is absent, or the policy is
/// [`InvalidRowPolicy::Fail`] and a row is incomplete.
pub fn load_locations(
    path: &Path,
    delimiter: u8,
    policy: InvalidRowPolicy,
) -> Result<LoadedDataset, DatasetError> {
    let file = std::fs::File::open(path).map_err(|e| DatasetError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    log::debug!("Reading locations from {}", path.display());
    read_locations(file, delimiter, policy)
}

/// Reads a location table from any reader.
///
/// # Errors
///
/// See [`load_locations`].
pub fn read_locations(
    reader: impl Read,
    delimiter: u8,
    policy: InvalidRowPolicy,
) -> Result<LoadedDataset, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut indices = [0usize; CRITICAL_COLUMNS.len()];
    for (slot, column) in indices.iter_mut().zip(CRITICAL_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| DatasetError::MissingColumn {
                column,
                found: headers.join(", "),
            })?;
    }

    let mut dataset = LoadedDataset::default();

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let line = row as u64 + 1;
        dataset.total_rows += 1;

        let fields = indices.map(|i| {
            record
                .get(i)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        });

        let mut complete = true;
        for (value, column) in fields.iter().zip(CRITICAL_COLUMNS) {
            if value.is_none() {
                complete = false;
                dataset.issues.push(MissingField { line, column });
            }
        }

        if !complete && policy == InvalidRowPolicy::Skip {
            dataset.skipped_rows += 1;
            continue;
        }

        let [name, country, city, address] = fields.map(Option::unwrap_or_default);
        dataset.records.push(LocationRecord {
            line,
            name,
            country,
            city,
            address,
        });
    }

    if policy == InvalidRowPolicy::Fail && dataset.has_missing_values() {
        dataset.log_validation();
        return Err(DatasetError::InvalidRows {
            rows: count_rows(&dataset.issues),
            issues: dataset.issues,
        });
    }

    log::info!(
        "Loaded {} of {} rows ({} skipped)",
        dataset.records.len(),
        dataset.total_rows,
        dataset.skipped_rows,
    );

    Ok(dataset)
}

/// Counts distinct rows among issues. Issues are pushed in row order, so
/// consecutive duplicates are enough.
fn count_rows(issues: &[MissingField]) -> usize {
    let mut rows = 0;
    let mut last = None;
    for issue in issues {
        if last != Some(issue.line) {
            rows += 1;
            last = Some(issue.line);
        }
    }
    rows
}
