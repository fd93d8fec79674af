#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map rendering for the location map toolchain.
//!
//! Builds a Plotly figure (one `scattergeo` trace per country plus an
//! overlaid `table` of per-country counts), wraps it in a standalone HTML
//! page that loads `plotly.js` from its CDN, and optionally opens the page
//! in the system browser.

pub mod figure;
pub mod html;

use std::path::Path;
use std::process::Command;

use thiserror::Error;

pub use figure::{FigureOptions, build_figure};
pub use html::{render_html, write_html};

/// Errors from writing or opening the map.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing the HTML file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Output path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The figure could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The browser could not be launched.
    #[error("Failed to open browser: {message}")]
    Browser {
        /// What went wrong.
        message: String,
    },
}

/// Opens `path` with the platform's default handler.
///
/// # Errors
///
/// Returns [`RenderError::Browser`] if the opener cannot be spawned or
/// exits unsuccessfully.
pub fn open_in_browser(path: &Path) -> Result<(), RenderError> {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(path);

    log::debug!("Opening {} in browser", path.display());

    let status = cmd.status().map_err(|e| RenderError::Browser {
        message: e.to_string(),
    })?;

    if !status.success() {
        return Err(RenderError::Browser {
            message: format!("opener exited with {status}"),
        });
    }

    Ok(())
}
