//! Standalone HTML page around a Plotly figure.

use std::io::{BufWriter, Write as _};
use std::path::Path;

use serde_json::Value;

use crate::RenderError;

/// Pinned `plotly.js` bundle loaded by the page.
pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Renders a full-page HTML document that draws `figure`.
///
/// # Errors
///
/// Returns [`RenderError::Json`] if the figure cannot be serialized.
pub fn render_html(figure: &Value, title: &str) -> Result<String, RenderError> {
    // A literal "</script>" inside a string value would end the script
    // element early.
    let figure_json = serde_json::to_string(figure)?.replace("</", "<\\/");

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_CDN}" charset="utf-8"></script>
<style>
  html, body {{ margin: 0; height: 100%; }}
  #map {{ width: 100vw; height: 100vh; }}
</style>
</head>
<body>
<div id="map"></div>
<script>
  const figure = {figure_json};
  Plotly.newPlot("map", figure.data, figure.layout, {{ responsive: true }});
</script>
</body>
</html>
"#,
        title = escape_html(title),
    ))
}

/// Writes the page for `figure` to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`RenderError`] if serialization or the write fails.
pub fn write_html(path: &Path, figure: &Value, title: &str) -> Result<(), RenderError> {
    let page = render_html(figure, title)?;
    let io_err = |e| RenderError::Io {
        path: path.display().to_string(),
        source: e,
    };

    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(page.as_bytes()).map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    log::info!("Wrote map to {}", path.display());
    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
