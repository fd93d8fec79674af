//! Plotly figure construction.
//!
//! The figure is plain JSON (`{"data": [...], "layout": {...}}`) so it can
//! be handed to `Plotly.newPlot` unchanged:
//!
//! - one `scattergeo` trace per country, in order of first appearance,
//!   coloured from the Plotly qualitative palette,
//! - a `table` trace with the per-country counts pinned to the left fifth
//!   of the canvas,
//! - a natural-earth projection with country and subunit borders.
//!
//! Locations without a position are left off the map.

use location_map_models::{CountryCount, GeocodedLocation};
use serde_json::{Value, json};

/// Plotly's default qualitative colour sequence.
pub const PALETTE: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

/// Diameter of each location marker in pixels.
pub const MARKER_SIZE: u32 = 8;

/// Presentation settings for [`build_figure`].
#[derive(Debug, Clone, PartialEq)]
pub struct FigureOptions {
    /// Page and figure title.
    pub title: String,
    /// Horizontal extent of the summary table, as a fraction of the canvas.
    pub table_domain_x: [f64; 2],
    /// Vertical extent of the summary table, as a fraction of the canvas.
    pub table_domain_y: [f64; 2],
}

impl Default for FigureOptions {
    fn default() -> Self {
        Self {
            title: "Location Data Map".to_string(),
            table_domain_x: [0.0, 0.2],
            table_domain_y: [0.0, 1.0],
        }
    }
}

/// Points belonging to one country's trace.
#[derive(Default)]
struct CountryTrace<'a> {
    lat: Vec<f64>,
    lon: Vec<f64>,
    names: Vec<&'a str>,
    details: Vec<[&'a str; 3]>,
}

/// Builds the Plotly figure for `locations` with `counts` as the table.
#[must_use]
pub fn build_figure(
    locations: &[GeocodedLocation],
    counts: &[CountryCount],
    options: &FigureOptions,
) -> Value {
    let mut order: Vec<&str> = Vec::new();
    let mut traces: Vec<CountryTrace<'_>> = Vec::new();

    for location in locations {
        let Some(position) = location.position else {
            continue;
        };
        let record = &location.record;

        let idx = if let Some(i) = order.iter().position(|c| *c == record.country) {
            i
        } else {
            order.push(&record.country);
            traces.push(CountryTrace::default());
            order.len() - 1
        };

        let trace = &mut traces[idx];
        trace.lat.push(position.latitude);
        trace.lon.push(position.longitude);
        trace.names.push(&record.name);
        trace
            .details
            .push([record.country.as_str(), record.city.as_str(), record.address.as_str()]);
    }

    let mut data: Vec<Value> = order
        .iter()
        .zip(traces)
        .enumerate()
        .map(|(i, (country, trace))| scatter_trace(country, &trace, PALETTE[i % PALETTE.len()]))
        .collect();

    data.push(table_trace(counts, options));

    json!({
        "data": data,
        "layout": {
            "title": { "text": options.title },
            "showlegend": false,
            "geo": {
                "projection": { "type": "natural earth" },
                "showcountries": true,
                "countrycolor": "Black",
                "showsubunits": true,
                "subunitcolor": "Blue",
            },
        },
    })
}

fn scatter_trace(country: &str, trace: &CountryTrace<'_>, color: &str) -> Value {
    json!({
        "type": "scattergeo",
        "mode": "markers",
        "name": country,
        "legendgroup": country,
        "lat": trace.lat,
        "lon": trace.lon,
        "hovertext": trace.names,
        "customdata": trace.details,
        "hovertemplate": "<b>%{hovertext}</b><br><br>\
                          Country=%{customdata[0]}<br>\
                          City=%{customdata[1]}<br>\
                          Address=%{customdata[2]}<extra></extra>",
        "marker": {
            "size": MARKER_SIZE,
            "color": color,
            "line": { "width": 0.5, "color": "black" },
        },
        "geo": "geo",
    })
}

fn table_trace(counts: &[CountryCount], options: &FigureOptions) -> Value {
    let countries: Vec<&str> = counts.iter().map(|c| c.country.as_str()).collect();
    let totals: Vec<u64> = counts.iter().map(|c| c.total).collect();

    json!({
        "type": "table",
        "columnwidth": [0.15, 0.25],
        "header": {
            "values": ["Country", "Count Locations"],
            "font": { "color": "black", "size": 10 },
            "fill": { "color": "lightgrey" },
            "align": "left",
        },
        "cells": {
            "values": [countries, totals],
            "font": { "color": "black", "size": 10 },
            "fill": { "color": "rgba(255, 255, 255, 0.7)" },
            "align": "left",
            "height": 20,
        },
        "domain": {
            "x": options.table_domain_x,
            "y": options.table_domain_y,
        },
    })
}
