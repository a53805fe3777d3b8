//! Text and JSON rendering of a finished run.

use crate::error::ProbeError;
use crate::probe::{AggregateStats, ProbeRun, RequestSample};
use serde::Serialize;
use serde_json::json;

const COLUMNS: [&str; 12] = [
    "Request number",
    "Download time",
    "DNS resolution",
    "Downstream connect time",
    "Downstream TCP+SSL time",
    "User FBL",
    "Upstream DNS",
    "Upstream TCP+SSL time",
    "Origin FBL",
    "Edge FBL",
    "Cache",
    "Download speed, Mbps",
];

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "NA".to_string())
}

/// One decimal, so `12.0` keeps its precision in the output.
fn tenths(value: f64) -> String {
    format!("{:.1}", value)
}

fn row(sample: &RequestSample) -> Vec<String> {
    vec![
        sample.index.to_string(),
        tenths(sample.total_time_ms),
        tenths(sample.dns_time_ms),
        tenths(sample.connect_time_ms),
        tenths(sample.tls_time_ms),
        tenths(sample.first_byte_time_ms),
        tenths(sample.upstream_dns_time_ms),
        tenths(sample.upstream_connect_time_ms),
        tenths(sample.origin_first_byte_ms),
        tenths(sample.edge_first_byte_ms),
        sample
            .cache_status
            .map_or_else(|| "-".to_string(), |c| c.to_string()),
        tenths(sample.download_speed_mbps),
    ]
}

/// Renders the per-request samples as a bordered grid.
pub fn render_table(samples: &[RequestSample]) -> String {
    let rows: Vec<Vec<String>> = samples.iter().map(row).collect();

    let widths: Vec<usize> = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, title)| {
            rows.iter()
                .map(|r| r[i].len())
                .chain(std::iter::once(title.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border = |fill: char| {
        let mut line = String::from("+");
        for w in &widths {
            line.extend(std::iter::repeat(fill).take(w + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };
    let line = |cells: &[String], numeric: bool| {
        let mut out = String::from("|");
        for (cell, w) in cells.iter().zip(&widths) {
            if numeric {
                out.push_str(&format!(" {:>w$} |", cell, w = w));
            } else {
                out.push_str(&format!(" {:<w$} |", cell, w = w));
            }
        }
        out.push('\n');
        out
    };

    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut out = border('-');
    out.push_str(&line(&header, false));
    out.push_str(&border('='));
    for r in &rows {
        out.push_str(&line(r, true));
        out.push_str(&border('-'));
    }
    out
}

/// Renders the reuse summary. Undefined averages print as `NA`.
pub fn render_summary(stats: &AggregateStats) -> String {
    // Averages print as whole milliseconds, the gain with one decimal.
    let avg = |v: Option<f64>| or_na(v.map(|ms| ms.round().to_string()));
    let mut out = String::new();
    out.push_str(&format!(
        "Total downstream connections: {}\n",
        stats.total_requests
    ));
    out.push_str(&format!(
        "Number of re-used upstream connections: {}\n",
        stats.reused_count
    ));
    out.push_str(&format!(
        "Average download time for re-used upstream connections: {} ms\n",
        avg(stats.avg_reused_ms())
    ));
    out.push_str(&format!(
        "Average download time for new upstream connections: {} ms\n",
        avg(stats.avg_new_ms())
    ));
    out.push_str(&format!(
        "Latency gain: {} %\n",
        or_na(stats.latency_gain_percent().map(tenths))
    ));
    out
}

pub fn render_text(run: &ProbeRun) -> String {
    let mut out = render_table(&run.samples);
    out.push('\n');
    out.push_str(&render_summary(&run.stats));
    out
}

#[derive(Serialize)]
struct Summary {
    total_requests: u32,
    reused_count: u32,
    avg_reused_ms: Option<f64>,
    avg_new_ms: Option<f64>,
    latency_gain_percent: Option<f64>,
}

/// JSON document with every sample and the derived summary; undefined
/// values are `null`.
pub fn render_json(run: &ProbeRun) -> serde_json::Result<String> {
    let summary = Summary {
        total_requests: run.stats.total_requests,
        reused_count: run.stats.reused_count,
        avg_reused_ms: run.stats.avg_reused_ms(),
        avg_new_ms: run.stats.avg_new_ms(),
        latency_gain_percent: run.stats.latency_gain_percent(),
    };
    serde_json::to_string_pretty(&json!({
        "success": true,
        "samples": run.samples,
        "summary": summary,
    }))
}

pub fn render_json_error(error: &ProbeError) -> String {
    json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "code": error.code(),
            "index": error.index(),
        }
    })
    .to_string()
}
