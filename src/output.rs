//! Report file rendering
//!
//! Serializes the completed report model to JSON and HTML files. The
//! model itself (src/report.rs) knows nothing about on-disk encodings;
//! everything format-specific is contained here. All numeric values are
//! rendered with two decimal places.

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::report::{format_two_decimals, BenchmarkReport, MetricSummary};

const JSON_REPORT_NAME: &str = "framebench_report.json";
const HTML_REPORT_NAME: &str = "framebench_report.html";

/// Write both report files under `output_dir` and return their paths.
pub fn write_reports(report: &BenchmarkReport, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    let json_path = output_dir.join(JSON_REPORT_NAME);
    let json = serde_json::to_string_pretty(&json_value(report))
        .context("Failed to serialize benchmark report")?;
    fs::write(&json_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", json_path.display()))?;
    info!(path = %json_path.display(), "JSON report written");

    let html_path = output_dir.join(HTML_REPORT_NAME);
    fs::write(&html_path, html_document(report))
        .with_context(|| format!("Failed to write HTML report to {}", html_path.display()))?;
    info!(path = %html_path.display(), "HTML report written");

    Ok((json_path, html_path))
}

fn json_value(report: &BenchmarkReport) -> Value {
    let environment: Map<String, Value> = report
        .environment
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    let mut results = Map::new();
    for section in &report.results {
        let mut metrics = Map::new();
        for (name, summary) in &section.metrics {
            metrics.insert(name.clone(), metric_value(summary));
        }
        results.insert(section.task.clone(), Value::Object(metrics));
    }

    json!({
        "Run ID": report.run_id.to_string(),
        "Created": report.created_at.to_rfc3339(),
        "Environment": environment,
        "Benchmark Results": results,
    })
}

fn metric_value(summary: &MetricSummary) -> Value {
    let mut entry = Map::new();
    if let Some(average) = summary.average {
        entry.insert("average".into(), format_two_decimals(average).into());
    }
    if let Some(minimum) = summary.minimum {
        entry.insert("minimum".into(), format_two_decimals(minimum).into());
    }
    if let Some(maximum) = summary.maximum {
        entry.insert("maximum".into(), format_two_decimals(maximum).into());
    }
    if let Some(std_dev) = summary.std_dev {
        entry.insert("std_dev".into(), format_two_decimals(std_dev).into());
    }
    entry.insert(
        "values".into(),
        Value::Array(
            summary
                .values
                .iter()
                .map(|v| Value::String(format_two_decimals(*v)))
                .collect(),
        ),
    );
    Value::Object(entry)
}

fn html_document(report: &BenchmarkReport) -> String {
    let mut body = String::new();

    body.push_str("<h1>framebench report</h1>\n");
    body.push_str(&format!(
        "<p class=\"meta\">Run {} &middot; {}</p>\n",
        escape(&report.run_id.to_string()),
        escape(&report.created_at.to_rfc3339())
    ));

    body.push_str("<h2>Environment</h2>\n<table>\n");
    for (key, value) in &report.environment {
        body.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            escape(key),
            escape(value)
        ));
    }
    body.push_str("</table>\n");

    for section in &report.results {
        body.push_str(&format!("<h2>{}</h2>\n", escape(&section.task)));
        body.push_str(
            "<table>\n<tr><th>Metric</th><th>Min</th><th>Max</th><th>Avg</th>\
<th>Std dev</th><th>Samples</th></tr>\n",
        );
        for (name, summary) in &section.metrics {
            let cell = |v: Option<f64>| v.map(format_two_decimals).unwrap_or_default();
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(name),
                cell(summary.minimum),
                cell(summary.maximum),
                cell(summary.average),
                cell(summary.std_dev),
                summary.values.len()
            ));
        }
        body.push_str("</table>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
<title>framebench report</title>\n<style>\n\
body {{ font-family: sans-serif; margin: 2em; color: #222; }}\n\
table {{ border-collapse: collapse; margin-bottom: 1.5em; }}\n\
th, td {{ border: 1px solid #bbb; padding: 4px 10px; text-align: left; }}\n\
th {{ background: #eee; }}\n\
.meta {{ color: #777; }}\n\
</style>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
