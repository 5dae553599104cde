//! Benchmark report model and per-metric aggregation
//!
//! The report is a plain data model: static environment facts plus one
//! section per task run, appended in execution order. Serializing it to a
//! file format is the renderer's job, not this module's.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::metrics::{MetricKind, MetricSeries};

/// Statistics for one metric over one task run.
///
/// Aggregate fields are only present for gauge series with at least one
/// sample; counters carry their raw values only.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSummary {
    pub kind: MetricKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
    pub values: Vec<f64>,
}

/// The per-task slice of the final report.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSection {
    pub task: String,
    pub metrics: BTreeMap<String, MetricSummary>,
}

/// Complete report for one benchmark invocation.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub environment: BTreeMap<String, String>,
    pub results: Vec<TaskSection>,
}

impl BenchmarkReport {
    pub fn new(environment: BTreeMap<String, String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            environment,
            results: Vec::new(),
        }
    }

    /// Append the section for a finished task run. Sections are immutable
    /// once appended.
    pub fn add_section(&mut self, task: &str, series: Vec<MetricSeries>) {
        let metrics = series
            .iter()
            .map(|s| (s.name.clone(), summarize(s)))
            .collect();
        self.results.push(TaskSection {
            task: task.to_string(),
            metrics,
        });
    }
}

/// Compute the summary for one series.
///
/// Standard deviation is the population form, matching what the report
/// consumers expect. An empty series yields no aggregates.
pub fn summarize(series: &MetricSeries) -> MetricSummary {
    let values = &series.values;
    if series.kind != MetricKind::Gauge || values.is_empty() {
        return MetricSummary {
            kind: series.kind,
            minimum: None,
            maximum: None,
            average: None,
            std_dev: None,
            values: values.clone(),
        };
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let minimum = values.iter().copied().fold(f64::INFINITY, f64::min);
    let maximum = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    MetricSummary {
        kind: series.kind,
        minimum: Some(minimum),
        maximum: Some(maximum),
        average: Some(mean),
        std_dev: Some(variance.sqrt()),
        values: values.clone(),
    }
}

/// Rendered numeric values are fixed at two decimal places.
pub fn format_two_decimals(value: f64) -> String {
    format!("{value:.2}")
}
