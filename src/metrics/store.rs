//! Shared metric storage
//!
//! The store is written to concurrently by the sampling thread and the
//! render loop, and read by the report aggregator after a run. All access
//! goes through one mutex; each `record` call is indivisible from a
//! reader's perspective.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{trace, warn};

/// How a metric's recorded values should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Independent point-in-time samples (temperature, load, FPS).
    Gauge,
    /// Cumulative values; no statistical summary is computed for these.
    Counter,
}

/// One named series of recorded values, in recording order.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSeries {
    pub name: String,
    pub kind: MetricKind,
    pub values: Vec<f64>,
}

/// Thread-safe mapping from metric name to its value series.
///
/// Created once per process and shared between the collection session and
/// the engine; `clear` is only called between task runs, while no sampling
/// thread is live.
#[derive(Debug, Default)]
pub struct MetricStore {
    series: Mutex<HashMap<String, MetricSeries>>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the series for `name`, creating the series with
    /// `kind` on first use.
    ///
    /// If a later call passes a different kind for an existing name, the
    /// kind declared first wins; the value is still appended. That mismatch
    /// is a caller bug, so it is logged rather than silently absorbed.
    pub fn record(&self, name: &str, value: f64, kind: MetricKind) {
        let mut series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        match series.get_mut(name) {
            Some(existing) => {
                if existing.kind != kind {
                    warn!(
                        metric = name,
                        ?kind,
                        established = ?existing.kind,
                        "metric recorded with conflicting kind; keeping established kind"
                    );
                }
                existing.values.push(value);
            }
            None => {
                series.insert(
                    name.to_string(),
                    MetricSeries {
                        name: name.to_string(),
                        kind,
                        values: vec![value],
                    },
                );
            }
        }
        trace!(metric = name, value, "metric recorded");
    }

    /// Discard all series, preparing the store for the next task run.
    ///
    /// Callers must only clear while no collection session is running; the
    /// engine guarantees this by clearing between `stop()` and `start()`.
    pub fn clear(&self) {
        let mut series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        series.clear();
        trace!("metric store cleared");
    }

    /// Copy out every series for aggregation.
    pub fn snapshot(&self) -> Vec<MetricSeries> {
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        series.values().cloned().collect()
    }

    /// Number of values recorded for `name`, if the series exists.
    pub fn series_len(&self, name: &str) -> Option<usize> {
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        series.get(name).map(|s| s.values.len())
    }

    pub fn is_empty(&self) -> bool {
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn record_creates_series_on_first_use() {
        let store = MetricStore::new();
        store.record("FPS", 58.2, MetricKind::Gauge);
        store.record("FPS", 59.9, MetricKind::Gauge);

        assert_eq!(store.series_len("FPS"), Some(2));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].values, vec![58.2, 59.9]);
        assert_eq!(snapshot[0].kind, MetricKind::Gauge);
    }

    #[test]
    fn established_kind_wins_on_conflict() {
        let store = MetricStore::new();
        store.record("frames", 1.0, MetricKind::Counter);
        store.record("frames", 2.0, MetricKind::Gauge);

        let snapshot = store.snapshot();
        assert_eq!(snapshot[0].kind, MetricKind::Counter);
        assert_eq!(snapshot[0].values, vec![1.0, 2.0]);
    }

    #[test]
    fn clear_resets_to_empty() {
        let store = MetricStore::new();
        store.record("CPU load", 12.5, MetricKind::Gauge);
        assert!(!store.is_empty());

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.series_len("CPU load"), None);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let store = MetricStore::new();
        store.record("CPU load", 10.0, MetricKind::Gauge);
        let snapshot = store.snapshot();

        store.record("CPU load", 20.0, MetricKind::Gauge);
        assert_eq!(snapshot[0].values, vec![10.0]);
        assert_eq!(store.series_len("CPU load"), Some(2));
    }

    #[test]
    fn concurrent_writers_lose_no_updates() {
        let store = Arc::new(MetricStore::new());

        let writers: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..10_000 {
                        store.record("contended", i as f64, MetricKind::Gauge);
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().expect("writer thread panicked");
        }

        assert_eq!(store.series_len("contended"), Some(20_000));
    }
}
