//! Metric collection: the shared store, the collection session, and the
//! per-platform samplers feeding it.

pub mod collector;
pub mod platform;
pub mod store;

pub use collector::MetricsCollector;
pub use store::{MetricKind, MetricSeries, MetricStore};
