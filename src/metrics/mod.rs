//! The metric aggregation model: typed accumulators, windows, and the
//! process-wide registry.

pub mod metric;
pub mod registry;
pub mod types;

pub use metric::{metric_id, Metric, MetricSnapshot};
pub use registry::MetricRegistry;
pub use types::MetricType;
