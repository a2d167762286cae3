//! tickstats - interval-based metric aggregation with a durable journal.
//!
//! tickstats collects numeric metrics from a running process, aggregates
//! them over fixed time windows, and rotates the window on a fixed period.
//! Each rotation hands the just-closed window's aggregates to registered
//! observers and appends them to a durable append-only journal.
//!
//! # Architecture
//!
//! - `clock`: swappable time sources and elapsed-time measurement
//! - `interval`: the window value type, rotation scheduler, and listener
//!   dispatch
//! - `metrics`: typed accumulators and the process-wide registry
//! - `journal`: the append-only log with a durable entry count
//! - `runtime`: lifecycle wiring, explicitly constructed and owned
//!
//! # Example
//!
//! ```no_run
//! use tickstats::core::ConfigBuilder;
//! use tickstats::metrics::MetricType;
//! use tickstats::runtime::StatsRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigBuilder::new().build()?;
//!     let runtime = StatsRuntime::start(config)?;
//!
//!     let latency = runtime.metric("request.latency", MetricType::Avg)?;
//!     latency.process(12).process(18);
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod clock;
pub mod core;
pub mod interval;
pub mod journal;
pub mod metrics;
pub mod runtime;

// Re-export core types for convenience
pub use crate::core::{Config, ConfigBuilder, Result, StatsError};
pub use crate::interval::Interval;
pub use crate::metrics::{Metric, MetricType};
pub use crate::runtime::StatsRuntime;
