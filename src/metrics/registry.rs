//! Process-wide metric registry.
//!
//! One [`Metric`] instance per distinct name for the process lifetime,
//! created on first observation. The registry is also the rotation
//! coordinator: `rotate` resets every metric exactly once per interval
//! switch.

use crate::core::{Result, StatsError};
use crate::interval::Interval;
use crate::metrics::metric::{metric_id, Metric, MetricSnapshot};
use crate::metrics::types::MetricType;
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent registry of metrics keyed by their stable 64-bit id.
#[derive(Default)]
pub struct MetricRegistry {
    metrics: DashMap<u64, Arc<Metric>>,
}

impl MetricRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a metric by name, creating it against `window` on first
    /// observation.
    ///
    /// Re-registering an existing name with a different type is an error, as
    /// is the (pathological) case of two distinct names hashing to one id.
    pub fn lookup_or_create(
        &self,
        name: &str,
        kind: MetricType,
        window: Interval,
    ) -> Result<Arc<Metric>> {
        let id = metric_id(name);

        if let Some(existing) = self.metrics.get(&id) {
            if existing.name() != name {
                return Err(StatsError::MetricIdCollision {
                    name: name.to_string(),
                    existing: existing.name().to_string(),
                });
            }
            if existing.kind() != kind {
                return Err(StatsError::MetricTypeConflict {
                    name: name.to_string(),
                    existing: existing.kind().to_string(),
                    requested: kind.to_string(),
                });
            }
            return Ok(Arc::clone(&existing));
        }

        let entry = self
            .metrics
            .entry(id)
            .or_insert_with(|| Arc::new(Metric::new(name, kind, window)));

        // A racing creator may have inserted first; re-check its identity.
        if entry.name() != name {
            return Err(StatsError::MetricIdCollision {
                name: name.to_string(),
                existing: entry.name().to_string(),
            });
        }
        if entry.kind() != kind {
            return Err(StatsError::MetricTypeConflict {
                name: name.to_string(),
                existing: entry.kind().to_string(),
                requested: kind.to_string(),
            });
        }
        Ok(Arc::clone(&entry))
    }

    /// Look up an existing metric by name
    pub fn get(&self, name: &str) -> Option<Arc<Metric>> {
        self.metrics
            .get(&metric_id(name))
            .filter(|m| m.name() == name)
            .map(|m| Arc::clone(&m))
    }

    /// Reset every metric against the new interval and collect the closed
    /// snapshots. Called exactly once per rotation by a single coordinator.
    pub fn rotate(&self, interval: Interval) -> Vec<MetricSnapshot> {
        let mut snapshots = Vec::with_capacity(self.metrics.len());
        for entry in self.metrics.iter() {
            snapshots.push(entry.value().reset(interval));
        }
        snapshots
    }

    /// Number of registered metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
