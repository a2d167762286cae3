//! The built-in rotation observer: reads-then-resets every metric and
//! appends the closed aggregates to the journal.

use crate::interval::{Interval, IntervalListener};
use crate::journal::{AppendSink, Journal};
use crate::metrics::{MetricRegistry, MetricSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One persisted aggregate: the closed window's snapshot tagged with the
/// interval id it closed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Id of the interval the snapshot was aggregated over
    pub interval_id: u64,
    /// The closed window's aggregate
    pub snapshot: MetricSnapshot,
}

impl JournalRecord {
    /// Encode the record for appending
    pub fn encode(&self) -> crate::core::Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a record read back from the journal
    pub fn decode(bytes: &[u8]) -> crate::core::Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Interval listener that persists every metric's closed window.
///
/// This is the single rotation coordinator for its registry: each `on_rotate`
/// resets every metric exactly once against the new interval. An append
/// failure is logged per record and does not abort the remaining snapshots.
pub struct SnapshotRecorder<S: AppendSink = Journal> {
    registry: Arc<MetricRegistry>,
    journal: Arc<S>,
}

impl<S: AppendSink> SnapshotRecorder<S> {
    /// Create a recorder over a registry and an append sink
    pub fn new(registry: Arc<MetricRegistry>, journal: Arc<S>) -> Self {
        Self { registry, journal }
    }
}

impl<S: AppendSink> IntervalListener for SnapshotRecorder<S> {
    fn name(&self) -> &str {
        "snapshot-recorder"
    }

    fn on_rotate(&self, interval: Interval) {
        // `interval` is the newly opened window; the snapshots describe the
        // one that just closed.
        let closed_id = interval.id.wrapping_sub(1);
        let snapshots = self.registry.rotate(interval);

        for snapshot in snapshots {
            let record = JournalRecord {
                interval_id: closed_id,
                snapshot,
            };
            let appended = record
                .encode()
                .and_then(|bytes| self.journal.append_record(&bytes));
            match appended {
                Ok(index) => tracing::trace!(
                    metric = %record.snapshot.name,
                    record = index,
                    interval_id = closed_id,
                    "persisted interval aggregate"
                ),
                Err(err) => tracing::error!(
                    metric = %record.snapshot.name,
                    interval_id = closed_id,
                    category = err.category(),
                    error = %err,
                    "failed to persist interval aggregate"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricType;
    use tempfile::TempDir;

    fn window() -> Interval {
        Interval::first(45_000, 15_000)
    }

    #[test]
    fn test_record_round_trip() {
        let record = JournalRecord {
            interval_id: 7,
            snapshot: MetricSnapshot {
                id: crate::metrics::metric_id("latency"),
                name: "latency".to_string(),
                kind: MetricType::Avg,
                start_ms: 45_000,
                end_ms: 59_999,
                count: 3,
                average: 20.0,
                maximum: 30,
                minimum: 10,
            },
        };

        let bytes = record.encode().unwrap();
        assert_eq!(JournalRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_rotation_persists_each_metric() {
        let dir = TempDir::new().unwrap();
        let journal = Arc::new(Journal::open(dir.path(), "stats", 16).unwrap());
        let registry = Arc::new(MetricRegistry::new());

        let metric = registry
            .lookup_or_create("latency", MetricType::Avg, window())
            .unwrap();
        metric.process(10).process(20).process(30);
        registry
            .lookup_or_create("hits", MetricType::IntervalCount, window())
            .unwrap()
            .process(1);

        let recorder = SnapshotRecorder::new(Arc::clone(&registry), Arc::clone(&journal));
        recorder.on_rotate(window().next(15_000));

        assert_eq!(journal.entry_count(), 2);
        let mut decoded: Vec<JournalRecord> = (1..=2)
            .map(|i| JournalRecord::decode(&journal.read(i).unwrap()).unwrap())
            .collect();
        decoded.sort_by(|a, b| a.snapshot.name.cmp(&b.snapshot.name));

        assert_eq!(decoded[0].snapshot.name, "hits");
        assert_eq!(decoded[0].snapshot.count, 1);
        assert_eq!(decoded[1].snapshot.name, "latency");
        assert_eq!(decoded[1].snapshot.average, 20.0);
        assert_eq!(decoded[1].interval_id, 0);

        // The live windows were reset against the new interval.
        assert_eq!(metric.count(), 0);
        assert_eq!(metric.start_time(), 60_000);
    }

    #[test]
    fn test_append_failure_does_not_abort_remaining_snapshots() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct FailingSink {
            journal: Arc<Journal>,
            failures: AtomicUsize,
        }

        // Rejects appends for one metric, passes everything else through.
        impl AppendSink for FailingSink {
            fn append_record(&self, bytes: &[u8]) -> crate::core::Result<u64> {
                let record = JournalRecord::decode(bytes)?;
                if record.snapshot.name == "doomed" {
                    self.failures.fetch_add(1, Ordering::SeqCst);
                    return Err(crate::core::StatsError::journal("disk full"));
                }
                self.journal.append(bytes)
            }
        }

        let dir = TempDir::new().unwrap();
        let journal = Arc::new(Journal::open(dir.path(), "stats", 16).unwrap());
        let registry = Arc::new(MetricRegistry::new());
        for name in ["alpha", "doomed", "omega"] {
            registry
                .lookup_or_create(name, MetricType::IntervalCount, window())
                .unwrap()
                .process(1);
        }

        let sink = Arc::new(FailingSink {
            journal: Arc::clone(&journal),
            failures: AtomicUsize::new(0),
        });
        let recorder = SnapshotRecorder::new(Arc::clone(&registry), Arc::clone(&sink));
        recorder.on_rotate(window().next(15_000));

        assert_eq!(sink.failures.load(Ordering::SeqCst), 1);
        // The failed record never reached the journal, so the durable count
        // reflects only the two successful appends.
        assert_eq!(journal.entry_count(), 2);
        let mut names: Vec<String> = (1..=2)
            .map(|i| {
                JournalRecord::decode(&journal.read(i).unwrap())
                    .unwrap()
                    .snapshot
                    .name
            })
            .collect();
        names.sort();
        assert_eq!(names, ["alpha", "omega"]);

        // Every metric was still reset, including the one whose append failed.
        let doomed = registry.get("doomed").unwrap();
        assert_eq!(doomed.count(), 0);
        assert_eq!(doomed.start_time(), 60_000);
    }
}
