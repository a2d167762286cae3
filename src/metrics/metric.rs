//! A single named time-series accumulator.
//!
//! Readers and producers see the currently accumulating window; the closed
//! window's aggregate is published as a [`MetricSnapshot`] by `reset` and
//! stays available through [`Metric::last_closed`].

use crate::interval::Interval;
use crate::metrics::types::{Accum, MetricType};
use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::sync::Arc;

/// Derive the stable 64-bit id for a metric name.
///
/// A pure function of the name bytes with no process-specific salt, so the
/// same name maps to the same id across restarts.
pub fn metric_id(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(name.as_bytes());
    hasher.finish()
}

/// One open accumulation window: immutable bounds plus the live accumulator
/// behind a narrow lock.
struct Window {
    start_ms: u64,
    end_ms: u64,
    state: Mutex<Accum>,
}

impl Window {
    fn new(start_ms: u64, end_ms: u64, acc: Accum) -> Self {
        Self {
            start_ms,
            end_ms,
            state: Mutex::new(acc),
        }
    }
}

/// A named metric accumulating values over the current interval.
///
/// `process` is safe to call from any number of producers; `reset` is called
/// exactly once per rotation by a single coordinator. The two are reconciled
/// by sealing and swapping the window: a producer that loses the race against
/// `reset` retries against the new window, so no update is lost or counted in
/// both windows.
pub struct Metric {
    id: u64,
    name: String,
    kind: MetricType,
    live: ArcSwap<Window>,
    last_closed: ArcSwapOption<MetricSnapshot>,
}

impl Metric {
    /// Create a metric whose first window is the given interval
    pub fn new(name: impl Into<String>, kind: MetricType, window: Interval) -> Self {
        let name = name.into();
        Self {
            id: metric_id(&name),
            name,
            kind,
            live: ArcSwap::from_pointee(Window::new(
                window.start_ms,
                window.end_ms,
                Accum::default(),
            )),
            last_closed: ArcSwapOption::const_empty(),
        }
    }

    /// The stable 64-bit metric id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The metric name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The metric type
    pub fn kind(&self) -> MetricType {
        self.kind
    }

    /// Process one raw value into the current window. Returns `self` for
    /// chaining.
    pub fn process(&self, value: i64) -> &Self {
        loop {
            let window = self.live.load_full();
            let mut state = window.state.lock();
            if state.sealed {
                // Reset swapped the window underneath us; retry on the new one.
                drop(state);
                std::hint::spin_loop();
                continue;
            }
            self.kind.update(&mut state, value);
            return self;
        }
    }

    /// Close the current window and open the next one.
    ///
    /// Single-coordinator only: must be called exactly once per rotation and
    /// never concurrently with another `reset`. Seals the live accumulator,
    /// snapshots it, swaps in the carried accumulator for the new window, and
    /// publishes the closed snapshot.
    pub fn reset(&self, window: Interval) -> MetricSnapshot {
        let old = self.live.load_full();
        let closed = {
            let mut state = old.state.lock();
            state.sealed = true;
            *state
        };

        let snapshot = MetricSnapshot {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            start_ms: old.start_ms,
            end_ms: old.end_ms,
            count: closed.count,
            average: closed.average,
            maximum: closed.maximum,
            minimum: closed.minimum,
        };

        let fresh = Window::new(window.start_ms, window.end_ms, self.kind.carry(&closed));
        self.live.store(Arc::new(fresh));
        self.last_closed.store(Some(Arc::new(snapshot.clone())));
        snapshot
    }

    /// The last fully-closed window's aggregate, if a rotation has happened
    pub fn last_closed(&self) -> Option<MetricSnapshot> {
        self.last_closed.load_full().map(|s| (*s).clone())
    }

    /// Event count of the currently accumulating window
    pub fn count(&self) -> u64 {
        self.live.load().state.lock().count
    }

    /// Mean of the currently accumulating window
    pub fn average(&self) -> f64 {
        self.live.load().state.lock().average
    }

    /// Maximum of the currently accumulating window (0 before any value)
    pub fn maximum(&self) -> i64 {
        self.live.load().state.lock().maximum
    }

    /// Minimum of the currently accumulating window (0 before any value)
    pub fn minimum(&self) -> i64 {
        self.live.load().state.lock().minimum
    }

    /// Start of the currently accumulating window
    pub fn start_time(&self) -> u64 {
        self.live.load().start_ms
    }

    /// End of the currently accumulating window
    pub fn end_time(&self) -> u64 {
        self.live.load().end_ms
    }
}

impl std::fmt::Debug for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let window = self.live.load();
        let state = *window.state.lock();
        f.debug_struct("Metric")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("start_ms", &window.start_ms)
            .field("end_ms", &window.end_ms)
            .field("count", &state.count)
            .field("average", &state.average)
            .field("maximum", &state.maximum)
            .field("minimum", &state.minimum)
            .finish()
    }
}

/// Immutable aggregate of one closed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// The stable metric id
    pub id: u64,
    /// The metric name
    pub name: String,
    /// The metric type
    pub kind: MetricType,
    /// Window start, milliseconds
    pub start_ms: u64,
    /// Window end, milliseconds
    pub end_ms: u64,
    /// Event count for the window
    pub count: u64,
    /// Mean of folded values
    pub average: f64,
    /// Maximum folded value
    pub maximum: i64,
    /// Minimum folded value
    pub minimum: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Interval {
        Interval::first(45_000, 15_000)
    }

    #[test]
    fn test_metric_id_is_stable() {
        let a = metric_id("requests.inflight");
        let b = metric_id("requests.inflight");
        assert_eq!(a, b);
        assert_ne!(a, metric_id("requests.completed"));
    }

    #[test]
    fn test_avg_process_and_read() {
        let metric = Metric::new("latency", MetricType::Avg, window());
        metric.process(10).process(20).process(30);

        assert_eq!(metric.count(), 3);
        assert_eq!(metric.average(), 20.0);
        assert_eq!(metric.maximum(), 30);
        assert_eq!(metric.minimum(), 10);
        assert_eq!(metric.start_time(), 45_000);
        assert_eq!(metric.end_time(), 59_999);
    }

    #[test]
    fn test_reset_clears_and_publishes_snapshot() {
        let metric = Metric::new("latency", MetricType::Avg, window());
        metric.process(10).process(20).process(30);

        let next = window().next(15_000);
        let snapshot = metric.reset(next);

        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.average, 20.0);
        assert_eq!(snapshot.start_ms, 45_000);
        assert_eq!(snapshot.end_ms, 59_999);

        assert_eq!(metric.count(), 0);
        assert_eq!(metric.average(), 0.0);
        assert_eq!(metric.maximum(), 0);
        assert_eq!(metric.minimum(), 0);
        assert_eq!(metric.start_time(), 60_000);
        assert_eq!(metric.last_closed().unwrap(), snapshot);
    }

    #[test]
    fn test_sticky_count_survives_reset() {
        let metric = Metric::new("sessions", MetricType::Sticky, window());
        metric.process(5).process(15);

        metric.reset(window().next(15_000));
        assert_eq!(metric.count(), 2);
        assert_eq!(metric.average(), 0.0);

        metric.process(100);
        assert_eq!(metric.count(), 3);
        assert_eq!(metric.average(), 100.0);
    }

    #[test]
    fn test_delta_metric_across_reset() {
        let metric = Metric::new("bytes.total", MetricType::Delta, window());
        metric.process(100).process(105).process(103);

        assert_eq!(metric.count(), 2);
        assert_eq!(metric.average(), 1.5);
        assert_eq!(metric.maximum(), 5);
        assert_eq!(metric.minimum(), -2);

        metric.reset(window().next(15_000));
        // Baseline does not survive: the next reading contributes nothing.
        metric.process(200);
        assert_eq!(metric.count(), 0);
        metric.process(210);
        assert_eq!(metric.count(), 1);
        assert_eq!(metric.average(), 10.0);
    }

    #[test]
    fn test_interval_count_reset() {
        let metric = Metric::new("hits", MetricType::IntervalCount, window());
        metric.process(1).process(1).process(1);
        assert_eq!(metric.count(), 3);

        metric.reset(window().next(15_000));
        assert_eq!(metric.count(), 0);
    }

    #[test]
    fn test_concurrent_process_with_reset_loses_nothing() {
        use std::sync::Arc;

        const PRODUCERS: usize = 8;
        const PER_PRODUCER: u64 = 5_000;

        let metric = Arc::new(Metric::new("contended", MetricType::Avg, window()));
        let barrier = Arc::new(std::sync::Barrier::new(PRODUCERS + 1));

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let metric = Arc::clone(&metric);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    for v in 0..PER_PRODUCER {
                        metric.process(v as i64);
                    }
                })
            })
            .collect();

        barrier.wait();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let snapshot = metric.reset(window().next(15_000));

        for handle in handles {
            handle.join().unwrap();
        }

        let total = snapshot.count + metric.count();
        assert_eq!(total, PRODUCERS as u64 * PER_PRODUCER);
    }
}
