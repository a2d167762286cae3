//! Fixed-duration aggregation windows and their rotation machinery.

pub mod dispatcher;
pub mod scheduler;

pub use dispatcher::{IntervalListener, ListenerDispatcher};
pub use scheduler::IntervalScheduler;

use serde::{Deserialize, Serialize};

/// A fixed-duration time window over which metric values are aggregated.
///
/// Intervals are immutable values: rotation publishes a new instance rather
/// than editing the current one, so any holder of an `Interval` observes
/// consistent start/end times forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Sequential window id, wrapping to 0 past `u64::MAX`
    pub id: u64,
    /// Inclusive window start, milliseconds
    pub start_ms: u64,
    /// Inclusive window end, `start_ms + period - 1`
    pub end_ms: u64,
}

impl Interval {
    /// The first interval: `now` rounded down to a period boundary, id 0.
    /// `period_ms` must be nonzero.
    pub fn first(now_ms: u64, period_ms: u64) -> Self {
        let start_ms = crate::clock::round_down(now_ms, period_ms);
        Self {
            id: 0,
            start_ms,
            end_ms: start_ms + period_ms - 1,
        }
    }

    /// The interval following this one: starts right after this window ends,
    /// id incremented by one.
    pub fn next(&self, period_ms: u64) -> Self {
        let start_ms = self.end_ms + 1;
        Self {
            id: self.id.wrapping_add(1),
            start_ms,
            end_ms: start_ms + period_ms - 1,
        }
    }

    /// Whether a timestamp falls inside this window
    pub fn contains(&self, time_ms: u64) -> bool {
        time_ms >= self.start_ms && time_ms <= self.end_ms
    }

    /// The window length in milliseconds
    pub fn period_ms(&self) -> u64 {
        self.end_ms - self.start_ms + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_rounds_down() {
        let interval = Interval::first(47_350, 15_000);
        assert_eq!(interval.id, 0);
        assert_eq!(interval.start_ms, 45_000);
        assert_eq!(interval.start_ms, crate::clock::round_down(47_350, 15_000));
        assert_eq!(interval.end_ms, 59_999);
        assert_eq!(interval.period_ms(), 15_000);
    }

    #[test]
    fn test_next_is_contiguous() {
        let first = Interval::first(45_000, 15_000);
        let second = first.next(15_000);
        assert_eq!(second.id, 1);
        assert_eq!(second.start_ms, first.end_ms + 1);
        assert_eq!(second.end_ms, second.start_ms + 14_999);
    }

    #[test]
    fn test_kth_start_is_arithmetic() {
        for period in [1u64, 250, 15_000] {
            let mut interval = Interval::first(1_000_000, period);
            let base = interval.start_ms;
            for k in 1..=50u64 {
                interval = interval.next(period);
                assert_eq!(interval.start_ms, base + k * period);
                assert_eq!(interval.id, k);
            }
        }
    }

    #[test]
    fn test_id_wraps_to_zero() {
        let interval = Interval {
            id: u64::MAX,
            start_ms: 0,
            end_ms: 999,
        };
        assert_eq!(interval.next(1_000).id, 0);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let interval = Interval::first(45_000, 15_000);
        assert!(interval.contains(45_000));
        assert!(interval.contains(59_999));
        assert!(!interval.contains(60_000));
        assert!(!interval.contains(44_999));
    }
}
