//! Time sources for the interval scheduler.
//!
//! The active clock is shared, rarely-changed state: reads are wait-free
//! through an [`ArcSwap`], swaps are visible to subsequent reads.

pub mod timer;

pub use timer::{Elapsed, Timer};

use crate::core::ClockMode;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Round a millisecond timestamp down to a period boundary.
///
/// `period_ms` must be nonzero; callers validate periods before scheduling.
pub fn round_down(time_ms: u64, period_ms: u64) -> u64 {
    debug_assert!(period_ms > 0, "period must be nonzero");
    time_ms - (time_ms % period_ms)
}

/// A clock implementation, dispatched by variant.
#[derive(Debug, Clone)]
pub enum Clock {
    /// Wall-clock milliseconds since the Unix epoch
    Wall,
    /// Process start wall time plus elapsed monotonic time. Monotonic under
    /// wall-clock skew, at the cost of wall-clock accuracy.
    Offset {
        /// Wall time captured at construction
        start_wall_ms: u64,
        /// Monotonic reference captured at construction
        start: Instant,
    },
    /// Manually driven time for deterministic tests
    Test(Arc<AtomicU64>),
}

impl Clock {
    /// A wall clock
    pub fn wall() -> Self {
        Clock::Wall
    }

    /// An offset clock anchored at the current instant
    pub fn offset() -> Self {
        Clock::Offset {
            start_wall_ms: wall_millis(),
            start: Instant::now(),
        }
    }

    /// A test clock starting at 0, with a handle to drive it
    pub fn test() -> (Self, TestClockHandle) {
        let time = Arc::new(AtomicU64::new(0));
        (Clock::Test(Arc::clone(&time)), TestClockHandle { time })
    }

    /// The current time in milliseconds according to this clock
    pub fn now_millis(&self) -> u64 {
        match self {
            Clock::Wall => wall_millis(),
            Clock::Offset { start_wall_ms, start } => {
                start_wall_ms + start.elapsed().as_millis() as u64
            },
            Clock::Test(time) => time.load(Ordering::Acquire),
        }
    }
}

/// Handle for driving a [`Clock::Test`] instance.
#[derive(Debug, Clone)]
pub struct TestClockHandle {
    time: Arc<AtomicU64>,
}

impl TestClockHandle {
    /// Set the test time to an absolute value
    pub fn set(&self, millis: u64) -> u64 {
        self.time.store(millis, Ordering::Release);
        millis
    }

    /// Advance the test time by one millisecond
    pub fn tick(&self) -> u64 {
        self.time.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// The process-wide time source. Holds the active [`Clock`] behind an
/// atomically swapped reference so readers never block.
#[derive(Debug)]
pub struct ClockSource {
    inner: ArcSwap<Clock>,
}

impl ClockSource {
    /// Create a clock source with the given starting clock
    pub fn new(clock: Clock) -> Self {
        Self {
            inner: ArcSwap::from_pointee(clock),
        }
    }

    /// Create a clock source from a configured mode
    pub fn from_mode(mode: ClockMode) -> Self {
        match mode {
            ClockMode::Wall => Self::new(Clock::wall()),
            ClockMode::Offset => Self::new(Clock::offset()),
        }
    }

    /// The current time in milliseconds
    pub fn now_millis(&self) -> u64 {
        self.inner.load().now_millis()
    }

    /// The current time rounded down to a period boundary.
    /// `period_ms` must be nonzero.
    pub fn round_down(&self, period_ms: u64) -> u64 {
        round_down(self.now_millis(), period_ms)
    }

    /// Swap the active clock implementation. Safe to call concurrently with
    /// readers; in-flight reads keep the clock they loaded.
    pub fn swap(&self, clock: Clock) {
        self.inner.store(Arc::new(clock));
    }
}

impl Default for ClockSource {
    fn default() -> Self {
        Self::new(Clock::wall())
    }
}

fn wall_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
