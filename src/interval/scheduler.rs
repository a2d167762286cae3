//! The interval timing loop.
//!
//! A single long-lived tokio task owns the rotation cadence: it waits out the
//! remainder of the current window, then fires once per period. Dispatch is
//! spawn-and-forget, so slow listeners never delay the next rotation.

use crate::clock::ClockSource;
use crate::core::{Result, StatsError};
use crate::interval::{Interval, ListenerDispatcher};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owns the current [`Interval`] and rotates it on a fixed period.
///
/// The period is fixed for the scheduler's lifetime; changing it requires
/// constructing a new scheduler.
pub struct IntervalScheduler {
    clock: Arc<ClockSource>,
    dispatcher: Arc<ListenerDispatcher>,
    period_ms: u64,
    current: Arc<ArcSwap<Interval>>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for IntervalScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalScheduler")
            .field("period_ms", &self.period_ms)
            .finish_non_exhaustive()
    }
}

impl IntervalScheduler {
    /// Create a scheduler with the first interval computed from the clock.
    ///
    /// Rejects periods shorter than 1ms.
    pub fn new(
        clock: Arc<ClockSource>,
        dispatcher: Arc<ListenerDispatcher>,
        period: Duration,
    ) -> Result<Self> {
        let period_ms = period.as_millis() as u64;
        if period_ms < 1 {
            return Err(StatsError::InvalidPeriod(period_ms));
        }

        let first = Interval::first(clock.now_millis(), period_ms);
        Ok(Self {
            clock,
            dispatcher,
            period_ms,
            current: Arc::new(ArcSwap::from_pointee(first)),
            shutdown_tx: watch::channel(false).0,
            task: Mutex::new(None),
        })
    }

    /// The currently open interval
    pub fn current(&self) -> Interval {
        **self.current.load()
    }

    /// The fixed rotation period in milliseconds
    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// The dispatcher rotations are fanned out through
    pub fn dispatcher(&self) -> &Arc<ListenerDispatcher> {
        &self.dispatcher
    }

    /// Whether the timing loop has been started and not yet shut down
    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Start the timing loop. Starting an already-running scheduler is a
    /// no-op.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let current = Arc::clone(&self.current);
        let dispatcher = Arc::clone(&self.dispatcher);
        let period_ms = self.period_ms;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        // Wait out the remainder of the first window so the first rotation
        // lands on the window boundary, then tick once per period. Missed
        // ticks burst to catch up rather than skipping intervals.
        let now = self.clock.now_millis();
        let first_fire = self.current.load().end_ms.saturating_sub(now) + 1;

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + Duration::from_millis(first_fire);
            let mut ticker = tokio::time::interval_at(start, Duration::from_millis(period_ms));

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let next = current.load().next(period_ms);
                        current.store(Arc::new(next));
                        tracing::debug!(
                            interval_id = next.id,
                            start_ms = next.start_ms,
                            end_ms = next.end_ms,
                            "interval rotated"
                        );
                        dispatcher.dispatch(next);
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::debug!("interval scheduler stopping");
                        break;
                    }
                }
            }
        });

        *task = Some(handle);
    }

    /// Stop the timing loop and wait for it to exit. In-flight listener
    /// tasks are not interrupted; no further rotations fire.
    pub async fn shutdown(&self) -> Result<()> {
        let handle = self.task.lock().take().ok_or(StatsError::NotRunning)?;
        let _ = self.shutdown_tx.send(true);
        handle.await?;
        Ok(())
    }
}
