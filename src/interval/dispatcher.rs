//! Fan-out of rotation events to registered listeners.
//!
//! Each rotation runs every listener on a fresh blocking task: a stuck or
//! panicking listener cannot block other listeners, the scheduler, or
//! subsequent rotations.

use crate::interval::Interval;
use parking_lot::RwLock;
use std::sync::Arc;

/// Observer of interval rotations.
///
/// `on_rotate` receives the newly published interval by value; it may block,
/// so it always runs on the blocking pool.
pub trait IntervalListener: Send + Sync {
    /// Listener identity used in fault logs
    fn name(&self) -> &str;

    /// Called exactly once per rotation with the new interval
    fn on_rotate(&self, interval: Interval);
}

/// Holds the subscribed listeners and fans each rotation out to all of them.
#[derive(Default)]
pub struct ListenerDispatcher {
    listeners: RwLock<Vec<Arc<dyn IntervalListener>>>,
}

impl ListenerDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener. Idempotent: subscribing the same `Arc` twice
    /// does not produce duplicate invocations.
    pub fn subscribe(&self, listener: Arc<dyn IntervalListener>) {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return;
        }
        tracing::debug!(listener = listener.name(), "subscribed interval listener");
        listeners.push(listener);
    }

    /// Number of subscribed listeners
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether any listeners are subscribed
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Dispatch a rotation to all listeners without waiting for any of them.
    ///
    /// Every listener gets its own spawned task per rotation; a listener that
    /// never returns only leaks its own task. Panics are caught at the task
    /// boundary and logged with the listener identity and interval id.
    pub fn dispatch(&self, interval: Interval) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            tokio::spawn(async move {
                let name = listener.name().to_string();
                let worker =
                    tokio::task::spawn_blocking(move || listener.on_rotate(interval));
                if let Err(err) = worker.await {
                    if err.is_panic() {
                        tracing::warn!(
                            listener = %name,
                            interval_id = interval.id,
                            "interval listener panicked during rotation"
                        );
                    }
                }
            });
        }
    }
}
