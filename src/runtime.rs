//! Explicitly owned runtime tying the clock, scheduler, registry, and
//! journal together.

use crate::clock::ClockSource;
use crate::core::{Config, Result};
use crate::interval::{Interval, IntervalScheduler, ListenerDispatcher};
use crate::journal::{Journal, SnapshotRecorder};
use crate::metrics::{Metric, MetricRegistry, MetricType};
use std::sync::Arc;

/// A running tickstats instance.
///
/// Construct one at process startup and shut it down at teardown; all
/// producers and observers borrow from it. There is no implicit global
/// instance.
pub struct StatsRuntime {
    clock: Arc<ClockSource>,
    registry: Arc<MetricRegistry>,
    journal: Arc<Journal>,
    scheduler: Arc<IntervalScheduler>,
}

impl StatsRuntime {
    /// Validate the configuration, open the journal, and start the interval
    /// scheduler with the built-in snapshot recorder subscribed.
    ///
    /// A journal that cannot be opened aborts startup; there is no degraded
    /// mode without persistence.
    pub fn start(config: Config) -> Result<Self> {
        config.validate()?;

        let journal = Arc::new(Journal::open(
            &config.journal.data_dir,
            &config.journal.name,
            config.journal.size_hint,
        )?);
        let clock = Arc::new(ClockSource::from_mode(config.clock));
        let registry = Arc::new(MetricRegistry::new());
        let dispatcher = Arc::new(ListenerDispatcher::new());

        dispatcher.subscribe(Arc::new(SnapshotRecorder::new(
            Arc::clone(&registry),
            Arc::clone(&journal),
        )));

        let scheduler = Arc::new(IntervalScheduler::new(
            Arc::clone(&clock),
            dispatcher,
            config.interval.period,
        )?);
        scheduler.start();

        tracing::info!(
            period_ms = config.period_ms(),
            journal = %config.journal.name,
            "stats runtime started"
        );

        Ok(Self {
            clock,
            registry,
            journal,
            scheduler,
        })
    }

    /// Look up or create a metric against the currently open interval
    pub fn metric(&self, name: &str, kind: MetricType) -> Result<Arc<Metric>> {
        self.registry
            .lookup_or_create(name, kind, self.scheduler.current())
    }

    /// The currently open interval
    pub fn current_interval(&self) -> Interval {
        self.scheduler.current()
    }

    /// Register an observer for interval rotations
    pub fn subscribe(&self, listener: Arc<dyn crate::interval::IntervalListener>) {
        self.scheduler.dispatcher().subscribe(listener);
    }

    /// The shared clock source
    pub fn clock(&self) -> &Arc<ClockSource> {
        &self.clock
    }

    /// The metric registry
    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// The aggregate journal
    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    /// The interval scheduler
    pub fn scheduler(&self) -> &Arc<IntervalScheduler> {
        &self.scheduler
    }

    /// Stop rotations and sync the journal. In-flight listener invocations
    /// are left to finish on the blocking pool.
    pub async fn shutdown(&self) -> Result<()> {
        self.scheduler.shutdown().await?;
        self.journal.sync()?;
        tracing::info!("stats runtime stopped");
        Ok(())
    }
}
