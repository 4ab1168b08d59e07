use std::sync::Arc;

use crate::{
    clock::{monotonic_clock, CurrentTimeCallback},
    config::SchedulerConfig,
    gc_data::GlobalCoordinator,
    statistics::SchedulerStatistics,
    thread_data::ThreadCounters,
};

/// Decides when a collection should be requested.
///
/// Owns the process-wide [SchedulerConfig] and [GlobalCoordinator] and hands out one
/// [ThreadCounters] per mutator thread. The scheduler never collects by itself: it calls the
/// callback registered with [Scheduler::set_schedule_gc] and expects the collector to call
/// [GlobalCoordinator::on_perform_full_gc] after every cycle.
pub struct Scheduler {
    config: Arc<SchedulerConfig>,
    gc_data: Arc<GlobalCoordinator>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self::with_config_and_clock(config, monotonic_clock())
    }

    pub fn with_config_and_clock(config: SchedulerConfig, clock: CurrentTimeCallback) -> Self {
        let config = Arc::new(config);
        logln_if!(config.verbose(), "GC scheduler created: {:?}", config);
        Self {
            gc_data: Arc::new(GlobalCoordinator::new(config.clone(), clock)),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn gc_data(&self) -> &GlobalCoordinator {
        &self.gc_data
    }

    /// Creates counters for a newly registered mutator thread. The result belongs to that
    /// thread; dropping it deregisters the thread.
    pub fn new_thread_data(&self) -> ThreadCounters {
        let gc_data = self.gc_data.clone();
        ThreadCounters::new(
            self.config.clone(),
            Box::new(move |allocated_bytes, safepoints_counter| {
                gc_data.on_safe_point(allocated_bytes, safepoints_counter);
            }),
        )
        .attach(self.gc_data.stats.clone())
    }

    /// Can only be called once, before any mutator starts hitting safepoints.
    pub fn set_schedule_gc<F>(&self, schedule_gc: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.gc_data.set_schedule_gc(schedule_gc);
    }

    pub fn statistics(&self) -> SchedulerStatistics {
        self.gc_data.stats.snapshot(
            self.config.allocation_threshold_bytes(),
            self.gc_data.time_since_last_gc_ns(),
        )
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
