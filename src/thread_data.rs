//! Per-thread safepoint and allocation counters.
//!
//! Compiled code calls [ThreadCounters::on_safepoint_regular] on function epilogues, loop
//! back-edges and exception unwinding, and the allocator calls
//! [ThreadCounters::on_safepoint_allocation] for every allocation. Both are a single add and
//! a single compare against a thread-private snapshot of the thresholds. Only when a
//! threshold is crossed does the thread leave its own state and signal the
//! [GlobalCoordinator](crate::gc_data::GlobalCoordinator).

use std::sync::Arc;

use crate::{config::SchedulerConfig, statistics::StatisticsCounters};

pub const FUNCTION_EPILOGUE_WEIGHT: usize = 1;
pub const LOOP_BODY_WEIGHT: usize = 1;
pub const EXCEPTION_UNWIND_WEIGHT: usize = 1;

/// Invoked from the slow path with `(allocated_bytes, safepoints_counter)` as they were
/// when the threshold was crossed.
pub type OnSafePointCallback = Box<dyn FnMut(usize, usize) + Send>;

/// Counters owned by a single mutator thread.
///
/// Not `Sync` and not `Clone`: exactly one thread mutates it. Dropping it is the thread's
/// deregistration.
pub struct ThreadCounters {
    config: Arc<SchedulerConfig>,
    on_safe_point: OnSafePointCallback,
    stats: Option<Arc<StatisticsCounters>>,
    aggressive: bool,

    allocated_bytes: usize,
    allocated_bytes_threshold: usize,
    safepoints_counter: usize,
    safepoints_counter_threshold: usize,
}

impl ThreadCounters {
    pub fn new(config: Arc<SchedulerConfig>, on_safe_point: OnSafePointCallback) -> Self {
        let aggressive = config.aggressive();
        let mut this = Self {
            config,
            on_safe_point,
            stats: None,
            aggressive,
            allocated_bytes: 0,
            allocated_bytes_threshold: 0,
            safepoints_counter: 0,
            safepoints_counter_threshold: 0,
        };
        this.clear_counters_and_update_thresholds();
        this
    }

    pub(crate) fn attach(mut self, stats: Arc<StatisticsCounters>) -> Self {
        stats.thread_attached();
        self.stats = Some(stats);
        self
    }

    /// Should be called on encountering a safepoint placed by the compiler.
    ///
    /// Counting is only enabled in aggressive mode; ordinary builds trigger on allocation only.
    #[inline(always)]
    pub fn on_safepoint_regular(&mut self, weight: usize) {
        if self.aggressive {
            self.safepoints_counter = self.safepoints_counter.saturating_add(weight);
            if self.safepoints_counter < self.safepoints_counter_threshold {
                return;
            }
            self.on_safe_point_slow_path();
        }
    }

    /// Should be called on encountering a safepoint placed by the allocator.
    #[inline(always)]
    pub fn on_safepoint_allocation(&mut self, size: usize) {
        self.allocated_bytes = self.allocated_bytes.saturating_add(size);
        if self.allocated_bytes < self.allocated_bytes_threshold {
            return;
        }
        self.on_safe_point_slow_path();
    }

    /// Called by the owning thread once it has been stopped for a collection.
    pub fn on_stopped_for_gc(&mut self) {
        self.clear_counters_and_update_thresholds();
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    pub fn allocated_bytes_threshold(&self) -> usize {
        self.allocated_bytes_threshold
    }

    pub fn safepoints_counter(&self) -> usize {
        self.safepoints_counter
    }

    pub fn safepoints_counter_threshold(&self) -> usize {
        self.safepoints_counter_threshold
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // The callback must see the values that crossed the threshold, and the reset must
    // happen before the next fast-path call.
    #[cold]
    #[inline(never)]
    fn on_safe_point_slow_path(&mut self) {
        log::trace!(
            target: "gc",
            "safepoint slow path: allocated={} safepoints={}",
            self.allocated_bytes,
            self.safepoints_counter
        );
        (self.on_safe_point)(self.allocated_bytes, self.safepoints_counter);
        self.clear_counters_and_update_thresholds();
    }

    fn clear_counters_and_update_thresholds(&mut self) {
        self.allocated_bytes = 0;
        self.safepoints_counter = 0;

        self.allocated_bytes_threshold = self.config.allocation_threshold_bytes();
        self.safepoints_counter_threshold = self.config.threshold();
    }
}

impl Drop for ThreadCounters {
    fn drop(&mut self) {
        if let Some(stats) = self.stats.take() {
            stats.thread_detached();
        }
    }
}

impl std::fmt::Debug for ThreadCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadCounters")
            .field("allocated_bytes", &self.allocated_bytes)
            .field("allocated_bytes_threshold", &self.allocated_bytes_threshold)
            .field("safepoints_counter", &self.safepoints_counter)
            .field(
                "safepoints_counter_threshold",
                &self.safepoints_counter_threshold,
            )
            .field("aggressive", &self.aggressive)
            .finish()
    }
}
