use std::sync::{atomic::AtomicU64, Arc};

use atomic::Ordering;
use crossbeam_utils::CachePadded;
use once_cell::sync::OnceCell;

use crate::{
    clock::CurrentTimeCallback,
    config::SchedulerConfig,
    error::SchedulerError,
    statistics::StatisticsCounters,
};

/// Callback that asks the collector for a cycle. Runs on whichever mutator thread made the
/// decision, possibly on several at once, so it must be cheap and idempotent.
pub type ScheduleGcCallback = Arc<dyn Fn() + Send + Sync>;

/// Why a collection was requested.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GcTrigger {
    /// A single thread allocated more than `allocation_threshold_bytes` since its last reset.
    Allocation = 0,
    /// At least `cooldown_threshold_ns` passed since the last completed collection.
    Cooldown = 1,
}

impl std::fmt::Display for GcTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allocation => write!(f, "allocation"),
            Self::Cooldown => write!(f, "cooldown"),
        }
    }
}

/// Global half of the scheduler, shared by all mutator threads.
pub struct GlobalCoordinator {
    config: Arc<SchedulerConfig>,
    current_time_ns: CurrentTimeCallback,
    time_of_last_gc_ns: CachePadded<AtomicU64>,
    schedule_gc: OnceCell<ScheduleGcCallback>,
    pub(crate) stats: Arc<StatisticsCounters>,
}

impl GlobalCoordinator {
    pub fn new(config: Arc<SchedulerConfig>, current_time_ns: CurrentTimeCallback) -> Self {
        let now = current_time_ns();
        Self {
            config,
            current_time_ns,
            time_of_last_gc_ns: CachePadded::new(AtomicU64::new(now)),
            schedule_gc: OnceCell::new(),
            stats: Arc::new(StatisticsCounters::new()),
        }
    }

    /// Decides whether the signal from a mutator thread warrants a collection, and requests
    /// one if so. May be called by different threads concurrently.
    ///
    /// Nothing is deduplicated here: if several threads decide at the same time, each of
    /// them invokes the callback.
    pub fn on_safe_point(
        &self,
        allocated_bytes: usize,
        safepoints_counter: usize,
    ) -> Option<GcTrigger> {
        let schedule_gc = self.schedule_gc();
        let trigger = self.should_collect(allocated_bytes);
        self.stats.signal(trigger);
        match trigger {
            Some(trigger) => {
                log::debug!(
                    target: "gc",
                    "requesting GC ({}): allocated={} safepoints={}",
                    trigger,
                    allocated_bytes,
                    safepoints_counter
                );
                schedule_gc();
            }
            None => log::trace!(
                target: "gc",
                "no GC: allocated={} safepoints={}",
                allocated_bytes,
                safepoints_counter
            ),
        }
        trigger
    }

    /// Always called by the thread that just finished a collection.
    pub fn on_perform_full_gc(&self) {
        runtime_assert!(self.is_schedule_gc_set(), SchedulerError::ScheduleGcNotSet);
        let now = (self.current_time_ns)();
        self.time_of_last_gc_ns.store(now, Ordering::Release);
        self.stats.collection();
        log::debug!(target: "gc", "GC finished at {}ns", now);
    }

    /// Registers the collection request callback. Aborts if one is already registered.
    pub fn set_schedule_gc<F>(&self, schedule_gc: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if let Err(err) = self.try_set_schedule_gc(schedule_gc) {
            crate::error::fatal(err);
        }
    }

    pub fn try_set_schedule_gc<F>(&self, schedule_gc: F) -> Result<(), SchedulerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule_gc
            .set(Arc::new(schedule_gc))
            .map_err(|_| SchedulerError::ScheduleGcAlreadySet)
    }

    pub fn is_schedule_gc_set(&self) -> bool {
        self.schedule_gc.get().is_some()
    }

    pub fn time_of_last_gc_ns(&self) -> u64 {
        self.time_of_last_gc_ns.load(Ordering::Acquire)
    }

    /// Nanoseconds since the last completed collection (or since construction).
    pub fn time_since_last_gc_ns(&self) -> u64 {
        (self.current_time_ns)().saturating_sub(self.time_of_last_gc_ns())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn schedule_gc(&self) -> &ScheduleGcCallback {
        match self.schedule_gc.get() {
            Some(callback) => callback,
            None => crate::error::fatal(SchedulerError::ScheduleGcNotSet),
        }
    }

    // A reader racing with `on_perform_full_gc` may see a mark newer than its own `now`;
    // that counts as zero elapsed time.
    fn should_collect(&self, allocated_bytes: usize) -> Option<GcTrigger> {
        if allocated_bytes > self.config.allocation_threshold_bytes() {
            return Some(GcTrigger::Allocation);
        }
        if self.time_since_last_gc_ns() >= self.config.cooldown_threshold_ns() {
            return Some(GcTrigger::Cooldown);
        }
        None
    }
}
