use std::sync::atomic::AtomicUsize;

use atomic::{Atomic, Ordering};

use crate::gc_data::GcTrigger;

/// Counters shared by the coordinator and every [ThreadCounters](crate::thread_data::ThreadCounters).
/// Only touched on slow paths.
pub(crate) struct StatisticsCounters {
    signals: AtomicUsize,
    allocation_triggers: AtomicUsize,
    cooldown_triggers: AtomicUsize,
    collections: AtomicUsize,
    threads_registered: AtomicUsize,
    live_threads: AtomicUsize,
    last_trigger: Atomic<Option<GcTrigger>>,
}

impl StatisticsCounters {
    pub(crate) fn new() -> Self {
        Self {
            signals: AtomicUsize::new(0),
            allocation_triggers: AtomicUsize::new(0),
            cooldown_triggers: AtomicUsize::new(0),
            collections: AtomicUsize::new(0),
            threads_registered: AtomicUsize::new(0),
            live_threads: AtomicUsize::new(0),
            last_trigger: Atomic::new(None),
        }
    }

    pub(crate) fn signal(&self, trigger: Option<GcTrigger>) {
        self.signals.fetch_add(1, Ordering::Relaxed);
        match trigger {
            Some(GcTrigger::Allocation) => {
                self.allocation_triggers.fetch_add(1, Ordering::Relaxed);
            }
            Some(GcTrigger::Cooldown) => {
                self.cooldown_triggers.fetch_add(1, Ordering::Relaxed);
            }
            None => return,
        }
        self.last_trigger.store(trigger, Ordering::Relaxed);
    }

    pub(crate) fn collection(&self) {
        self.collections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn thread_attached(&self) {
        self.threads_registered.fetch_add(1, Ordering::Relaxed);
        self.live_threads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn thread_detached(&self) {
        self.live_threads.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        allocation_threshold_bytes: usize,
        time_since_last_gc_ns: u64,
    ) -> SchedulerStatistics {
        SchedulerStatistics {
            signals: self.signals.load(Ordering::Relaxed),
            allocation_triggers: self.allocation_triggers.load(Ordering::Relaxed),
            cooldown_triggers: self.cooldown_triggers.load(Ordering::Relaxed),
            collections: self.collections.load(Ordering::Relaxed),
            threads_registered: self.threads_registered.load(Ordering::Relaxed),
            live_threads: self.live_threads.load(Ordering::Relaxed),
            last_trigger: self.last_trigger.load(Ordering::Relaxed),
            allocation_threshold_bytes,
            time_since_last_gc_ns,
        }
    }
}

/// Point-in-time view of what the scheduler has done. Counters are read independently and
/// may be slightly inconsistent with each other while mutators are running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStatistics {
    /// Slow-path signals received by the coordinator.
    pub signals: usize,
    pub allocation_triggers: usize,
    pub cooldown_triggers: usize,
    /// Completed collections reported through `on_perform_full_gc`.
    pub collections: usize,
    pub threads_registered: usize,
    pub live_threads: usize,
    pub last_trigger: Option<GcTrigger>,
    pub allocation_threshold_bytes: usize,
    pub time_since_last_gc_ns: u64,
}

impl SchedulerStatistics {
    pub fn requests(&self) -> usize {
        self.allocation_triggers + self.cooldown_triggers
    }
}

pub(crate) struct FormattedSize {
    pub size: usize,
}

impl std::fmt::Display for FormattedSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let ksize = (self.size as f64) / 1024f64;

        if ksize < 1f64 {
            return write!(f, "{}B", self.size);
        }

        let msize = ksize / 1024f64;

        if msize < 1f64 {
            return write!(f, "{:.1}K", ksize);
        }

        let gsize = msize / 1024f64;

        if gsize < 1f64 {
            write!(f, "{:.1}M", msize)
        } else {
            write!(f, "{:.1}G", gsize)
        }
    }
}

pub(crate) fn formatted_size(size: usize) -> FormattedSize {
    FormattedSize { size }
}

impl std::fmt::Display for SchedulerStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "GC scheduler statistics:")?;
        writeln!(f, "  Safepoint signals: {}", self.signals)?;
        writeln!(
            f,
            "  Collection requests: {} (allocation: {}, cooldown: {})",
            self.requests(),
            self.allocation_triggers,
            self.cooldown_triggers
        )?;
        match self.last_trigger {
            Some(trigger) => writeln!(f, "  Last trigger: {}", trigger)?,
            None => writeln!(f, "  Last trigger: none")?,
        }
        writeln!(f, "  Completed collections: {}", self.collections)?;
        writeln!(
            f,
            "  Mutator threads: {} live, {} registered",
            self.live_threads, self.threads_registered
        )?;
        writeln!(
            f,
            "  Allocation threshold: {}",
            formatted_size(self.allocation_threshold_bytes)
        )?;
        writeln!(
            f,
            "  Time since last GC: {:.3}ms",
            self.time_since_last_gc_ns as f64 / 1_000_000f64
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_size() {
        assert_eq!(formatted_size(512).to_string(), "512B");
        assert_eq!(formatted_size(10 * 1024).to_string(), "10.0K");
        assert_eq!(formatted_size(10 * 1024 * 1024).to_string(), "10.0M");
        assert_eq!(formatted_size(3 * 1024 * 1024 * 1024).to_string(), "3.0G");
    }

    #[test]
    fn test_untriggered_signal_keeps_last_trigger() {
        let stats = StatisticsCounters::new();
        stats.signal(Some(GcTrigger::Cooldown));
        stats.signal(None);
        let snapshot = stats.snapshot(0, 0);
        assert_eq!(snapshot.signals, 2);
        assert_eq!(snapshot.requests(), 1);
        assert_eq!(snapshot.last_trigger, Some(GcTrigger::Cooldown));
    }
}
