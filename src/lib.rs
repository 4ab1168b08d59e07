//! GC scheduling policy.
//!
//! Decides *when* a collection should be requested. Every mutator thread owns a
//! [ThreadCounters](thread_data::ThreadCounters) that counts allocated bytes (and, in
//! aggressive mode, weighted safepoints) without any synchronization. When a thread crosses
//! its threshold it signals the shared [GlobalCoordinator](gc_data::GlobalCoordinator), which
//! requests a collection if the thread allocated too much or if the cooldown since the last
//! collection expired.
//!
//! ```ignore
//! let scheduler = Scheduler::new();
//! let requester = Arc::new(GcRequester::new());
//! let r = requester.clone();
//! scheduler.set_schedule_gc(move || {
//!     r.request();
//! });
//!
//! // on every mutator thread:
//! let mut counters = scheduler.new_thread_data();
//! counters.on_safepoint_allocation(size);
//!
//! // on the GC thread, after a cycle:
//! scheduler.gc_data().on_perform_full_gc();
//! ```

macro_rules! logln_if {
    ($cond: expr, $($t:tt)*) => {
        if $cond {
            log::info!(target: "gc", $($t)*);
        }
    };
}

macro_rules! runtime_assert {
    ($cond: expr, $err: expr) => {
        if !$cond {
            $crate::error::fatal($err);
        }
    };
}

pub mod c_api;
pub mod clock;
pub mod config;
pub mod error;
pub mod gc_data;
pub mod requester;
pub mod scheduler;
pub mod statistics;
pub mod thread_data;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use gc_data::{GcTrigger, GlobalCoordinator};
pub use requester::GcRequester;
pub use scheduler::Scheduler;
pub use statistics::SchedulerStatistics;
pub use thread_data::ThreadCounters;
