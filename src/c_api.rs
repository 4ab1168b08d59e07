//! C ABI used by compiled code and by runtimes not written in Rust.
//!
//! Pointers passed in must come from the matching `*_new` function and must not be used
//! after the matching `*_free`. A `ThreadCounters` pointer belongs to one thread.

use crate::{
    config::SchedulerConfig, gc_data::GcTrigger, scheduler::Scheduler,
    thread_data::ThreadCounters,
};

struct CallbackData(*mut u8);

unsafe impl Send for CallbackData {}
unsafe impl Sync for CallbackData {}

/// Returned by [comet_sched_on_safe_point]: 0 = no request, 1 = allocation, 2 = cooldown.
fn trigger_code(trigger: Option<GcTrigger>) -> u8 {
    match trigger {
        None => 0,
        Some(GcTrigger::Allocation) => 1,
        Some(GcTrigger::Cooldown) => 2,
    }
}

#[no_mangle]
pub extern "C" fn comet_sched_new() -> *mut Scheduler {
    Box::into_raw(Box::new(Scheduler::with_config(SchedulerConfig::from_env())))
}

/// Free scheduler. All thread data created from it must be freed first.
#[no_mangle]
pub extern "C" fn comet_sched_free(scheduler: *mut Scheduler) {
    if scheduler.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(scheduler));
    }
}

/// Register the collection request callback. `data` is passed back to every call.
#[no_mangle]
pub extern "C" fn comet_sched_set_schedule_gc(
    scheduler: *mut Scheduler,
    data: *mut u8,
    callback: extern "C" fn(*mut u8),
) {
    let data = CallbackData(data);
    unsafe {
        (*scheduler).set_schedule_gc(move || {
            let data = &data;
            callback(data.0);
        });
    }
}

#[no_mangle]
pub extern "C" fn comet_sched_thread_data_new(scheduler: *mut Scheduler) -> *mut ThreadCounters {
    unsafe { Box::into_raw(Box::new((*scheduler).new_thread_data())) }
}

#[no_mangle]
pub extern "C" fn comet_sched_thread_data_free(thread_data: *mut ThreadCounters) {
    if thread_data.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(thread_data));
    }
}

#[no_mangle]
pub extern "C" fn comet_sched_on_safepoint_regular(thread_data: *mut ThreadCounters, weight: usize) {
    unsafe {
        (*thread_data).on_safepoint_regular(weight);
    }
}

#[no_mangle]
pub extern "C" fn comet_sched_on_safepoint_allocation(thread_data: *mut ThreadCounters, size: usize) {
    unsafe {
        (*thread_data).on_safepoint_allocation(size);
    }
}

#[no_mangle]
pub extern "C" fn comet_sched_on_stopped_for_gc(thread_data: *mut ThreadCounters) {
    unsafe {
        (*thread_data).on_stopped_for_gc();
    }
}

#[no_mangle]
pub extern "C" fn comet_sched_on_safe_point(
    scheduler: *mut Scheduler,
    allocated_bytes: usize,
    safepoints_counter: usize,
) -> u8 {
    unsafe { trigger_code((*scheduler).gc_data().on_safe_point(allocated_bytes, safepoints_counter)) }
}

/// Must be called by the collector after every completed cycle.
#[no_mangle]
pub extern "C" fn comet_sched_on_perform_full_gc(scheduler: *mut Scheduler) {
    unsafe {
        (*scheduler).gc_data().on_perform_full_gc();
    }
}

#[no_mangle]
pub extern "C" fn comet_sched_threshold(scheduler: *mut Scheduler) -> usize {
    unsafe { (*scheduler).config().threshold() }
}

#[no_mangle]
pub extern "C" fn comet_sched_set_threshold(scheduler: *mut Scheduler, value: usize) {
    unsafe { (*scheduler).config().set_threshold(value) }
}

#[no_mangle]
pub extern "C" fn comet_sched_allocation_threshold_bytes(scheduler: *mut Scheduler) -> usize {
    unsafe { (*scheduler).config().allocation_threshold_bytes() }
}

#[no_mangle]
pub extern "C" fn comet_sched_set_allocation_threshold_bytes(scheduler: *mut Scheduler, value: usize) {
    unsafe { (*scheduler).config().set_allocation_threshold_bytes(value) }
}

#[no_mangle]
pub extern "C" fn comet_sched_cooldown_threshold_ns(scheduler: *mut Scheduler) -> u64 {
    unsafe { (*scheduler).config().cooldown_threshold_ns() }
}

#[no_mangle]
pub extern "C" fn comet_sched_set_cooldown_threshold_ns(scheduler: *mut Scheduler, value: u64) {
    unsafe { (*scheduler).config().set_cooldown_threshold_ns(value) }
}

#[no_mangle]
pub extern "C" fn comet_sched_set_auto_tune(scheduler: *mut Scheduler, value: bool) {
    unsafe { (*scheduler).config().set_auto_tune(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    extern "C" fn count_request(data: *mut u8) {
        let counter = unsafe { &*(data as *const AtomicUsize) };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn test_c_api_allocation_trigger() {
        let requests = Box::new(AtomicUsize::new(0));
        let scheduler = comet_sched_new();
        comet_sched_set_allocation_threshold_bytes(scheduler, 1000);
        comet_sched_set_cooldown_threshold_ns(scheduler, u64::MAX);
        comet_sched_set_schedule_gc(
            scheduler,
            &*requests as *const AtomicUsize as *mut u8,
            count_request,
        );

        let thread_data = comet_sched_thread_data_new(scheduler);
        comet_sched_on_safepoint_allocation(thread_data, 600);
        assert_eq!(requests.load(Ordering::Relaxed), 0);
        // 1100 >= 1000 reaches the coordinator, and 1100 > 1000 requests a collection.
        comet_sched_on_safepoint_allocation(thread_data, 500);
        assert_eq!(requests.load(Ordering::Relaxed), 1);

        assert_eq!(comet_sched_on_safe_point(scheduler, 0, 0), 0);
        assert_eq!(comet_sched_on_safe_point(scheduler, 2000, 0), 1);

        comet_sched_on_stopped_for_gc(thread_data);
        comet_sched_on_perform_full_gc(scheduler);
        comet_sched_thread_data_free(thread_data);
        comet_sched_free(scheduler);
    }
}
