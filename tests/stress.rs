use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc, Barrier,
};

use comet_sched::{GcRequester, GcTrigger, Scheduler, SchedulerConfig};
use crossbeam_utils::thread;

const THREADS: usize = 8;

fn config(allocation_threshold: usize, cooldown_ns: u64) -> SchedulerConfig {
    let config = SchedulerConfig::new(false);
    config.set_allocation_threshold_bytes(allocation_threshold);
    config.set_cooldown_threshold_ns(cooldown_ns);
    config
}

#[test]
fn concurrent_triggering_signals_request_between_one_and_n_times() {
    let scheduler = Scheduler::with_config(config(1024, u64::MAX));
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = requests.clone();
    scheduler.set_schedule_gc(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let barrier = Barrier::new(THREADS);
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                barrier.wait();
                assert_eq!(
                    scheduler.gc_data().on_safe_point(4096, 0),
                    Some(GcTrigger::Allocation)
                );
            });
        }
    })
    .unwrap();

    let requested = requests.load(Ordering::SeqCst);
    assert!(requested >= 1 && requested <= THREADS);
    assert_eq!(scheduler.statistics().signals, THREADS);
}

#[test]
fn collection_mark_survives_concurrent_readers() {
    let now = Arc::new(AtomicU64::new(1));
    let clock = now.clone();
    let scheduler = Scheduler::with_config_and_clock(
        config(usize::MAX, 1),
        Box::new(move || clock.load(Ordering::SeqCst)),
    );
    scheduler.set_schedule_gc(|| {});

    let barrier = Barrier::new(THREADS + 1);
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                barrier.wait();
                for _ in 0..10_000 {
                    scheduler.gc_data().on_safe_point(0, 0);
                    let mark = scheduler.gc_data().time_of_last_gc_ns();
                    assert!(mark >= 1 && mark <= now.load(Ordering::SeqCst));
                }
            });
        }
        s.spawn(|_| {
            barrier.wait();
            for _ in 0..10_000 {
                now.fetch_add(1, Ordering::SeqCst);
                scheduler.gc_data().on_perform_full_gc();
            }
        });
    })
    .unwrap();

    assert_eq!(
        scheduler.gc_data().time_of_last_gc_ns(),
        now.load(Ordering::SeqCst)
    );
    let stats = scheduler.statistics();
    assert_eq!(stats.collections, 10_000);
    assert_eq!(stats.signals, THREADS * 10_000);
}

#[test]
fn mutators_and_collector_thread() {
    let scheduler = Scheduler::with_config(config(64 * 1024, u64::MAX));
    let requester = Arc::new(GcRequester::new());
    let r = requester.clone();
    scheduler.set_schedule_gc(move || {
        r.request();
    });

    let collections = AtomicUsize::new(0);
    thread::scope(|s| {
        s.spawn(|_| {
            while requester.wait() {
                collections.fetch_add(1, Ordering::SeqCst);
                scheduler.gc_data().on_perform_full_gc();
            }
        });

        let mutators: Vec<_> = (0..THREADS)
            .map(|_| {
                let mut thread_data = scheduler.new_thread_data();
                s.spawn(move |_| {
                    for _ in 0..10_000 {
                        thread_data.on_safepoint_allocation(100);
                    }
                })
            })
            .collect();
        for mutator in mutators {
            mutator.join().unwrap();
        }
        requester.shutdown();
    })
    .unwrap();

    let stats = scheduler.statistics();
    // Each thread allocates 1_000_000 bytes, so it crosses 65536 bytes 15 times, and every
    // crossing (65600 bytes) is above the global threshold.
    assert_eq!(stats.signals, THREADS * 15);
    assert_eq!(stats.allocation_triggers, THREADS * 15);
    assert_eq!(stats.live_threads, 0);
    assert_eq!(stats.threads_registered, THREADS);
    assert_eq!(stats.collections, collections.load(Ordering::SeqCst));
}
