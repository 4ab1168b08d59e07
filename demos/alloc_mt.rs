use std::sync::Arc;
use std::time::Instant;

use comet_sched::{GcRequester, Scheduler, SchedulerConfig};

/// Stand-in for a collector cycle.
fn collect(cycle: usize) {
    std::thread::sleep(std::time::Duration::from_micros(200));
    println!("GC cycle #{} done", cycle);
}

fn main() {
    let config = SchedulerConfig::from_env();
    config.set_verbose(true);
    let scheduler = Arc::new(Scheduler::with_config(config));
    let requester = Arc::new(GcRequester::new());
    let r = requester.clone();
    scheduler.set_schedule_gc(move || {
        r.request();
    });

    let gc_thread = {
        let scheduler = scheduler.clone();
        let requester = requester.clone();
        std::thread::spawn(move || {
            let mut cycle = 0;
            while requester.wait() {
                cycle += 1;
                collect(cycle);
                scheduler.gc_data().on_perform_full_gc();
            }
        })
    };

    let mut handles = vec![];
    println!("Spawning 4 mutators");
    for _ in 0..4 {
        let mut thread_data = scheduler.new_thread_data();
        handles.push(std::thread::spawn(move || {
            let mut i = 0;
            while i < 50_000_000 {
                thread_data.on_safepoint_allocation(32);
                if i % 8192 == 0 {
                    thread_data.on_safepoint_regular(comet_sched::thread_data::LOOP_BODY_WEIGHT);
                }
                i += 1;
            }
        }));
    }

    let start = Instant::now();
    for handle in handles {
        handle.join().unwrap();
    }
    requester.shutdown();
    gc_thread.join().unwrap();

    println!("Finished in {:.4} secs", start.elapsed().as_secs_f64());
    println!("{}", scheduler.statistics());
}
