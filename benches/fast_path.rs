use comet_sched::{thread_data::LOOP_BODY_WEIGHT, Scheduler, SchedulerConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn scheduler(aggressive: bool) -> Scheduler {
    let config = SchedulerConfig::new(aggressive);
    config.set_cooldown_threshold_ns(u64::MAX);
    let scheduler = Scheduler::with_config(config);
    scheduler.set_schedule_gc(|| {});
    scheduler
}

pub fn bench_fast_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("safepoints");
    group.sample_size(50);

    for &aggressive in [false, true].iter() {
        let scheduler = scheduler(aggressive);
        let name = if aggressive { "aggressive" } else { "default" };

        group.bench_function(BenchmarkId::new("regular", name), |b| {
            let mut thread_data = scheduler.new_thread_data();
            b.iter(|| {
                for _ in 0..1024 {
                    thread_data.on_safepoint_regular(black_box(LOOP_BODY_WEIGHT));
                }
            });
        });

        for &size in [16usize, 256, 4096].iter() {
            group.bench_function(BenchmarkId::new(format!("allocation({})", name), size), |b| {
                let mut thread_data = scheduler.new_thread_data();
                b.iter(|| {
                    for _ in 0..1024 {
                        thread_data.on_safepoint_allocation(black_box(size));
                    }
                });
            });
        }
    }

    group.finish();
}

pub fn bench_decision(c: &mut Criterion) {
    let scheduler = scheduler(false);
    c.bench_function("on_safe_point", |b| {
        b.iter(|| scheduler.gc_data().on_safe_point(black_box(1024), black_box(0)));
    });
}

criterion_group!(benches, bench_fast_path, bench_decision);
criterion_main!(benches);
