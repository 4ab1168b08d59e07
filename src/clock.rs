/// Clock injected into [GlobalCoordinator](crate::gc_data::GlobalCoordinator). Must be monotonic.
pub type CurrentTimeCallback = Box<dyn Fn() -> u64 + Send + Sync>;

/// Returns monotonic time in nanoseconds. Only differences between two values are meaningful.
#[cfg(unix)]
pub fn monotonic_time_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    (ts.tv_sec as u64)
        .wrapping_mul(1_000_000_000)
        .wrapping_add(ts.tv_nsec as u64)
}

#[cfg(not(unix))]
pub fn monotonic_time_ns() -> u64 {
    use once_cell::sync::Lazy;
    use std::time::Instant;

    static START: Lazy<Instant> = Lazy::new(Instant::now);
    START.elapsed().as_nanos() as u64
}

pub fn monotonic_clock() -> CurrentTimeCallback {
    Box::new(monotonic_time_ns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_does_not_go_backwards() {
        let clock = monotonic_clock();
        let mut last = clock();
        for _ in 0..1000 {
            let now = clock();
            assert!(now >= last);
            last = now;
        }
    }
}
