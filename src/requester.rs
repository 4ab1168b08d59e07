//! Collector-side coalescing of collection requests.
//!
//! The scheduler may ask for a collection several times in a row, from several threads.
//! A [GcRequester] turns that stream into at most one pending request that the GC thread
//! consumes with [GcRequester::wait].

use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use atomic::Ordering;
use parking_lot::{Condvar, Mutex};

pub struct GcRequester {
    /// Checked without the lock so repeated requests stay cheap.
    request_flag: AtomicBool,
    lock: Mutex<State>,
    cv: Condvar,
}

#[derive(Default)]
struct State {
    requested: bool,
    shutdown: bool,
}

impl GcRequester {
    pub fn new() -> Self {
        Self {
            request_flag: AtomicBool::new(false),
            lock: Mutex::new(State::default()),
            cv: Condvar::new(),
        }
    }

    /// Requests a collection. Returns `true` if this call made the request pending, `false`
    /// if one was already pending.
    pub fn request(&self) -> bool {
        if self.request_flag.load(Ordering::Relaxed) {
            return false;
        }
        if self.request_flag.swap(true, Ordering::AcqRel) {
            return false;
        }
        let mut state = self.lock.lock();
        state.requested = true;
        self.cv.notify_one();
        true
    }

    pub fn is_requested(&self) -> bool {
        self.request_flag.load(Ordering::Acquire)
    }

    /// Blocks until a request is pending and consumes it. Returns `false` once the requester
    /// has been shut down.
    pub fn wait(&self) -> bool {
        let mut state = self.lock.lock();
        loop {
            if state.shutdown {
                return false;
            }
            if state.requested {
                state.requested = false;
                self.request_flag.store(false, Ordering::Release);
                return true;
            }
            self.cv.wait(&mut state);
        }
    }

    /// Like [GcRequester::wait] but gives up after `timeout`. Returns `true` only if a
    /// request was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock.lock();
        loop {
            if state.shutdown {
                return false;
            }
            if state.requested {
                state.requested = false;
                self.request_flag.store(false, Ordering::Release);
                return true;
            }
            if self.cv.wait_until(&mut state, deadline).timed_out() {
                return false;
            }
        }
    }

    /// Wakes the GC thread for good; every later `wait` returns `false` immediately.
    pub fn shutdown(&self) {
        let mut state = self.lock.lock();
        state.shutdown = true;
        self.cv.notify_all();
    }
}

impl Default for GcRequester {
    fn default() -> Self {
        Self::new()
    }
}
