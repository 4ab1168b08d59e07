use std::convert::TryFrom;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize};
use std::time::Duration;

use atomic::Ordering;

use crate::error::SchedulerError;

/// Roughly 1 slow path per 10ms (measured on a subset of benchmarks on one machine).
pub const DEFAULT_SAFEPOINT_THRESHOLD: usize = 100_000;
pub const DEFAULT_ALLOCATION_THRESHOLD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_COOLDOWN_THRESHOLD_NS: u64 = 200 * 1000 * 1000;

pub const AGGRESSIVE_SAFEPOINT_THRESHOLD: usize = 1000;
pub const AGGRESSIVE_ALLOCATION_THRESHOLD_BYTES: usize = 10_000;
pub const AGGRESSIVE_COOLDOWN_THRESHOLD_NS: u64 = 0;

/// Whether this build was compiled with the `gc-aggressive` feature.
pub const fn gc_aggressive() -> bool {
    cfg!(feature = "gc-aggressive")
}

/// Process-wide scheduler tuning.
///
/// Every field is its own atomic and may be changed at any time from any thread. Nothing
/// reads two fields as a unit. Mutator threads copy the thresholds into their
/// [ThreadCounters](crate::thread_data::ThreadCounters) and only pick up a new value on
/// their next reset.
pub struct SchedulerConfig {
    threshold: AtomicUsize,
    allocation_threshold_bytes: AtomicUsize,
    cooldown_threshold_ns: AtomicU64,
    auto_tune: AtomicBool,
    verbose: AtomicBool,
    aggressive: bool,
}

impl SchedulerConfig {
    pub fn new(aggressive: bool) -> Self {
        let config = Self {
            threshold: AtomicUsize::new(DEFAULT_SAFEPOINT_THRESHOLD),
            allocation_threshold_bytes: AtomicUsize::new(DEFAULT_ALLOCATION_THRESHOLD_BYTES),
            cooldown_threshold_ns: AtomicU64::new(DEFAULT_COOLDOWN_THRESHOLD_NS),
            auto_tune: AtomicBool::new(false),
            verbose: AtomicBool::new(false),
            aggressive,
        };
        if aggressive {
            config.set_threshold(AGGRESSIVE_SAFEPOINT_THRESHOLD);
            config.set_allocation_threshold_bytes(AGGRESSIVE_ALLOCATION_THRESHOLD_BYTES);
            config.set_cooldown_threshold_ns(AGGRESSIVE_COOLDOWN_THRESHOLD_NS);
        }
        config
    }

    /// Builds the default config and applies `COMET_GC_*` environment overrides.
    ///
    /// Malformed values are reported and ignored.
    pub fn from_env() -> Self {
        let aggressive = gc_aggressive()
            || std::env::var("COMET_GC_AGGRESSIVE")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false);
        let config = Self::new(aggressive);
        for (name, value) in std::env::vars() {
            if !name.starts_with("COMET_GC_") || name == "COMET_GC_AGGRESSIVE" {
                continue;
            }
            match config.apply_env_var(&name, &value) {
                Ok(true) => {}
                Ok(false) => log::warn!(target: "gc", "unknown scheduler variable {}", name),
                Err(err) => log::warn!(target: "gc", "{}", err),
            }
        }
        logln_if!(config.verbose(), "{}", config.describe());
        config
    }

    /// Applies a single `COMET_GC_*` override. Returns `Ok(false)` for names this config
    /// does not know about.
    pub fn apply_env_var(&self, name: &str, value: &str) -> Result<bool, SchedulerError> {
        let invalid = || SchedulerError::InvalidConfigValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        match name {
            "COMET_GC_THRESHOLD" => {
                self.set_threshold(value.trim().parse().map_err(|_| invalid())?);
            }
            "COMET_GC_ALLOCATION_THRESHOLD" => {
                self.set_allocation_threshold_bytes(parse_size(value).ok_or_else(invalid)?);
            }
            "COMET_GC_COOLDOWN_MS" => {
                let ms: u64 = value.trim().parse().map_err(|_| invalid())?;
                self.set_cooldown_threshold_ns(ms.saturating_mul(1_000_000));
            }
            "COMET_GC_AUTO_TUNE" => self.set_auto_tune(parse_bool(value).ok_or_else(invalid)?),
            "COMET_GC_VERBOSE" => self.set_verbose(parse_bool(value).ok_or_else(invalid)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Weighted safepoint count that sends a thread to its slow path. Only used in
    /// aggressive mode.
    #[inline]
    pub fn threshold(&self) -> usize {
        self.threshold.load(Ordering::Relaxed)
    }

    pub fn set_threshold(&self, value: usize) {
        self.threshold.store(value, Ordering::Relaxed);
    }

    /// Bytes one thread may allocate between two resets before it signals the coordinator.
    #[inline]
    pub fn allocation_threshold_bytes(&self) -> usize {
        self.allocation_threshold_bytes.load(Ordering::Relaxed)
    }

    pub fn set_allocation_threshold_bytes(&self, value: usize) {
        self.allocation_threshold_bytes
            .store(value, Ordering::Relaxed);
    }

    /// Time since the last collection after which any signal requests a new one.
    #[inline]
    pub fn cooldown_threshold_ns(&self) -> u64 {
        self.cooldown_threshold_ns.load(Ordering::Relaxed)
    }

    pub fn set_cooldown_threshold_ns(&self, value: u64) {
        self.cooldown_threshold_ns.store(value, Ordering::Relaxed);
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_nanos(self.cooldown_threshold_ns())
    }

    pub fn set_cooldown(&self, cooldown: Duration) {
        let ns = u64::try_from(cooldown.as_nanos()).unwrap_or(u64::MAX);
        self.set_cooldown_threshold_ns(ns);
    }

    /// Reserved. Stored but not consulted yet.
    pub fn auto_tune(&self) -> bool {
        self.auto_tune.load(Ordering::Relaxed)
    }

    pub fn set_auto_tune(&self, value: bool) {
        self.auto_tune.store(value, Ordering::Relaxed);
    }

    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn set_verbose(&self, value: bool) {
        self.verbose.store(value, Ordering::Relaxed);
    }

    /// Aggressive mode enables safepoint-count triggering. Fixed at construction.
    #[inline]
    pub fn aggressive(&self) -> bool {
        self.aggressive
    }

    fn describe(&self) -> String {
        format!(
            "GC scheduler config: threshold={} allocation_threshold={} cooldown={:?} auto_tune={} aggressive={}",
            self.threshold(),
            crate::statistics::formatted_size(self.allocation_threshold_bytes()),
            self.cooldown(),
            self.auto_tune(),
            self.aggressive()
        )
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(gc_aggressive())
    }
}

impl std::fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("threshold", &self.threshold())
            .field(
                "allocation_threshold_bytes",
                &self.allocation_threshold_bytes(),
            )
            .field("cooldown_threshold_ns", &self.cooldown_threshold_ns())
            .field("auto_tune", &self.auto_tune())
            .field("verbose", &self.verbose())
            .field("aggressive", &self.aggressive)
            .finish()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses `4096`, `64K`, `10M` or `1G` (binary units).
fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    let (digits, shift) = match value.chars().last()? {
        'k' | 'K' => (&value[..value.len() - 1], 10),
        'm' | 'M' => (&value[..value.len() - 1], 20),
        'g' | 'G' => (&value[..value.len() - 1], 30),
        _ => (value, 0),
    };
    let base: usize = digits.trim().parse().ok()?;
    base.checked_mul(1usize << shift)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("64K"), Some(64 * 1024));
        assert_eq!(parse_size("10m"), Some(10 * 1024 * 1024));
        assert_eq!(parse_size("1G"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("M"), None);
        assert_eq!(parse_size("ten"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
