use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("schedule_gc callback must be set before the scheduler receives safepoints")]
    ScheduleGcNotSet,
    #[error("schedule_gc callback must not have been set")]
    ScheduleGcAlreadySet,
    #[error("invalid value {value:?} for {name}")]
    InvalidConfigValue { name: String, value: String },
}

/// Reports a broken wiring contract between the runtime and the scheduler.
///
/// These are bugs in the host runtime, not conditions to recover from. Release builds
/// are compiled with `panic = "abort"`, so this terminates the process there.
#[cold]
#[inline(never)]
pub fn fatal(error: SchedulerError) -> ! {
    log::error!(target: "gc", "{}", error);
    eprintln!("{:?}", backtrace::Backtrace::new());
    panic!("{}", error);
}
