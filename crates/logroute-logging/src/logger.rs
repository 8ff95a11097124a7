//! Logger handles and emission macros

use crate::record::{Caller, ExceptionTrace, Record};
use crate::registry::SinkRegistry;
use logroute_core_types::Level;
use std::error::Error;
use std::panic::Location;
use std::sync::Arc;

/// Cheap, cloneable emission handle
///
/// Carries an optional bound name and a reference to the sinks of the context
/// it was obtained from. Records emitted through handles with different names
/// differ only in their name.
#[derive(Clone)]
pub struct Logger {
    registry: Arc<SinkRegistry>,
    name: Option<Arc<str>>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish()
    }
}

impl Logger {
    pub(crate) fn new(registry: Arc<SinkRegistry>, name: Option<Arc<str>>) -> Self {
        Self { registry, name }
    }

    /// New handle with `name` bound; the receiver is unchanged
    pub fn bind(&self, name: impl Into<Arc<str>>) -> Self {
        Self {
            registry: self.registry.clone(),
            name: Some(name.into()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether a record at `level` would reach at least one sink
    pub fn enabled(&self, level: Level) -> bool {
        self.registry.enabled(level)
    }

    fn emit(
        &self,
        level: Level,
        success: bool,
        message: String,
        caller: Caller,
        exception: Option<ExceptionTrace>,
    ) {
        if !self.registry.enabled(level) {
            return;
        }
        let record = Record::new(level, message, caller)
            .with_bound_name(self.name.clone())
            .with_success(success)
            .with_exception(exception);
        self.registry.dispatch(&record);
    }

    /// Emit with an explicit caller; used by the `log_*!` macros
    pub fn log_at(&self, level: Level, message: impl Into<String>, caller: Caller) {
        self.emit(level, false, message.into(), caller, None);
    }

    pub fn success_at(&self, message: impl Into<String>, caller: Caller) {
        self.emit(Level::Info, true, message.into(), caller, None);
    }

    /// Emit an ERROR record carrying `trace`
    pub fn exception_at(&self, message: impl Into<String>, trace: ExceptionTrace, caller: Caller) {
        self.emit(Level::Error, false, message.into(), caller, Some(trace));
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.log_at(level, message, Caller::from_location(Location::caller()));
    }

    #[track_caller]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::Trace, message);
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    /// INFO-severity record labelled `SUCCESS`
    #[track_caller]
    pub fn success(&self, message: impl Into<String>) {
        self.success_at(message, Caller::from_location(Location::caller()));
    }

    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(Level::Critical, message);
    }

    /// ERROR record with the trace of `err` attached
    #[track_caller]
    pub fn exception<E: Error + 'static>(&self, message: impl Into<String>, err: &E) {
        self.exception_at(
            message,
            ExceptionTrace::from_error(err),
            Caller::from_location(Location::caller()),
        );
    }
}

/// Emit at a level through a [`Logger`], capturing module and function
///
/// ```ignore
/// log_at!(logger, Level::Info, "loaded {} rows", rows);
/// ```
#[macro_export]
macro_rules! log_at {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let __logger = &$logger;
        let __level = $level;
        if __logger.enabled(__level) {
            __logger.log_at(__level, ::std::format!($($arg)+), $crate::caller!());
        }
    }};
}

#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_success {
    ($logger:expr, $($arg:tt)+) => {{
        let __logger = &$logger;
        if __logger.enabled($crate::Level::Info) {
            __logger.success_at(::std::format!($($arg)+), $crate::caller!());
        }
    }};
}

#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Critical, $($arg)+)
    };
}
