//! Log records and exception traces
//!
//! A [`Record`] is built at emission time and handed to every sink; it is
//! never stored by the facility itself.

use chrono::{DateTime, Local};
use logroute_core_types::schema::SUCCESS_LABEL;
use logroute_core_types::Level;
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt::Write as _;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

/// Placeholder used when the calling function cannot be determined
pub const UNKNOWN_FUNCTION: &str = "<unknown>";

/// Where a record was emitted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub module: &'static str,
    pub function: &'static str,
    pub file: &'static str,
    pub line: u32,
}

impl Caller {
    pub const fn new(
        module: &'static str,
        function: &'static str,
        file: &'static str,
        line: u32,
    ) -> Self {
        Self {
            module,
            function,
            file,
            line,
        }
    }

    /// Best-effort caller from a `#[track_caller]` location
    ///
    /// The module is approximated by the file stem and the function is unknown.
    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            module: file_stem(location.file()),
            function: UNKNOWN_FUNCTION,
            file: location.file(),
            line: location.line(),
        }
    }
}

fn file_stem(file: &'static str) -> &'static str {
    Path::new(file)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file)
}

/// Reduce a `type_name` path to the name of the enclosing function
///
/// `app::jobs::import::{{closure}}` becomes `import`.
pub fn trim_function_name(raw: &'static str) -> &'static str {
    let mut name = raw;
    while let Some(stripped) = name.strip_suffix("::{{closure}}") {
        name = stripped;
    }
    name.rsplit("::").next().unwrap_or(name)
}

/// Name of the function this macro is expanded in
#[macro_export]
macro_rules! function_name {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let raw = __type_name_of(__here);
        $crate::record::trim_function_name(raw.strip_suffix("::__here").unwrap_or(raw))
    }};
}

/// [`Caller`] for the current source position
#[macro_export]
macro_rules! caller {
    () => {
        $crate::record::Caller::new(
            ::std::module_path!(),
            $crate::function_name!(),
            ::std::file!(),
            ::std::line!(),
        )
    };
}

/// Diagnostic description of a failure attached to a record
#[derive(Debug, Clone)]
pub struct ExceptionTrace {
    pub type_name: String,
    pub message: String,
    /// `Error::source()` chain, outermost first
    pub causes: Vec<String>,
    /// `Debug` rendering; exposes field values, shown only when diagnosing
    pub debug: String,
    /// Unresolved until a diagnosing sink renders it
    pub backtrace: Option<Arc<Backtrace>>,
}

impl ExceptionTrace {
    pub fn from_error<E: Error + 'static>(err: &E) -> Self {
        let mut trace = Self::from_dyn(err);
        trace.type_name = std::any::type_name::<E>().to_string();
        trace
    }

    pub fn from_dyn(err: &(dyn Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            type_name: "dyn Error".to_string(),
            message: err.to_string(),
            causes,
            debug: format!("{:#?}", err),
            backtrace: capture_backtrace(),
        }
    }

    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<dyn Any>".to_string());

        Self {
            type_name: "panic".to_string(),
            debug: format!("{:?}", message),
            message,
            causes: Vec::new(),
            backtrace: capture_backtrace(),
        }
    }

    /// Multi-line text form appended after the record line
    pub fn render(&self, diagnose: bool) -> String {
        let mut out = format!("{}: {}", self.type_name, self.message);
        for cause in &self.causes {
            let _ = write!(out, "\n  caused by: {}", cause);
        }
        if diagnose {
            out.push_str("\n  debug:");
            for line in self.debug.lines() {
                let _ = write!(out, "\n    {}", line);
            }
            if let Some(backtrace) = self.backtrace_text() {
                out.push_str("\n  backtrace:");
                for line in backtrace.lines() {
                    let _ = write!(out, "\n    {}", line);
                }
            }
        }
        out
    }

    /// Symbolized backtrace, resolved on first use
    pub fn backtrace_text(&self) -> Option<String> {
        self.backtrace.as_ref().map(|b| b.to_string())
    }
}

// Honours RUST_BACKTRACE / RUST_LIB_BACKTRACE
fn capture_backtrace() -> Option<Arc<Backtrace>> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(Arc::new(backtrace)),
        _ => None,
    }
}

/// A single log event
#[derive(Debug, Clone)]
pub struct Record {
    pub time: DateTime<Local>,
    pub level: Level,
    /// INFO-severity record tagged as a success
    pub success: bool,
    pub bound_name: Option<Arc<str>>,
    pub caller: Caller,
    pub thread: String,
    pub message: String,
    pub exception: Option<ExceptionTrace>,
}

impl Record {
    pub fn new(level: Level, message: impl Into<String>, caller: Caller) -> Self {
        let current = std::thread::current();
        let thread = current
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", current.id()));

        Self {
            time: Local::now(),
            level,
            success: false,
            bound_name: None,
            caller,
            thread,
            message: message.into(),
            exception: None,
        }
    }

    pub fn with_bound_name(mut self, name: Option<Arc<str>>) -> Self {
        self.bound_name = name;
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn with_exception(mut self, exception: Option<ExceptionTrace>) -> Self {
        self.exception = exception;
        self
    }

    /// The bound name, or the emitting module when nothing is bound
    pub fn name(&self) -> &str {
        self.bound_name.as_deref().unwrap_or(self.caller.module)
    }

    /// Level label, `SUCCESS` for success-tagged records
    pub fn label(&self) -> &'static str {
        if self.success {
            SUCCESS_LABEL
        } else {
            self.level.label()
        }
    }
}
