//! Multi-sink logging for applications
//!
//! A [`LogContext`] owns a set of sinks: by default a colorized console sink,
//! a size-rotated `app.log` and an error-only `error.log`, both compressed to
//! zip archives on rotation. Records are emitted through cheap [`Logger`]
//! handles and fanned out to every sink whose level threshold they meet.
//!
//! # Usage
//!
//! ```no_run
//! use logroute_config::Settings;
//! use logroute_logging::{get_logger, log_info, setup, with_exception_logging, Category};
//!
//! let settings = Settings::load().expect("settings");
//! setup(&settings).expect("logging");
//!
//! let logger = get_logger(Some("billing"));
//! log_info!(logger, "processing {} invoices", 12);
//!
//! let scope = with_exception_logging(Category::Any);
//! let _ = scope.run(|| std::fs::read_to_string("invoices.csv"));
//! ```

pub mod bridge;
pub mod context;
pub mod exception;
pub mod factory;
pub mod format;
pub mod global;
pub mod logger;
pub mod record;
pub mod registry;
pub mod rotation;
pub mod sink;

pub use bridge::{RegistryLayer, INTERNAL_TARGET};
pub use context::LogContext;
pub use exception::{BoxedError, Category, ExceptionScope};
pub use factory::{build_sinks, APP_LOG, ERROR_LOG};
pub use format::RecordFormat;
pub use global::{flush, get_logger, setup, setup_from_env, setup_or_exit, with_exception_logging};
pub use logger::Logger;
pub use logroute_core_types::Level;
pub use logroute_errors::{LogError, LogErrorKind, Result};
pub use record::{Caller, ExceptionTrace, Record};
pub use registry::SinkRegistry;
pub use sink::{Compression, Destination, RotationPolicy, Sink, SinkSpec};
