//! Process-wide logging context
//!
//! Thin convenience layer over one shared [`LogContext`]. The first
//! [`setup`] also installs the `tracing` bridge as the global subscriber
//! unless the host already set one.

use crate::context::LogContext;
use crate::exception::{Category, ExceptionScope};
use crate::logger::Logger;
use logroute_config::Settings;
use logroute_errors::Result;
use std::sync::{Once, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static CONTEXT: OnceLock<LogContext> = OnceLock::new();
static BRIDGE_ONCE: Once = Once::new();

/// The shared context; sinkless until [`setup`] succeeds
pub fn context() -> &'static LogContext {
    CONTEXT.get_or_init(LogContext::new)
}

/// Configure the shared context from `settings`
///
/// Repeated calls replace the sinks; they never accumulate.
pub fn setup(settings: &Settings) -> Result<()> {
    let context = context();
    BRIDGE_ONCE.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(context.tracing_layer())
            .try_init();
    });
    context.setup(settings)
}

/// Load settings from `.env` and the environment, then [`setup`]
pub fn setup_from_env() -> Result<()> {
    let settings = Settings::load()?;
    setup(&settings)
}

/// [`setup`], terminating the process with status 1 on failure
pub fn setup_or_exit(settings: &Settings) {
    if let Err(err) = setup(settings) {
        eprintln!("Failed to configure logging: {}", err);
        std::process::exit(1);
    }
}

/// Handle on the shared context, optionally bound to `name`
pub fn get_logger(name: Option<&str>) -> Logger {
    context().logger(name)
}

pub fn with_exception_logging(category: Category) -> ExceptionScope {
    context().with_exception_logging(category)
}

pub fn flush() {
    context().flush();
}
