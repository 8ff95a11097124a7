//! The logging context: owner of the sink registry

use crate::bridge::{RegistryLayer, INTERNAL_TARGET};
use crate::exception::{Category, ExceptionScope};
use crate::factory::build_sinks;
use crate::logger::Logger;
use crate::registry::SinkRegistry;
use crate::sink::{Sink, SinkSpec};
use logroute_config::Settings;
use logroute_errors::Result;
use std::sync::Arc;

/// An independent logging facility
///
/// Cloning yields another handle to the same sinks. Most programs use the
/// process-wide context behind [`crate::setup`]; tests create their own.
#[derive(Clone, Default)]
pub struct LogContext {
    registry: Arc<SinkRegistry>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all sinks with the console, `app.log` and `error.log` sinks
    /// described by `settings`
    ///
    /// Safe to call repeatedly; each call leaves exactly one set of sinks.
    ///
    /// # Errors
    ///
    /// Fails if the log directory cannot be created, a template is invalid or
    /// a file cannot be opened. The previous sinks stay active in that case.
    pub fn setup(&self, settings: &Settings) -> Result<()> {
        let specs = build_sinks(settings)?;
        self.install(&specs)?;

        tracing::debug!(
            target: INTERNAL_TARGET,
            log_dir = %settings.log_dir.display(),
            level = %settings.log_level,
            "logging configured"
        );

        let logger = self.logger(None);
        crate::log_info!(logger, "Logger initialized - Level: {}", settings.log_level);
        crate::log_debug!(logger, "Debug mode: {}", settings.debug);
        Ok(())
    }

    pub fn install(&self, specs: &[SinkSpec]) -> Result<()> {
        self.registry.install(specs)
    }

    pub fn install_sinks(&self, sinks: Vec<Box<dyn Sink>>) {
        self.registry.install_sinks(sinks);
    }

    /// Handle emitting into this context, optionally bound to `name`
    pub fn logger(&self, name: Option<&str>) -> Logger {
        Logger::new(self.registry.clone(), name.map(Arc::from))
    }

    pub fn with_exception_logging(&self, category: Category) -> ExceptionScope {
        ExceptionScope::new(self.logger(None), category)
    }

    /// Layer forwarding `tracing` events into this context's sinks
    pub fn tracing_layer(&self) -> RegistryLayer {
        RegistryLayer::new(self.registry.clone())
    }

    pub fn flush(&self) {
        self.registry.flush();
    }

    /// Flush and remove every sink
    pub fn shutdown(&self) {
        self.registry.clear();
    }

    pub fn sink_count(&self) -> usize {
        self.registry.len()
    }

    pub fn dropped_writes(&self) -> u64 {
        self.registry.dropped_writes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CaptureSink;
    use logroute_core_types::Level;

    #[test]
    fn test_clones_share_sinks() {
        let context = LogContext::new();
        let clone = context.clone();
        let (sink, capture) = CaptureSink::new(Level::Trace);
        context.install_sinks(vec![Box::new(sink)]);

        clone.logger(Some("api")).info("hi");
        assert_eq!(clone.sink_count(), 1);
        assert_eq!(capture.records()[0].name, "api");
    }

    #[test]
    fn test_shutdown_removes_sinks() {
        let context = LogContext::new();
        let (sink, capture) = CaptureSink::new(Level::Trace);
        context.install_sinks(vec![Box::new(sink)]);
        context.shutdown();

        context.logger(None).error("lost");
        assert_eq!(context.sink_count(), 0);
        assert!(capture.records().is_empty());
    }
}
