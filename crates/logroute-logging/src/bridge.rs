//! Bridge from `tracing` events into the sink registry
//!
//! Libraries that log through `tracing` end up in the same sinks as records
//! emitted through a [`Logger`](crate::Logger). Events on [`INTERNAL_TARGET`]
//! are the facility's own diagnostics and are never forwarded.

use crate::record::{Caller, Record, UNKNOWN_FUNCTION};
use crate::registry::SinkRegistry;
use logroute_core_types::Level;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Target of the facility's own diagnostics
pub const INTERNAL_TARGET: &str = "logroute::internal";

fn map_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE => Level::Trace,
        tracing::Level::DEBUG => Level::Debug,
        tracing::Level::INFO => Level::Info,
        tracing::Level::WARN => Level::Warning,
        tracing::Level::ERROR => Level::Error,
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl FieldVisitor {
    fn into_message(self) -> String {
        let mut message = self.message.unwrap_or_default();
        for (name, value) in self.fields {
            if !message.is_empty() {
                message.push(' ');
            }
            let _ = write!(message, "{}={}", name, value);
        }
        message
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.push((field.name(), format!("{:?}", value)));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }
}

/// `tracing_subscriber` layer that dispatches events to a registry
pub struct RegistryLayer {
    registry: Arc<SinkRegistry>,
}

impl RegistryLayer {
    pub(crate) fn new(registry: Arc<SinkRegistry>) -> Self {
        Self { registry }
    }
}

impl<S> Layer<S> for RegistryLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(INTERNAL_TARGET) {
            return;
        }

        let level = map_level(metadata.level());
        if !self.registry.enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let module = metadata.module_path().unwrap_or(metadata.target());
        let caller = Caller::new(
            module,
            UNKNOWN_FUNCTION,
            metadata.file().unwrap_or("<unknown>"),
            metadata.line().unwrap_or(0),
        );
        let bound_name = (metadata.target() != module).then(|| Arc::from(metadata.target()));

        let record = Record::new(level, visitor.into_message(), caller).with_bound_name(bound_name);
        self.registry.dispatch(&record);
    }
}
