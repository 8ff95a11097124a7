//! Record rendering
//!
//! A [`RecordFormat`] combines a parsed template with a sink's presentation
//! flags: colorized text, plain text or one JSON object per line.

mod ansi;
pub mod template;

pub use template::Template;

use crate::record::{ExceptionTrace, Record};
use logroute_core_types::schema::*;
use logroute_errors::{LogError, LogErrorKind, Result};
use serde_json::{Map, Value};

/// How a sink turns records into bytes
#[derive(Debug, Clone)]
pub struct RecordFormat {
    template: Template,
    colorize: bool,
    serialize: bool,
    diagnose: bool,
}

impl RecordFormat {
    pub fn new(template: &str) -> Result<Self> {
        Ok(Self {
            template: Template::parse(template)?,
            colorize: false,
            serialize: false,
            diagnose: false,
        })
    }

    pub fn colorize(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    pub fn serialize(mut self, serialize: bool) -> Self {
        self.serialize = serialize;
        self
    }

    pub fn diagnose(mut self, diagnose: bool) -> Self {
        self.diagnose = diagnose;
        self
    }

    pub fn is_diagnose(&self) -> bool {
        self.diagnose
    }

    /// Render a record, newline-terminated
    pub fn render(&self, record: &Record) -> Result<String> {
        if self.serialize {
            return self.render_json(record);
        }
        let mut out = self.template.render(record, self.colorize);
        if let Some(exception) = &record.exception {
            out.push('\n');
            out.push_str(&exception.render(self.diagnose));
        }
        out.push('\n');
        Ok(out)
    }

    fn render_json(&self, record: &Record) -> Result<String> {
        let mut text = self.template.render(record, false);
        if let Some(exception) = &record.exception {
            text.push('\n');
            text.push_str(&exception.render(self.diagnose));
        }

        let mut level = Map::new();
        level.insert(FIELD_LEVEL_NAME.into(), record.label().into());
        level.insert(FIELD_LEVEL_NO.into(), record.level.no().into());

        let mut fields = Map::new();
        fields.insert(FIELD_TIME.into(), record.time.to_rfc3339().into());
        fields.insert(FIELD_LEVEL.into(), Value::Object(level));
        fields.insert(FIELD_SUCCESS.into(), record.success.into());
        fields.insert(FIELD_NAME.into(), record.name().into());
        fields.insert(
            FIELD_BOUND_NAME.into(),
            record
                .bound_name
                .as_deref()
                .map_or(Value::Null, |name| name.into()),
        );
        fields.insert(FIELD_MODULE.into(), record.caller.module.into());
        fields.insert(FIELD_FUNCTION.into(), record.caller.function.into());
        fields.insert(FIELD_FILE.into(), record.caller.file.into());
        fields.insert(FIELD_LINE.into(), record.caller.line.into());
        fields.insert(FIELD_THREAD.into(), record.thread.clone().into());
        fields.insert(FIELD_MESSAGE.into(), record.message.clone().into());
        fields.insert(
            FIELD_EXCEPTION.into(),
            record
                .exception
                .as_ref()
                .map_or(Value::Null, |e| exception_json(e, self.diagnose)),
        );

        let mut envelope = Map::new();
        envelope.insert(FIELD_TEXT.into(), text.into());
        envelope.insert(FIELD_RECORD.into(), Value::Object(fields));

        let mut line = serde_json::to_string(&Value::Object(envelope)).map_err(|e| {
            LogError::new(LogErrorKind::Serialization)
                .with_op("serialize_record")
                .with_message(e.to_string())
                .with_source(e)
        })?;
        line.push('\n');
        Ok(line)
    }
}

fn exception_json(exception: &ExceptionTrace, diagnose: bool) -> Value {
    let mut map = Map::new();
    map.insert(FIELD_EXC_TYPE.into(), exception.type_name.clone().into());
    map.insert(FIELD_EXC_VALUE.into(), exception.message.clone().into());
    map.insert(
        FIELD_EXC_CAUSES.into(),
        Value::Array(exception.causes.iter().cloned().map(Value::from).collect()),
    );
    if diagnose {
        map.insert(FIELD_EXC_DEBUG.into(), exception.debug.clone().into());
        map.insert(
            FIELD_EXC_BACKTRACE.into(),
            exception.backtrace_text().map_or(Value::Null, Value::from),
        );
    }
    Value::Object(map)
}
