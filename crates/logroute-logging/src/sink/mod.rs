//! Output sinks
//!
//! A [`SinkSpec`] describes a destination and its policies; opening it yields
//! a live [`Sink`] that the registry owns until the next reconfiguration.

pub mod capture;
pub mod console;
pub mod file;

pub use capture::{Capture, CapturedRecord, CaptureSink, SharedBuffer};
pub use console::ConsoleSink;
pub use file::FileSink;

use crate::format::RecordFormat;
use crate::record::Record;
use logroute_core_types::{ByteSize, Level, Retention};
use logroute_errors::Result;
use std::path::PathBuf;

/// A live output destination
pub trait Sink: Send + Sync {
    /// Minimum level this sink accepts
    fn min_level(&self) -> Level;

    fn accepts(&self, record: &Record) -> bool {
        record.level >= self.min_level()
    }

    /// Render and write one record
    fn write(&self, record: &Record) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Short human-readable identity used in internal diagnostics
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    Stderr,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Zip,
}

/// Rotation, retention and compression for file sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationPolicy {
    pub rotation: Option<ByteSize>,
    pub retention: Option<Retention>,
    pub compression: Option<Compression>,
}

/// Description of a sink, built by the factory and opened by the registry
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSpec {
    pub destination: Destination,
    pub min_level: Level,
    pub format_template: String,
    pub colorize: bool,
    pub policy: RotationPolicy,
    pub diagnose: bool,
    pub serialize_json: bool,
}

impl SinkSpec {
    pub fn new(destination: Destination, min_level: Level, format_template: impl Into<String>) -> Self {
        Self {
            destination,
            min_level,
            format_template: format_template.into(),
            colorize: false,
            policy: RotationPolicy::default(),
            diagnose: false,
            serialize_json: false,
        }
    }

    pub fn colorize(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    pub fn rotation(mut self, size: ByteSize) -> Self {
        self.policy.rotation = Some(size);
        self
    }

    pub fn retention(mut self, retention: Retention) -> Self {
        self.policy.retention = Some(retention);
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.policy.compression = Some(compression);
        self
    }

    pub fn diagnose(mut self, diagnose: bool) -> Self {
        self.diagnose = diagnose;
        self
    }

    pub fn serialize_json(mut self, serialize: bool) -> Self {
        self.serialize_json = serialize;
        self
    }

    pub fn record_format(&self) -> Result<RecordFormat> {
        Ok(RecordFormat::new(&self.format_template)?
            .colorize(self.colorize)
            .serialize(self.serialize_json)
            .diagnose(self.diagnose))
    }

    /// Acquire the destination's resources
    ///
    /// # Errors
    ///
    /// Fails on an invalid template or when a file cannot be opened.
    pub fn open(&self) -> Result<Box<dyn Sink>> {
        let format = self.record_format()?;
        let sink: Box<dyn Sink> = match &self.destination {
            Destination::Stdout => Box::new(ConsoleSink::stdout(self.min_level, format)),
            Destination::Stderr => Box::new(ConsoleSink::stderr(self.min_level, format)),
            Destination::File(path) => Box::new(FileSink::open(
                path.clone(),
                self.min_level,
                format,
                self.policy,
            )?),
        };
        Ok(sink)
    }
}
