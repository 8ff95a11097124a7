//! Console sink

use super::Sink;
use crate::format::RecordFormat;
use crate::record::Record;
use logroute_core_types::Level;
use logroute_errors::{LogError, LogErrorKind, Result};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Writes rendered records to a stream (stdout by default)
pub struct ConsoleSink {
    label: &'static str,
    min_level: Level,
    format: RecordFormat,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout(min_level: Level, format: RecordFormat) -> Self {
        Self::with_writer("stdout", min_level, format, Box::new(io::stdout()))
    }

    pub fn stderr(min_level: Level, format: RecordFormat) -> Self {
        Self::with_writer("stderr", min_level, format, Box::new(io::stderr()))
    }

    /// Console sink over an arbitrary writer
    pub fn with_writer(
        label: &'static str,
        min_level: Level,
        format: RecordFormat,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            label,
            min_level,
            format,
            writer: Mutex::new(writer),
        }
    }
}

fn write_error(op: &str, err: io::Error) -> LogError {
    LogError::new(LogErrorKind::Write)
        .with_op(op)
        .with_message(err.to_string())
        .with_source(err)
}

impl Sink for ConsoleSink {
    fn min_level(&self) -> Level {
        self.min_level
    }

    fn write(&self, record: &Record) -> Result<()> {
        let line = self.format.render(record)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| write_error("console_write", e))
    }

    fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
            .map_err(|e| write_error("console_flush", e))
    }

    fn describe(&self) -> String {
        format!("console({})", self.label)
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        let writer = self.writer.get_mut().unwrap_or_else(PoisonError::into_inner);
        let _ = writer.flush();
    }
}
