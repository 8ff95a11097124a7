//! In-memory sinks for deterministic logging assertions
//!
//! [`CaptureSink`] keeps every accepted record so tests can assert on what was
//! emitted; [`SharedBuffer`] is a cloneable writer for console sinks.

use super::Sink;
use crate::format::RecordFormat;
use crate::record::{ExceptionTrace, Record};
use logroute_core_types::Level;
use logroute_errors::Result;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// A captured record with its rendered text
#[derive(Clone, Debug)]
pub struct CapturedRecord {
    pub level: Level,
    pub success: bool,
    pub name: String,
    pub module: String,
    pub function: String,
    pub line: u32,
    pub message: String,
    pub exception: Option<ExceptionTrace>,
    pub rendered: String,
}

/// Sink that stores records in memory
pub struct CaptureSink {
    min_level: Level,
    format: Option<RecordFormat>,
    records: Arc<Mutex<Vec<CapturedRecord>>>,
}

impl CaptureSink {
    pub fn new(min_level: Level) -> (Self, Capture) {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Self {
            min_level,
            format: None,
            records: records.clone(),
        };
        (sink, Capture { records })
    }

    /// Also render each record with `format`
    pub fn with_format(mut self, format: RecordFormat) -> Self {
        self.format = Some(format);
        self
    }
}

impl Sink for CaptureSink {
    fn min_level(&self) -> Level {
        self.min_level
    }

    fn write(&self, record: &Record) -> Result<()> {
        let rendered = match &self.format {
            Some(format) => format.render(record)?,
            None => String::new(),
        };

        let captured = CapturedRecord {
            level: record.level,
            success: record.success,
            name: record.name().to_string(),
            module: record.caller.module.to_string(),
            function: record.caller.function.to_string(),
            line: record.caller.line,
            message: record.message.clone(),
            exception: record.exception.clone(),
            rendered,
        };

        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(captured);
        Ok(())
    }

    fn describe(&self) -> String {
        "capture".to_string()
    }
}

/// Handle for reading what a [`CaptureSink`] received
#[derive(Clone)]
pub struct Capture {
    records: Arc<Mutex<Vec<CapturedRecord>>>,
}

impl Capture {
    pub fn records(&self) -> Vec<CapturedRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedRecord) -> bool,
    {
        self.records().iter().filter(|r| predicate(r)).count()
    }

    /// Assert a record with `level` and `message` was captured
    ///
    /// # Panics
    ///
    /// Panics if no such record exists
    pub fn assert_logged(&self, level: Level, message: &str) {
        let records = self.records();
        let found = records
            .iter()
            .any(|r| r.level == level && r.message == message);
        assert!(
            found,
            "Expected record level={} message={:?} not found in {} captured records",
            level,
            message,
            records.len()
        );
    }
}

/// Cloneable in-memory writer
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
