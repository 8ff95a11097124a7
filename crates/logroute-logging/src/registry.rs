//! The set of active sinks
//!
//! Dispatch holds the read lock; reconfiguration opens the new sinks and swaps
//! them in under the write lock, so a record is either written by the old set
//! or by the new one, never lost between them. Opening under the lock also
//! keeps an old file sink from rotating a file away from a new one.

use crate::bridge::INTERNAL_TARGET;
use crate::record::Record;
use crate::sink::{Sink, SinkSpec};
use logroute_core_types::Level;
use logroute_errors::{LogError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

type Sinks = Vec<Box<dyn Sink>>;

#[derive(Default)]
pub struct SinkRegistry {
    sinks: RwLock<Sinks>,
    dropped: AtomicU64,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `specs` and replace the active set with them
    ///
    /// All sinks are opened before the swap; on failure the active set is
    /// left untouched.
    pub fn install(&self, specs: &[SinkSpec]) -> Result<()> {
        let mut active = self.sinks.write().unwrap_or_else(PoisonError::into_inner);
        let opened = specs
            .iter()
            .map(SinkSpec::open)
            .collect::<Result<Sinks>>()?;
        let count = opened.len();
        let previous = std::mem::replace(&mut *active, opened);
        drop(active);

        retire(previous, count);
        Ok(())
    }

    /// Replace the active set with already constructed sinks
    pub fn install_sinks(&self, sinks: Sinks) {
        let count = sinks.len();
        let previous = {
            let mut active = self.sinks.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *active, sinks)
        };
        retire(previous, count);
    }

    /// Write `record` to every sink whose threshold it meets
    ///
    /// Failures are counted and reported; they never reach the caller.
    pub fn dispatch(&self, record: &Record) {
        let mut failures = Vec::new();
        {
            let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
            for sink in sinks.iter().filter(|s| s.accepts(record)) {
                if let Err(err) = sink.write(record) {
                    failures.push((sink.describe(), err));
                }
            }
        }

        if !failures.is_empty() {
            self.dropped.fetch_add(failures.len() as u64, Ordering::Relaxed);
            report(&failures);
        }
    }

    /// Whether any sink would accept a record at `level`
    pub fn enabled(&self, level: Level) -> bool {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|s| level >= s.min_level())
    }

    pub fn flush(&self) {
        let failures = {
            let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
            flush_all(&sinks)
        };
        report(&failures);
    }

    /// Flush and drop every sink
    pub fn clear(&self) {
        self.install_sinks(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.sinks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of sink writes that failed since creation
    pub fn dropped_writes(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn retire(previous: Sinks, installed: usize) {
    let failures = flush_all(&previous);
    drop(previous);

    report(&failures);
    tracing::debug!(target: INTERNAL_TARGET, sinks = installed, "sinks installed");
}

fn flush_all(sinks: &[Box<dyn Sink>]) -> Vec<(String, LogError)> {
    sinks
        .iter()
        .filter_map(|s| s.flush().err().map(|e| (s.describe(), e)))
        .collect()
}

fn report(failures: &[(String, LogError)]) {
    for (sink, err) in failures {
        tracing::warn!(
            target: INTERNAL_TARGET,
            sink = %sink,
            code = err.code(),
            error = %err,
            "sink failure"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Caller;
    use crate::sink::{CaptureSink, Destination};
    use logroute_errors::LogErrorKind;
    use tempfile::TempDir;

    struct FailingSink;

    impl Sink for FailingSink {
        fn min_level(&self) -> Level {
            Level::Trace
        }

        fn write(&self, _record: &Record) -> Result<()> {
            Err(LogError::new(LogErrorKind::Write).with_message("disk gone"))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn record(level: Level) -> Record {
        Record::new(level, "hello", Caller::new("m", "f", "f.rs", 1))
    }

    #[test]
    fn test_dispatch_respects_thresholds() {
        let registry = SinkRegistry::new();
        let (low, low_capture) = CaptureSink::new(Level::Debug);
        let (high, high_capture) = CaptureSink::new(Level::Error);
        registry.install_sinks(vec![Box::new(low), Box::new(high)]);

        registry.dispatch(&record(Level::Info));
        registry.dispatch(&record(Level::Error));

        assert_eq!(low_capture.records().len(), 2);
        assert_eq!(high_capture.records().len(), 1);
        assert!(registry.enabled(Level::Debug));
        assert!(!registry.enabled(Level::Trace));
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let registry = SinkRegistry::new();
        let (capture_sink, capture) = CaptureSink::new(Level::Trace);
        registry.install_sinks(vec![Box::new(FailingSink), Box::new(capture_sink)]);

        registry.dispatch(&record(Level::Info));
        registry.dispatch(&record(Level::Info));

        assert_eq!(capture.records().len(), 2);
        assert_eq!(registry.dropped_writes(), 2);
    }

    #[test]
    fn test_reinstall_replaces_sinks() {
        let registry = SinkRegistry::new();
        let (first, first_capture) = CaptureSink::new(Level::Trace);
        registry.install_sinks(vec![Box::new(first)]);
        let (second, second_capture) = CaptureSink::new(Level::Trace);
        registry.install_sinks(vec![Box::new(second)]);

        registry.dispatch(&record(Level::Info));

        assert_eq!(registry.len(), 1);
        assert!(first_capture.records().is_empty());
        assert_eq!(second_capture.records().len(), 1);
    }

    #[test]
    fn test_failed_install_keeps_previous_set() {
        let dir = TempDir::new().unwrap();
        let registry = SinkRegistry::new();
        let (sink, capture) = CaptureSink::new(Level::Trace);
        registry.install_sinks(vec![Box::new(sink)]);

        let specs = vec![
            SinkSpec::new(Destination::File(dir.path().join("ok.log")), Level::Info, "{message}"),
            SinkSpec::new(
                Destination::File(dir.path().join("missing").join("bad.log")),
                Level::Info,
                "{message}",
            ),
        ];
        let err = registry.install(&specs).unwrap_err();
        assert_eq!(err.kind(), LogErrorKind::OpenSink);

        registry.dispatch(&record(Level::Info));
        assert_eq!(registry.len(), 1);
        assert_eq!(capture.records().len(), 1);
    }

    #[test]
    fn test_clear_empties_registry() {
        let registry = SinkRegistry::new();
        let (sink, _capture) = CaptureSink::new(Level::Trace);
        registry.install_sinks(vec![Box::new(sink)]);
        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.enabled(Level::Critical));
    }
}
