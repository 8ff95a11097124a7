//! Size-rotated file sink

use super::{Compression, RotationPolicy, Sink};
use crate::bridge::INTERNAL_TARGET;
use crate::format::RecordFormat;
use crate::record::Record;
use crate::rotation::{apply_retention, archive_path, compress_zip};
use chrono::Local;
use logroute_core_types::Level;
use logroute_errors::{io_error, LogErrorKind, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

struct FileState {
    file: File,
    size: u64,
    /// The handle no longer refers to `path`; reopen before the next write
    detached: bool,
}

/// Appends rendered records to a file, rotating it by size
///
/// Writes go straight to the file descriptor, so nothing is lost if the
/// process exits without flushing.
pub struct FileSink {
    path: PathBuf,
    min_level: Level,
    format: RecordFormat,
    policy: RotationPolicy,
    state: Mutex<FileState>,
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl FileSink {
    /// Open (or create) `path` for appending and sweep old archives
    ///
    /// # Errors
    ///
    /// `OpenSink` when the file cannot be opened or inspected.
    pub fn open(
        path: PathBuf,
        min_level: Level,
        format: RecordFormat,
        policy: RotationPolicy,
    ) -> Result<Self> {
        let file = open_append(&path)
            .map_err(|e| io_error(LogErrorKind::OpenSink, "open_file_sink", &path, e))?;
        let size = file
            .metadata()
            .map_err(|e| io_error(LogErrorKind::OpenSink, "stat_file_sink", &path, e))?
            .len();

        let sink = Self {
            path,
            min_level,
            format,
            policy,
            state: Mutex::new(FileState {
                file,
                size,
                detached: false,
            }),
        };
        sink.sweep();
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written to the active file
    pub fn current_size(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .size
    }

    fn needs_rotation(&self, current: u64, incoming: u64) -> bool {
        match self.policy.rotation {
            Some(limit) => current > 0 && current.saturating_add(incoming) > limit.as_u64(),
            None => false,
        }
    }

    fn rotate(&self, state: &mut FileState) -> Result<()> {
        let _ = state.file.flush();
        let archive = archive_path(&self.path, Local::now().naive_local());
        fs::rename(&self.path, &archive)
            .map_err(|e| io_error(LogErrorKind::Rotate, "rotate_file", &self.path, e))?;

        match open_append(&self.path) {
            Ok(file) => {
                state.file = file;
                state.size = 0;
            }
            Err(e) => {
                self.restore(state, &archive);
                return Err(io_error(LogErrorKind::Rotate, "reopen_file", &self.path, e));
            }
        }

        if let Some(Compression::Zip) = self.policy.compression {
            if let Err(err) = compress_zip(&archive) {
                tracing::warn!(target: INTERNAL_TARGET, error = %err, "archive compression failed");
            }
        }
        self.sweep();
        Ok(())
    }

    // Move the archive back so the open handle is the active file again
    fn restore(&self, state: &mut FileState, archive: &Path) {
        if let Err(err) = fs::rename(archive, &self.path) {
            tracing::warn!(
                target: INTERNAL_TARGET,
                error = %err,
                archive = %archive.display(),
                "could not restore active file after failed rotation"
            );
            state.detached = true;
        }
    }

    fn reattach(&self, state: &mut FileState) -> Result<()> {
        let file = open_append(&self.path)
            .map_err(|e| io_error(LogErrorKind::Write, "reopen_file", &self.path, e))?;
        state.size = file
            .metadata()
            .map_err(|e| io_error(LogErrorKind::Write, "stat_file_sink", &self.path, e))?
            .len();
        state.file = file;
        state.detached = false;
        Ok(())
    }

    fn sweep(&self) {
        let Some(retention) = &self.policy.retention else {
            return;
        };
        match apply_retention(&self.path, retention, Local::now().naive_local()) {
            Ok(removed) if !removed.is_empty() => {
                tracing::debug!(
                    target: INTERNAL_TARGET,
                    sink = %self.path.display(),
                    removed = removed.len(),
                    "retention sweep"
                );
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(target: INTERNAL_TARGET, error = %err, "retention sweep failed");
            }
        }
    }
}

impl Sink for FileSink {
    fn min_level(&self) -> Level {
        self.min_level
    }

    fn write(&self, record: &Record) -> Result<()> {
        let line = self.format.render(record)?;
        let incoming = line.len() as u64;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.detached {
            self.reattach(&mut state)?;
        }
        if self.needs_rotation(state.size, incoming) {
            if let Err(err) = self.rotate(&mut state) {
                tracing::warn!(target: INTERNAL_TARGET, error = %err, "rotation failed");
            }
        }

        state
            .file
            .write_all(line.as_bytes())
            .map_err(|e| io_error(LogErrorKind::Write, "file_write", &self.path, e))?;
        state.size += incoming;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .file
            .flush()
            .map_err(|e| io_error(LogErrorKind::Write, "file_flush", &self.path, e))
    }

    fn describe(&self) -> String {
        format!("file({})", self.path.display())
    }
}
