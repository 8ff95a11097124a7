//! Error facility for logroute
//!
//! Every failure surfaced by configuration or by the logging facility is a
//! [`LogError`]: a stable [`LogErrorKind`] (with an `ERR_*` code usable in
//! tests and tooling), the operation that failed, an optional filesystem
//! path, a human-readable message and an optional underlying source.

use logroute_core_types::{ParseLevelError, ParseRetentionError, ParseSizeError};
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Canonical error kind taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogErrorKind {
    // Configuration
    Configuration,
    InvalidLevel,
    InvalidSize,
    InvalidRetention,
    InvalidTemplate,

    // Resources (fatal at setup)
    CreateDir,
    OpenSink,

    // Dispatch (isolated per sink)
    Write,
    Rotate,
    Compress,
    Retention,
    Serialization,

    // Internal
    Internal,
}

impl LogErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            LogErrorKind::Configuration => "ERR_CONFIGURATION",
            LogErrorKind::InvalidLevel => "ERR_INVALID_LEVEL",
            LogErrorKind::InvalidSize => "ERR_INVALID_SIZE",
            LogErrorKind::InvalidRetention => "ERR_INVALID_RETENTION",
            LogErrorKind::InvalidTemplate => "ERR_INVALID_TEMPLATE",
            LogErrorKind::CreateDir => "ERR_CREATE_DIR",
            LogErrorKind::OpenSink => "ERR_OPEN_SINK",
            LogErrorKind::Write => "ERR_WRITE",
            LogErrorKind::Rotate => "ERR_ROTATE",
            LogErrorKind::Compress => "ERR_COMPRESS",
            LogErrorKind::Retention => "ERR_RETENTION",
            LogErrorKind::Serialization => "ERR_SERIALIZATION",
            LogErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether this kind aborts setup rather than being isolated to one sink
    pub fn is_fatal_at_setup(&self) -> bool {
        !matches!(
            self,
            LogErrorKind::Write
                | LogErrorKind::Rotate
                | LogErrorKind::Compress
                | LogErrorKind::Retention
                | LogErrorKind::Serialization
        )
    }
}

/// Canonical structured error type
#[derive(Debug, Clone)]
pub struct LogError {
    kind: LogErrorKind,
    op: Option<String>,
    path: Option<PathBuf>,
    message: String,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl LogError {
    /// Create a new error with the specified kind
    pub fn new(kind: LogErrorKind) -> Self {
        Self {
            kind,
            op: None,
            path: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add path context
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn kind(&self) -> LogErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl StdError for LogError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

// ========== Constructors ==========

/// Create an IO error for the given operation and path
pub fn io_error(kind: LogErrorKind, op: &str, path: &Path, err: std::io::Error) -> LogError {
    LogError::new(kind)
        .with_op(op)
        .with_path(path)
        .with_message(err.to_string())
        .with_source(err)
}

/// Create a configuration error
pub fn config_error(op: &str, message: impl Into<String>) -> LogError {
    LogError::new(LogErrorKind::Configuration)
        .with_op(op)
        .with_message(message)
}

/// Create a template error
pub fn template_error(template: &str, reason: impl Into<String>) -> LogError {
    LogError::new(LogErrorKind::InvalidTemplate)
        .with_op("parse_template")
        .with_message(format!("{} in template {:?}", reason.into(), template))
}

impl From<ParseLevelError> for LogError {
    fn from(err: ParseLevelError) -> Self {
        LogError::new(LogErrorKind::InvalidLevel)
            .with_op("parse_level")
            .with_message(err.to_string())
            .with_source(err)
    }
}

impl From<ParseSizeError> for LogError {
    fn from(err: ParseSizeError) -> Self {
        LogError::new(LogErrorKind::InvalidSize)
            .with_op("parse_size")
            .with_message(err.to_string())
            .with_source(err)
    }
}

impl From<ParseRetentionError> for LogError {
    fn from(err: ParseRetentionError) -> Self {
        LogError::new(LogErrorKind::InvalidRetention)
            .with_op("parse_retention")
            .with_message(err.to_string())
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logroute_core_types::{ByteSize, Level};

    #[test]
    fn test_kind_codes_are_unique() {
        let kinds = [
            LogErrorKind::Configuration,
            LogErrorKind::InvalidLevel,
            LogErrorKind::InvalidSize,
            LogErrorKind::InvalidRetention,
            LogErrorKind::InvalidTemplate,
            LogErrorKind::CreateDir,
            LogErrorKind::OpenSink,
            LogErrorKind::Write,
            LogErrorKind::Rotate,
            LogErrorKind::Compress,
            LogErrorKind::Retention,
            LogErrorKind::Serialization,
            LogErrorKind::Internal,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_resource_errors_are_fatal_dispatch_errors_are_not() {
        assert!(LogErrorKind::CreateDir.is_fatal_at_setup());
        assert!(LogErrorKind::OpenSink.is_fatal_at_setup());
        assert!(!LogErrorKind::Write.is_fatal_at_setup());
        assert!(!LogErrorKind::Rotate.is_fatal_at_setup());
    }

    #[test]
    fn test_io_error_keeps_path_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = io_error(LogErrorKind::CreateDir, "create_log_dir", Path::new("/x"), io);

        assert_eq!(err.code(), "ERR_CREATE_DIR");
        assert_eq!(err.op(), Some("create_log_dir"));
        assert_eq!(err.path(), Some(Path::new("/x")));
        assert!(err.source().is_some());

        let rendered = err.to_string();
        assert!(rendered.contains("ERR_CREATE_DIR"));
        assert!(rendered.contains("denied"));
        assert!(rendered.contains("/x"));
    }

    #[test]
    fn test_parse_errors_convert_with_kind() {
        let err: LogError = "LOUD".parse::<Level>().unwrap_err().into();
        assert_eq!(err.kind(), LogErrorKind::InvalidLevel);

        let err: LogError = "ten".parse::<ByteSize>().unwrap_err().into();
        assert_eq!(err.kind(), LogErrorKind::InvalidSize);
    }
}
