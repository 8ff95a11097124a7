//! Sink descriptors derived from a settings snapshot

use crate::sink::{Compression, Destination, SinkSpec};
use logroute_config::Settings;
use logroute_core_types::Level;
use logroute_errors::{io_error, LogErrorKind, Result};
use std::fs;
use std::path::Path;

pub const APP_LOG: &str = "app.log";
pub const ERROR_LOG: &str = "error.log";

/// Create the log directory and its parents
///
/// # Errors
///
/// `CreateDir` when the directory cannot be created or the path exists but is
/// not a directory.
pub fn ensure_log_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| io_error(LogErrorKind::CreateDir, "create_log_dir", dir, e))
}

/// Build the console, general file and error file descriptors
///
/// Creates `settings.log_dir` as a side effect.
pub fn build_sinks(settings: &Settings) -> Result<Vec<SinkSpec>> {
    ensure_log_dir(&settings.log_dir)?;

    let template = settings.format_template.as_str();
    let rolling = |name: &str, level: Level| {
        SinkSpec::new(Destination::File(settings.log_dir.join(name)), level, template)
            .rotation(settings.rotation_size)
            .retention(settings.retention_period)
            .compression(Compression::Zip)
            .serialize_json(settings.serialize_json)
    };

    Ok(vec![
        SinkSpec::new(Destination::Stdout, settings.log_level, template)
            .colorize(true)
            .diagnose(settings.debug),
        rolling(APP_LOG, settings.log_level).diagnose(settings.debug),
        rolling(ERROR_LOG, Level::Error).diagnose(true),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &Path) -> Settings {
        Settings {
            log_dir: dir.join("nested").join("logs"),
            log_level: Level::Critical,
            ..Settings::default()
        }
    }

    #[test]
    fn test_three_sinks_in_order() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path());
        let specs = build_sinks(&settings).unwrap();

        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].destination, Destination::Stdout);
        assert!(specs[0].colorize);
        assert_eq!(
            specs[1].destination,
            Destination::File(settings.log_dir.join(APP_LOG))
        );
        assert_eq!(
            specs[2].destination,
            Destination::File(settings.log_dir.join(ERROR_LOG))
        );
    }

    #[test]
    fn test_error_sink_ignores_configured_level() {
        let dir = TempDir::new().unwrap();
        let specs = build_sinks(&settings(dir.path())).unwrap();

        assert_eq!(specs[0].min_level, Level::Critical);
        assert_eq!(specs[1].min_level, Level::Critical);
        assert_eq!(specs[2].min_level, Level::Error);
        assert!(specs[2].diagnose);
        assert!(!specs[1].diagnose);
    }

    #[test]
    fn test_file_sinks_share_policy() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path());
        let specs = build_sinks(&settings).unwrap();

        for spec in &specs[1..] {
            assert_eq!(spec.policy.rotation, Some(settings.rotation_size));
            assert_eq!(spec.policy.retention, Some(settings.retention_period));
            assert_eq!(spec.policy.compression, Some(Compression::Zip));
            assert!(!spec.colorize);
        }
        assert_eq!(specs[0].policy.rotation, None);
    }

    #[test]
    fn test_creates_directory_idempotently() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path());

        build_sinks(&settings).unwrap();
        build_sinks(&settings).unwrap();
        assert!(settings.log_dir.is_dir());
    }

    #[test]
    fn test_directory_over_file_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let err = ensure_log_dir(&blocker.join("logs")).unwrap_err();
        assert_eq!(err.kind(), LogErrorKind::CreateDir);
        assert_eq!(err.code(), "ERR_CREATE_DIR");
    }
}
