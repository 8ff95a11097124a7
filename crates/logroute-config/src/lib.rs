//! Settings provider for logroute
//!
//! Builds an immutable [`Settings`] snapshot from, in increasing precedence:
//! built-in defaults, an optional `.env` file, the process environment and
//! explicit overrides. Keys are case-insensitive (`LOG_LEVEL` and `log_level`
//! are the same setting).
//!
//! # Usage
//!
//! ```no_run
//! use logroute_config::Settings;
//!
//! let settings = Settings::load().expect("settings");
//! println!("logging to {}", settings.log_dir.display());
//! ```

use config::{Config, Environment, Map};
use logroute_core_types::{ByteSize, Level, Retention};
use logroute_errors::{config_error, LogError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENV_FILE: &str = ".env";

pub const DEFAULT_FORMAT: &str = "<green>{time:YYYY-MM-DD HH:mm:ss}</green> | <level>{level: <8}</level> | <cyan>{name}</cyan>:<cyan>{function}</cyan>:<cyan>{line}</cyan> - <level>{message}</level>";

/// Application settings relevant to logging
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub debug: bool,
    pub log_level: Level,
    pub log_dir: PathBuf,
    #[serde(rename = "log_rotation", alias = "rotation_size")]
    pub rotation_size: ByteSize,
    #[serde(rename = "log_retention", alias = "retention_period")]
    pub retention_period: Retention,
    #[serde(rename = "log_format", alias = "format_template")]
    pub format_template: String,
    #[serde(rename = "log_serialize", alias = "serialize_json")]
    pub serialize_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "My App".to_string(),
            debug: false,
            log_level: Level::Info,
            log_dir: PathBuf::from("logs"),
            rotation_size: ByteSize::from_bytes(10_000_000),
            retention_period: Retention::Age(std::time::Duration::from_secs(30 * 24 * 60 * 60)),
            format_template: DEFAULT_FORMAT.to_string(),
            serialize_json: false,
        }
    }
}

impl Settings {
    /// Load settings from `.env` (if present) and the process environment
    pub fn load() -> Result<Self> {
        SettingsLoader::new().load()
    }
}

/// Builder controlling where settings are read from
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    env_file: Option<PathBuf>,
    process_env: bool,
    overrides: Map<String, String>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            env_file: Some(PathBuf::from(DEFAULT_ENV_FILE)),
            process_env: true,
            overrides: Map::new(),
        }
    }

    /// Read additional variables from this file; a missing file is ignored
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn without_env_file(mut self) -> Self {
        self.env_file = None;
        self
    }

    pub fn without_process_env(mut self) -> Self {
        self.process_env = false;
        self
    }

    /// Set a variable with the highest precedence
    pub fn var(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.overrides
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Build the settings snapshot
    pub fn load(self) -> Result<Settings> {
        let mut builder = Config::builder();

        if let Some(path) = &self.env_file {
            if let Some(vars) = read_env_file(path)? {
                builder = builder.add_source(Environment::default().source(Some(vars)));
            }
        }
        if self.process_env {
            builder = builder.add_source(Environment::default());
        }
        if !self.overrides.is_empty() {
            builder = builder.add_source(Environment::default().source(Some(self.overrides)));
        }

        let settings: Settings = builder
            .build()
            .and_then(Config::try_deserialize::<Settings>)
            .map_err(|e| config_error("load_settings", e.to_string()).with_source(e))?;

        validate(&settings)?;
        Ok(settings)
    }
}

fn read_env_file(path: &Path) -> Result<Option<Map<String, String>>> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(None),
        Err(e) => return Err(env_file_error(path, e)),
    };

    let mut vars = Map::new();
    for item in iter {
        let (key, value) = item.map_err(|e| env_file_error(path, e))?;
        vars.insert(key.to_ascii_lowercase(), value);
    }
    Ok(Some(vars))
}

fn env_file_error(path: &Path, err: dotenvy::Error) -> LogError {
    config_error("read_env_file", err.to_string())
        .with_path(path)
        .with_source(err)
}

fn validate(settings: &Settings) -> Result<()> {
    if settings.format_template.trim().is_empty() {
        return Err(config_error("validate_settings", "log_format must not be empty"));
    }
    if settings.log_dir.as_os_str().is_empty() {
        return Err(config_error("validate_settings", "log_dir must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "My App");
        assert!(!settings.debug);
        assert_eq!(settings.log_level, Level::Info);
        assert_eq!(settings.log_dir, PathBuf::from("logs"));
        assert_eq!(settings.rotation_size.to_string(), "10 MB");
        assert_eq!(settings.retention_period.to_string(), "1 month");
        assert!(!settings.serialize_json);
        assert!(settings.format_template.contains("{message}"));
    }

    #[test]
    fn test_empty_format_is_rejected() {
        let settings = Settings {
            format_template: "  ".to_string(),
            ..Settings::default()
        };
        assert_eq!(validate(&settings).unwrap_err().code(), "ERR_CONFIGURATION");
    }
}
