//! Archive naming, compression and retention for rotated log files
//!
//! An active file `app.log` rotates to `app.<YYYY-MM-DD_HH-MM-SS_ffffff>.log`
//! (with a `.N` disambiguator when that name is taken) which is then zipped to
//! `app.<timestamp>.log.zip`. Only files following this naming scheme are
//! considered by the retention sweep.

use chrono::{Duration as ChronoDuration, NaiveDateTime};
use logroute_core_types::Retention;
use logroute_errors::{io_error, LogError, LogErrorKind, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S_%6f";
const STAMP_LEN: usize = 26;
const ZIP_EXT: &str = "zip";

/// A rotated file belonging to an active log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    pub rotated_at: NaiveDateTime,
    /// Disambiguator for archives sharing a timestamp
    pub sequence: usize,
}

fn stem_and_ext(active: &Path) -> (String, Option<String>) {
    let stem = active
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = active.extension().map(|e| e.to_string_lossy().into_owned());
    (stem, ext)
}

fn archive_name(stem: &str, stamp: &str, counter: usize, ext: Option<&str>) -> String {
    let mut name = format!("{}.{}", stem, stamp);
    if counter > 0 {
        name.push_str(&format!(".{}", counter));
    }
    if let Some(ext) = ext {
        name.push('.');
        name.push_str(ext);
    }
    name
}

/// Pick an unused archive path for `active` rotated at `at`
pub fn archive_path(active: &Path, at: NaiveDateTime) -> PathBuf {
    let (stem, ext) = stem_and_ext(active);
    let dir = active.parent().unwrap_or_else(|| Path::new("."));
    let stamp = at.format(STAMP_FORMAT).to_string();

    let mut counter = 0;
    loop {
        let candidate = dir.join(archive_name(&stem, &stamp, counter, ext.as_deref()));
        let zipped = zip_path(&candidate);
        if !candidate.exists() && !zipped.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn zip_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ZIP_EXT);
    PathBuf::from(name)
}

fn compress_error(path: &Path, message: impl Into<String>) -> LogError {
    LogError::new(LogErrorKind::Compress)
        .with_op("compress_archive")
        .with_path(path)
        .with_message(message)
}

/// Zip `path` into `<path>.zip` and remove the original
pub fn compress_zip(path: &Path) -> Result<PathBuf> {
    let target = zip_path(path);
    let entry_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| compress_error(path, "archive has no file name"))?;

    let mut source =
        File::open(path).map_err(|e| io_error(LogErrorKind::Compress, "open_archive", path, e))?;
    let output =
        File::create(&target).map_err(|e| io_error(LogErrorKind::Compress, "create_zip", &target, e))?;

    let mut zip = ZipWriter::new(output);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry_name, options)
        .map_err(|e| compress_error(&target, e.to_string()).with_source(e))?;
    io::copy(&mut source, &mut zip)
        .map_err(|e| io_error(LogErrorKind::Compress, "write_zip", &target, e))?;
    zip.finish()
        .map_err(|e| compress_error(&target, e.to_string()).with_source(e))?;

    fs::remove_file(path).map_err(|e| io_error(LogErrorKind::Compress, "remove_archive", path, e))?;
    Ok(target)
}

fn parse_archive(file_name: &str, stem: &str, ext: Option<&str>) -> Option<(NaiveDateTime, usize)> {
    let rest = file_name.strip_prefix(stem)?.strip_prefix('.')?;
    let rest = rest.strip_suffix(".zip").unwrap_or(rest);
    let rest = match ext {
        Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.').unwrap_or(""),
        None => rest,
    };
    if rest.len() < STAMP_LEN || !rest.is_char_boundary(STAMP_LEN) {
        return None;
    }
    let (stamp, counter) = rest.split_at(STAMP_LEN);
    let sequence = if counter.is_empty() {
        0
    } else {
        let digits = counter.strip_prefix('.')?;
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()?
    };
    let rotated_at = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    Some((rotated_at, sequence))
}

/// Archives of `active`, oldest first
pub fn list_archives(active: &Path) -> Result<Vec<Archive>> {
    let (stem, ext) = stem_and_ext(active);
    let dir = active.parent().unwrap_or_else(|| Path::new("."));

    let entries =
        fs::read_dir(dir).map_err(|e| io_error(LogErrorKind::Retention, "list_archives", dir, e))?;

    let mut archives = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some((rotated_at, sequence)) = parse_archive(name, &stem, ext.as_deref()) {
            archives.push(Archive {
                path: entry.path(),
                rotated_at,
                sequence,
            });
        }
    }
    archives.sort_by_key(|a| (a.rotated_at, a.sequence));
    Ok(archives)
}

/// Delete archives of `active` that fall outside `retention`
///
/// Returns the removed paths.
pub fn apply_retention(active: &Path, retention: &Retention, now: NaiveDateTime) -> Result<Vec<PathBuf>> {
    let archives = list_archives(active)?;

    let doomed: Vec<&Archive> = match retention {
        Retention::Count(keep) => {
            let excess = archives.len().saturating_sub(*keep);
            archives.iter().take(excess).collect()
        }
        Retention::Age(max_age) => {
            let max_age = ChronoDuration::from_std(*max_age).unwrap_or(ChronoDuration::MAX);
            let cutoff = now.checked_sub_signed(max_age).unwrap_or(NaiveDateTime::MIN);
            archives.iter().filter(|a| a.rotated_at < cutoff).collect()
        }
    };

    let mut removed = Vec::with_capacity(doomed.len());
    for archive in doomed {
        fs::remove_file(&archive.path)
            .map_err(|e| io_error(LogErrorKind::Retention, "remove_archive", &archive.path, e))?;
        removed.push(archive.path.clone());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Read;
    use std::time::Duration;
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_micro_opt(hour, 0, 0, 123_456)
            .unwrap()
    }

    #[test]
    fn test_archive_path_format() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("app.log");
        let path = archive_path(&active, at(2, 13));
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "app.2024-01-02_13-00-00_123456.log"
        );
    }

    #[test]
    fn test_archive_path_avoids_collisions() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("app.log");
        fs::write(dir.path().join("app.2024-01-02_13-00-00_123456.log.zip"), b"x").unwrap();

        let path = archive_path(&active, at(2, 13));
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "app.2024-01-02_13-00-00_123456.1.log"
        );
    }

    #[test]
    fn test_parse_archive_names() {
        assert_eq!(
            parse_archive("app.2024-01-02_13-00-00_123456.log.zip", "app", Some("log")),
            Some((at(2, 13), 0))
        );
        assert_eq!(
            parse_archive("app.2024-01-02_13-00-00_123456.3.log", "app", Some("log")),
            Some((at(2, 13), 3))
        );
        assert_eq!(parse_archive("app.log", "app", Some("log")), None);
        assert_eq!(parse_archive("app.log.bak", "app", Some("log")), None);
        assert_eq!(
            parse_archive("error.2024-01-02_13-00-00_123456.log.zip", "app", Some("log")),
            None
        );
    }

    #[test]
    fn test_compress_zip_replaces_original() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("app.2024-01-02_13-00-00_123456.log");
        fs::write(&archive, b"line one\nline two\n").unwrap();

        let zipped = compress_zip(&archive).unwrap();
        assert!(!archive.exists());
        assert!(zipped.to_str().unwrap().ends_with(".log.zip"));

        let mut reader = zip::ZipArchive::new(File::open(&zipped).unwrap()).unwrap();
        let mut entry = reader.by_index(0).unwrap();
        assert_eq!(entry.name(), "app.2024-01-02_13-00-00_123456.log");
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "line one\nline two\n");
    }

    #[test]
    fn test_retention_by_age() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("app.log");
        fs::write(&active, b"").unwrap();
        for day in [1, 5, 9] {
            let path = dir.path().join(format!(
                "app.{}.log.zip",
                at(day, 0).format(STAMP_FORMAT)
            ));
            fs::write(path, b"z").unwrap();
        }
        fs::write(dir.path().join("error.2024-01-01_00-00-00_123456.log.zip"), b"z").unwrap();

        let removed = apply_retention(
            &active,
            &Retention::Age(Duration::from_secs(5 * 24 * 3600)),
            at(10, 0),
        )
        .unwrap();

        assert_eq!(removed.len(), 1);
        let remaining = list_archives(&active).unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].rotated_at, at(5, 0));
        assert!(active.exists());
        assert!(dir.path().join("error.2024-01-01_00-00-00_123456.log.zip").exists());
    }

    #[test]
    fn test_retention_by_count_keeps_newest() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("app.log");
        for day in 1..=4 {
            let path = dir.path().join(format!(
                "app.{}.log.zip",
                at(day, 0).format(STAMP_FORMAT)
            ));
            fs::write(path, b"z").unwrap();
        }

        apply_retention(&active, &Retention::Count(2), at(10, 0)).unwrap();

        let remaining: Vec<_> = list_archives(&active)
            .unwrap()
            .into_iter()
            .map(|a| a.rotated_at)
            .collect();
        assert_eq!(remaining, vec![at(3, 0), at(4, 0)]);
    }
}
