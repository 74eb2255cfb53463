//! Daily date-bucketed snapshots of the active logs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::Result;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Copy each stream's active file into `<archive_dir>/<date>/`.
///
/// Re-running for the same date overwrites the bucket's files in place, so
/// the bucket always holds the latest content and never gets duplicated.
/// Returns the bucket path and the number of files copied.
pub fn archive_day(
    log_dir: &Path,
    archive_dir: &Path,
    date: NaiveDate,
    streams: &[String],
) -> Result<(PathBuf, usize)> {
    let bucket = archive_dir.join(date.format(DATE_FORMAT).to_string());
    fs::create_dir_all(&bucket)?;

    let mut copied = 0;
    for name in streams {
        let file_name = format!("{name}.log");
        let source = log_dir.join(&file_name);
        if !source.exists() {
            continue;
        }
        // copy beside the target, then rename into place
        let staging = bucket.join(format!(".{file_name}.tmp"));
        fs::copy(&source, &staging)?;
        fs::rename(&staging, bucket.join(&file_name))?;
        copied += 1;
    }

    info!(bucket = %bucket.display(), copied, "logs archived");
    Ok((bucket, copied))
}

/// Delete buckets dated more than `retention_days` before `today`.
/// Directories whose name is not a date are ignored.
pub fn prune_archives(archive_dir: &Path, today: NaiveDate, retention_days: u32) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    let entries = match fs::read_dir(archive_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(removed),
        Err(e) => return Err(e.into()),
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        let Ok(date) = NaiveDate::parse_from_str(&name, DATE_FORMAT) else {
            continue;
        };
        if (today - date).num_days() > i64::from(retention_days) {
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => removed.push(name),
                Err(e) => warn!(bucket = %name, "failed to prune archive bucket: {e}"),
            }
        }
    }

    if !removed.is_empty() {
        info!(count = removed.len(), "expired archive buckets removed");
    }
    Ok(removed)
}

/// Archive bucket names, newest first.
pub fn list_dates(archive_dir: &Path) -> Vec<String> {
    let mut dates: Vec<String> = fs::read_dir(archive_dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.path().is_dir())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .filter(|name| NaiveDate::parse_from_str(name, DATE_FORMAT).is_ok())
                .collect()
        })
        .unwrap_or_default();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streams() -> Vec<String> {
        vec!["server".to_string(), "watchdog".to_string()]
    }

    #[test]
    fn archiving_twice_keeps_one_bucket_with_latest_content() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let archive = logs.join("archive");
        fs::create_dir_all(&logs).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();

        fs::write(logs.join("server.log"), "first").unwrap();
        archive_day(&logs, &archive, day, &streams()).unwrap();
        fs::write(logs.join("server.log"), "second").unwrap();
        let (bucket, copied) = archive_day(&logs, &archive, day, &streams()).unwrap();

        assert_eq!(copied, 1);
        assert_eq!(list_dates(&archive), vec!["2026-02-09".to_string()]);
        assert_eq!(fs::read_to_string(bucket.join("server.log")).unwrap(), "second");
        // source is copied, not moved
        assert!(logs.join("server.log").exists());
    }

    #[test]
    fn prune_respects_retention_window() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path();
        for name in ["2026-01-01", "2026-01-12", "2026-02-01", "notes"] {
            fs::create_dir_all(archive.join(name)).unwrap();
        }
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();

        let removed = prune_archives(archive, today, 30).unwrap();

        assert_eq!(removed, vec!["2026-01-01".to_string()]);
        assert_eq!(
            list_dates(archive),
            vec!["2026-02-01".to_string(), "2026-01-12".to_string()]
        );
        assert!(archive.join("notes").exists());
    }

    #[test]
    fn prune_on_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        assert!(prune_archives(&dir.path().join("absent"), today, 30).unwrap().is_empty());
    }
}
