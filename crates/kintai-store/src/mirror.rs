//! Durable mirror directory for one document: `<backup_dir>/<key>/`.
//!
//! Holds `<key>_current.json` (always the latest save) and timestamped
//! generations `<key>_<stamp>.json`, capped by count.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::atomic;
use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub size: u64,
    /// RFC 3339 modification time.
    pub modified: String,
}

pub fn current_name(key: &str) -> String {
    format!("{key}_current.json")
}

/// Write the current copy and one new generation. Returns the generation's
/// file name.
pub(crate) fn write(dir: &Path, key: &str, value: &Value, stamp: &str) -> Result<String> {
    fs::create_dir_all(dir)?;
    atomic::write_json(&dir.join(current_name(key)), value)?;

    let generation = atomic::free_path(dir, &format!("{key}_{stamp}"), ".json");
    atomic::write_json(&generation, value)?;
    Ok(file_name(&generation))
}

/// Delete the oldest generations (by modification time, then name) beyond
/// `keep`. The current copy is never counted or removed.
pub(crate) fn prune(dir: &Path, key: &str, keep: usize) -> Result<Vec<String>> {
    let mut generations = generations(dir, key)?;
    if generations.len() <= keep {
        return Ok(Vec::new());
    }
    generations.sort_by(|a, b| (a.1, &a.0).cmp(&(b.1, &b.0)));

    let excess = generations.len() - keep;
    let mut removed = Vec::with_capacity(excess);
    for (name, _) in generations.into_iter().take(excess) {
        match fs::remove_file(dir.join(&name)) {
            Ok(()) => removed.push(name),
            Err(e) => warn!(backup = %name, "failed to prune mirror generation: {e}"),
        }
    }
    debug!(key, removed = removed.len(), "mirror generations pruned");
    Ok(removed)
}

/// Every `.json` file in the mirror directory, newest first.
pub fn list(dir: &Path) -> Vec<BackupInfo> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut found: Vec<(String, u64, SystemTime)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !name.ends_with(".json") {
                return None;
            }
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            Some((name, meta.len(), meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)))
        })
        .collect();
    found.sort_by(|a, b| (b.2, &b.0).cmp(&(a.2, &a.0)));

    found
        .into_iter()
        .map(|(name, size, modified)| BackupInfo {
            name,
            size,
            modified: DateTime::<Utc>::from(modified).to_rfc3339(),
        })
        .collect()
}

/// A backup name must be a bare `<key>_….json` file name.
pub fn validate_name(key: &str, name: &str) -> Result<()> {
    let bare = !name.contains('/') && !name.contains('\\') && !name.contains("..");
    if bare && name.starts_with(&format!("{key}_")) && name.ends_with(".json") {
        Ok(())
    } else {
        Err(StoreError::InvalidBackupName(name.to_string()))
    }
}

pub(crate) fn path_for(dir: &Path, key: &str, name: &str) -> Result<PathBuf> {
    validate_name(key, name)?;
    Ok(dir.join(name))
}

fn generations(dir: &Path, key: &str) -> Result<Vec<(String, SystemTime)>> {
    let prefix = format!("{key}_");
    let current = current_name(key);
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == current || !name.starts_with(&prefix) || !name.ends_with(".json") {
                return None;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            Some((name, modified))
        })
        .collect())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
