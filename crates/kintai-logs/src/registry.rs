use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Days, NaiveDate};
use kintai_core::config::{KintaiConfig, LogsConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::archive::{self, DATE_FORMAT};
use crate::error::{LogError, Result};
use crate::rotation;
use crate::stream::LogStream;
use crate::tail::tail_lines;

/// Tail of one log, live or archived.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogExcerpt {
    pub stream: String,
    /// Archive bucket the lines came from; `None` for the active file.
    pub date: Option<String>,
    pub lines: Vec<String>,
}

/// The fixed set of named log streams plus their rotation and archival policy.
pub struct LogRegistry {
    log_dir: PathBuf,
    archive_dir: PathBuf,
    policy: LogsConfig,
    /// Streams this process writes to. Others (e.g. the watchdog's) are
    /// rotated by path only.
    owned: Mutex<HashMap<String, LogStream>>,
}

impl LogRegistry {
    pub fn new(log_dir: PathBuf, archive_dir: PathBuf, policy: LogsConfig) -> Self {
        Self {
            log_dir,
            archive_dir,
            policy,
            owned: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &KintaiConfig) -> Self {
        Self::new(config.log_dir(), config.archive_dir(), config.logs.clone())
    }

    pub fn streams(&self) -> &[String] {
        &self.policy.streams
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Open a stream for writing from this process. Repeated calls return
    /// the same handle.
    pub fn open_stream(&self, name: &str) -> Result<LogStream> {
        self.ensure_known(name)?;
        let mut owned = self.owned.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(stream) = owned.get(name) {
            return Ok(stream.clone());
        }
        let stream = LogStream::open(&self.log_dir, name)?;
        owned.insert(name.to_string(), stream.clone());
        Ok(stream)
    }

    pub fn active_path(&self, name: &str) -> Result<PathBuf> {
        self.ensure_known(name)?;
        Ok(self.log_dir.join(format!("{name}.log")))
    }

    /// Rotate every stream whose active file is over the size threshold.
    ///
    /// All streams are attempted; the last failure, if any, is returned
    /// after the pass completes.
    pub fn rotate_all(&self) -> Result<Vec<String>> {
        let mut rotated = Vec::new();
        let mut failure = None;

        for name in &self.policy.streams {
            match self.rotate_one(name) {
                Ok(true) => rotated.push(name.clone()),
                Ok(false) => {}
                Err(e) => {
                    warn!(stream = %name, "log rotation failed: {e}");
                    failure = Some(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(rotated),
        }
    }

    fn rotate_one(&self, name: &str) -> Result<bool> {
        let owned = self
            .owned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned();
        match owned {
            Some(stream) => stream.rotate_if_over(self.policy.max_bytes, self.policy.generations),
            None => {
                let path = self.active_path(name)?;
                if !rotation::needs_rotation(&path, self.policy.max_bytes) {
                    return Ok(false);
                }
                rotation::rotate_path(&path, self.policy.generations)?;
                info!(stream = name, generations = self.policy.generations, "log rotated");
                Ok(true)
            }
        }
    }

    /// Copy the active logs into the bucket for the day before `today` and
    /// drop buckets outside the retention window.
    pub fn archive_previous_day(&self, today: NaiveDate) -> Result<PathBuf> {
        let day = today.checked_sub_days(Days::new(1)).unwrap_or(today);
        let (bucket, _) =
            archive::archive_day(&self.log_dir, &self.archive_dir, day, &self.policy.streams)?;
        let pruned = archive::prune_archives(&self.archive_dir, today, self.policy.retention_days)?;
        info!(bucket = %bucket.display(), pruned = pruned.len(), "daily archival done");
        Ok(bucket)
    }

    /// Last `lines` lines of `stream`, from the active file or from the
    /// archive bucket for `date`.
    pub fn read(&self, stream: &str, lines: usize, date: Option<&str>) -> Result<LogExcerpt> {
        let active = self.active_path(stream)?;

        let (path, date) = match date {
            None => (active, None),
            Some(raw) => {
                let parsed = NaiveDate::parse_from_str(raw, DATE_FORMAT)
                    .map_err(|_| LogError::InvalidDate(raw.to_string()))?;
                let bucket = parsed.format(DATE_FORMAT).to_string();
                let path = self.archive_dir.join(&bucket).join(format!("{stream}.log"));
                if !path.exists() {
                    return Err(LogError::NotArchived {
                        stream: stream.to_string(),
                        date: bucket,
                    });
                }
                (path, Some(bucket))
            }
        };

        let lines = if path.exists() {
            tail_lines(&path, lines)?
        } else {
            Vec::new()
        };

        Ok(LogExcerpt {
            stream: stream.to_string(),
            date,
            lines,
        })
    }

    /// Archive bucket dates, newest first.
    pub fn dates(&self) -> Vec<String> {
        archive::list_dates(&self.archive_dir)
    }

    fn ensure_known(&self, name: &str) -> Result<()> {
        if self.policy.streams.iter().any(|s| s == name) {
            Ok(())
        } else {
            Err(LogError::UnknownStream(name.to_string()))
        }
    }
}
