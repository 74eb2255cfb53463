use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use kintai_core::config::{KintaiConfig, StoreConfig};
use kintai_core::Clock;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::atomic;
use crate::error::{Result, StoreError};
use crate::mirror::{self, BackupInfo};

/// Suffix format for backup file names; sorts chronologically.
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";
const HISTORY_DIR: &str = "history";
const SNAPSHOT_DIR: &str = "snapshots";

/// Outcome of a save. A failed mirror write is reported here rather than
/// failing the save.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub saved_at: String,
    /// Local history file the previous version went to.
    pub local_backup: Option<String>,
    /// Mirror generation written for this save.
    pub mirrored: Option<String>,
    pub mirror_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub restored_from: String,
    pub restored_at: String,
    pub local_backup: Option<String>,
}

/// Keyed JSON documents on disk.
///
/// Writers of one key (save, restore, manual backup) are serialized by a
/// per-key lock, so history rotation, the primary write and mirroring happen
/// as one step. Reads take no lock; files are only ever replaced by rename.
pub struct DocumentStore {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    local_generations: usize,
    mirror_generations: usize,
    mirrored: Vec<String>,
    clock: Arc<dyn Clock>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DocumentStore {
    pub fn new(
        data_dir: PathBuf,
        backup_dir: PathBuf,
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            data_dir,
            backup_dir,
            local_generations: config.local_generations,
            mirror_generations: config.mirror_generations,
            mirrored: config.mirrored.clone(),
            clock,
            locks: DashMap::new(),
        }
    }

    pub fn from_config(config: &KintaiConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.data_dir(), config.backup_dir(), &config.store, clock)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn is_mirrored(&self, key: &str) -> bool {
        self.mirrored.iter().any(|k| k == key)
    }

    /// The document backup endpoints act on when none is named.
    pub fn default_mirrored(&self) -> Option<&str> {
        self.mirrored.first().map(String::as_str)
    }

    pub fn mirror_dir(&self, key: &str) -> PathBuf {
        self.backup_dir.join(key)
    }

    /// Local undo history of one document.
    pub fn history_dir(&self, key: &str) -> PathBuf {
        self.data_dir.join(HISTORY_DIR).join(key)
    }

    pub fn document_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.data_dir.join(format!("{key}.json")))
    }

    /// Current document, or `{}` when none has been saved yet.
    pub fn load(&self, key: &str) -> Result<Value> {
        let path = self.document_path(key)?;
        if !path.exists() {
            return Ok(Value::Object(Map::new()));
        }
        read_json(&path)
    }

    /// Persist `document` (a JSON object) under `key`, stamping `savedAt`.
    pub fn save(&self, key: &str, document: Value) -> Result<SaveReport> {
        let path = self.document_path(key)?;
        let Value::Object(mut map) = document else {
            return Err(StoreError::NotAnObject);
        };
        let lock = self.key_lock(key);
        let _guard = hold(&lock);

        let now = self.clock.now();
        let stamp = now.format(STAMP_FORMAT).to_string();
        let saved_at = rfc3339(now);
        map.insert("savedAt".to_string(), Value::String(saved_at.clone()));
        let document = Value::Object(map);

        let local_backup = self.rotate_local(key, &path, &stamp)?;
        atomic::write_json(&path, &document)?;

        let (mirrored, mirror_error) = if self.is_mirrored(key) {
            match self.mirror(key, &document, &stamp) {
                Ok(name) => (Some(name), None),
                Err(e) => {
                    warn!(key, "mirror backup failed: {e}");
                    (None, Some(e.to_string()))
                }
            }
        } else {
            (None, None)
        };

        info!(key, saved_at = %saved_at, mirrored = mirrored.is_some(), "document saved");
        Ok(SaveReport {
            saved_at,
            local_backup,
            mirrored,
            mirror_error,
        })
    }

    /// Mirror the current document without changing it. Returns the new
    /// generation's name.
    pub fn backup_now(&self, key: &str) -> Result<String> {
        let path = self.document_path(key)?;
        let lock = self.key_lock(key);
        let _guard = hold(&lock);
        if !path.exists() {
            return Err(StoreError::NotFound(format!("document {key}")));
        }
        let document = read_json(&path)?;
        let stamp = self.clock.now().format(STAMP_FORMAT).to_string();
        let name = self.mirror(key, &document, &stamp)?;
        info!(key, backup = %name, "manual backup written");
        Ok(name)
    }

    /// Mirrored copies of `key`, newest first.
    pub fn list_backups(&self, key: &str) -> Result<Vec<BackupInfo>> {
        validate_key(key)?;
        Ok(mirror::list(&self.mirror_dir(key)))
    }

    pub fn read_backup(&self, key: &str, name: &str) -> Result<Value> {
        validate_key(key)?;
        let path = mirror::path_for(&self.mirror_dir(key), key, name)?;
        if !path.exists() {
            return Err(StoreError::NotFound(format!("backup {name}")));
        }
        read_json(&path)
    }

    /// Replace the document with a mirrored backup (`None` = the current
    /// mirror copy). The replaced version goes to local history first.
    pub fn restore(&self, key: &str, name: Option<&str>) -> Result<RestoreReport> {
        let path = self.document_path(key)?;
        let name = name
            .map(String::from)
            .unwrap_or_else(|| mirror::current_name(key));
        let lock = self.key_lock(key);
        let _guard = hold(&lock);

        let backup = self.read_backup(key, &name)?;
        let mut map = match backup {
            Value::Object(map) if !map.is_empty() => map,
            _ => return Err(StoreError::UnusableBackup(name)),
        };

        let now = self.clock.now();
        let restored_at = rfc3339(now);
        let local_backup = self.rotate_local(key, &path, &now.format(STAMP_FORMAT).to_string())?;

        map.insert("restoredFrom".to_string(), Value::String(name.clone()));
        map.insert("restoredAt".to_string(), Value::String(restored_at.clone()));
        atomic::write_json(&path, &Value::Object(map))?;

        info!(key, from = %name, "document restored");
        Ok(RestoreReport {
            restored_from: name,
            restored_at,
            local_backup,
        })
    }

    /// Overwrite `<backup_dir>/snapshots/<name>.json` with `value`.
    pub fn snapshot(&self, name: &str, value: &Value) -> Result<PathBuf> {
        validate_key(name)?;
        let path = self.backup_dir.join(SNAPSHOT_DIR).join(format!("{name}.json"));
        atomic::write_json(&path, value)?;
        Ok(path)
    }

    /// True when the data directory can be created and written.
    pub fn probe_writable(&self) -> bool {
        let probe = self.data_dir.join(".write-probe");
        let ok = fs::create_dir_all(&self.data_dir).is_ok() && fs::write(&probe, b"ok").is_ok();
        let _ = fs::remove_file(&probe);
        ok
    }

    /// Copy the existing document into local history and prune it.
    fn rotate_local(&self, key: &str, primary: &Path, stamp: &str) -> Result<Option<String>> {
        if !primary.exists() {
            return Ok(None);
        }
        let history = self.history_dir(key);
        fs::create_dir_all(&history)?;

        let target = atomic::free_path(&history, &format!("{key}_{stamp}"), ".json");
        fs::copy(primary, &target)?;
        mirror::prune(&history, key, self.local_generations)?;

        Ok(target.file_name().map(|n| n.to_string_lossy().to_string()))
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key.to_string()).or_default().value())
    }

    fn mirror(&self, key: &str, document: &Value, stamp: &str) -> Result<String> {
        let dir = self.mirror_dir(key);
        let name = mirror::write(&dir, key, document, stamp)?;
        mirror::prune(&dir, key, self.mirror_generations)?;
        Ok(name)
    }
}

/// Keys name files directly, so only `[A-Za-z0-9_-]` is allowed.
pub fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|e| e.into_inner())
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use kintai_core::{ManualClock, SystemClock};
    use serde_json::json;

    struct Fixture {
        _dir: tempfile::TempDir,
        clock: Arc<ManualClock>,
        store: DocumentStore,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap(),
        ));
        let store = DocumentStore::new(
            dir.path().join("data"),
            dir.path().join("cloud"),
            &StoreConfig::default(),
            clock.clone(),
        );
        Fixture {
            _dir: dir,
            clock,
            store,
        }
    }

    fn count_files(dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.flatten().count()).unwrap_or(0)
    }

    #[test]
    fn absent_document_loads_as_empty_object() {
        let f = fixture();
        assert_eq!(f.store.load("calendar").unwrap(), json!({}));
    }

    #[test]
    fn save_then_load_adds_saved_at() {
        let f = fixture();
        let report = f
            .store
            .save("calendar", json!({"months": {"2026-02": {}}}))
            .unwrap();

        let loaded = f.store.load("calendar").unwrap();
        assert_eq!(loaded["months"], json!({"2026-02": {}}));
        assert_eq!(loaded["savedAt"], json!(report.saved_at));
        assert!(report.mirrored.is_some());
        assert!(report.local_backup.is_none());
    }

    #[test]
    fn corrupt_document_is_an_error_not_empty() {
        let f = fixture();
        fs::create_dir_all(f.store.data_dir()).unwrap();
        fs::write(f.store.document_path("calendar").unwrap(), "{not json").unwrap();
        assert!(matches!(
            f.store.load("calendar"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn keys_and_bodies_are_validated() {
        let f = fixture();
        assert!(matches!(f.store.load("../etc"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(
            f.store.save("calendar", json!([1, 2])),
            Err(StoreError::NotAnObject)
        ));
    }

    #[test]
    fn local_history_is_capped_at_three() {
        let f = fixture();
        for i in 0..6 {
            f.store.save("notes", json!({"n": i})).unwrap();
            f.clock.advance(Duration::seconds(1));
        }
        assert_eq!(count_files(&f.store.history_dir("notes")), 3);
        // not mirrored
        assert!(!f.store.mirror_dir("notes").exists());
    }

    #[test]
    fn prefix_keys_keep_separate_history() {
        let f = fixture();
        for i in 0..6 {
            f.store.save("cal_x", json!({"n": i})).unwrap();
            f.clock.advance(Duration::seconds(1));
        }
        for i in 0..5 {
            f.store.save("cal", json!({"n": i})).unwrap();
            f.clock.advance(Duration::seconds(1));
        }

        assert_eq!(count_files(&f.store.history_dir("cal_x")), 3);
        assert_eq!(count_files(&f.store.history_dir("cal")), 3);
    }

    #[test]
    fn concurrent_saves_and_loads_stay_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            mirrored: vec!["calendar".to_string()],
            ..StoreConfig::default()
        };
        let store = Arc::new(DocumentStore::new(
            dir.path().join("data"),
            dir.path().join("cloud"),
            &config,
            Arc::new(SystemClock),
        ));
        store.save("calendar", json!({"writer": -1, "i": 0})).unwrap();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let report = store.save("calendar", json!({"writer": w, "i": i})).unwrap();
                        assert!(report.mirror_error.is_none());
                    }
                })
            })
            .collect();
        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..2000 {
                    let doc = store.load("calendar").unwrap();
                    assert!(doc["savedAt"].is_string());
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(count_files(&store.history_dir("calendar")), 3);
        let mirrors = store.list_backups("calendar").unwrap();
        assert_eq!(mirrors.len(), 31);
        assert!(mirrors.iter().all(|b| !b.name.starts_with('.')));
    }

    #[test]
    fn concurrent_snapshots_all_succeed() {
        let f = Arc::new(fixture());
        let handles: Vec<_> = (0..4)
            .map(|w| {
                let f = Arc::clone(&f);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        f.store.snapshot("remote-data", &json!({"w": w, "i": i})).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let raw = fs::read_to_string(f.store.backup_dir().join(SNAPSHOT_DIR).join("remote-data.json")).unwrap();
        assert!(serde_json::from_str::<Value>(&raw).unwrap()["w"].is_i64());
    }

    #[test]
    fn thirty_five_saves_leave_thirty_newest_mirrors() {
        let f = fixture();
        let mut names = Vec::new();
        for i in 0..35 {
            let report = f.store.save("calendar", json!({"n": i})).unwrap();
            names.push(report.mirrored.unwrap());
            f.clock.advance(Duration::seconds(1));
        }

        let listed: Vec<String> = f
            .store
            .list_backups("calendar")
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .filter(|n| n != "calendar_current.json")
            .collect();
        assert_eq!(listed.len(), 30);

        let mut expected: Vec<String> = names[5..].to_vec();
        let mut actual = listed.clone();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }

    #[test]
    fn restore_from_mirror_round_trip() {
        let f = fixture();
        let first = f.store.save("calendar", json!({"v": 1})).unwrap();
        f.clock.advance(Duration::seconds(1));
        f.store.save("calendar", json!({"v": 2})).unwrap();
        f.clock.advance(Duration::seconds(1));

        let name = first.mirrored.unwrap();
        let report = f.store.restore("calendar", Some(name.as_str())).unwrap();

        let loaded = f.store.load("calendar").unwrap();
        assert_eq!(loaded["v"], json!(1));
        assert_eq!(loaded["savedAt"], json!(first.saved_at));
        assert_eq!(loaded["restoredFrom"], json!(name));
        assert_eq!(loaded["restoredAt"], json!(report.restored_at));
        assert!(report.local_backup.is_some());
    }

    #[test]
    fn restore_without_name_uses_current_mirror() {
        let f = fixture();
        f.store.save("calendar", json!({"v": 7})).unwrap();
        f.clock.advance(Duration::seconds(1));
        fs::write(f.store.document_path("calendar").unwrap(), "{}").unwrap();

        let report = f.store.restore("calendar", None).unwrap();
        assert_eq!(report.restored_from, "calendar_current.json");
        assert_eq!(f.store.load("calendar").unwrap()["v"], json!(7));
    }

    #[test]
    fn restore_rejects_empty_or_missing_backups() {
        let f = fixture();
        let dir = f.store.mirror_dir("calendar");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("calendar_empty.json"), "{}").unwrap();

        assert!(matches!(
            f.store.restore("calendar", Some("calendar_empty.json")),
            Err(StoreError::UnusableBackup(_))
        ));
        assert!(matches!(
            f.store.restore("calendar", Some("calendar_missing.json")),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            f.store.restore("calendar", Some("../../secret.json")),
            Err(StoreError::InvalidBackupName(_))
        ));
    }

    #[test]
    fn mirror_failure_does_not_fail_the_save() {
        let dir = tempfile::tempdir().unwrap();
        // backup dir is a regular file, so mirroring cannot create it
        let blocked = dir.path().join("cloud");
        fs::write(&blocked, "not a directory").unwrap();
        let store = DocumentStore::new(
            dir.path().join("data"),
            blocked,
            &StoreConfig::default(),
            Arc::new(ManualClock::default()),
        );

        let report = store.save("calendar", json!({"a": 1})).unwrap();
        assert!(report.mirrored.is_none());
        assert!(report.mirror_error.is_some());
        assert_eq!(store.load("calendar").unwrap()["a"], json!(1));
    }

    #[test]
    fn backup_now_mirrors_without_touching_document() {
        let f = fixture();
        assert!(matches!(f.store.backup_now("calendar"), Err(StoreError::NotFound(_))));

        f.store.save("calendar", json!({"a": 1})).unwrap();
        let before = f.store.load("calendar").unwrap();
        f.clock.advance(Duration::seconds(5));

        let name = f.store.backup_now("calendar").unwrap();
        assert_eq!(f.store.read_backup("calendar", &name).unwrap(), before);
        assert_eq!(f.store.load("calendar").unwrap(), before);
    }

    #[test]
    fn snapshot_overwrites_in_place() {
        let f = fixture();
        f.store.snapshot("remote-data", &json!({"run": 1})).unwrap();
        let path = f.store.snapshot("remote-data", &json!({"run": 2})).unwrap();
        let raw = fs::read_to_string(path).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&raw).unwrap(), json!({"run": 2}));
        assert!(f.store.probe_writable());
    }
}
