use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::Result;

/// Write `value` as pretty JSON into a uniquely named staging file beside
/// `path`, then rename it over `path`. Readers see either the old file or the
/// complete new one, and concurrent writers never share a staging file.
pub(crate) fn write_json(path: &Path, value: &Value) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let bytes = serde_json::to_vec_pretty(value)?;
    let mut staging = NamedTempFile::new_in(dir)?;
    staging.write_all(&bytes)?;
    staging.as_file().sync_all()?;
    staging.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// `<dir>/<stem><ext>`, or `<stem>-1<ext>`, `<stem>-2<ext>`… when taken.
pub(crate) fn free_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let first = dir.join(format!("{stem}{ext}"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{stem}-{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/doc.json");
        write_json(&path, &json!({"a": 1})).unwrap();

        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["doc.json".to_string()]);
    }

    #[test]
    fn concurrent_writers_never_expose_a_partial_file() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("snapshot.json"));
        write_json(&path, &json!({"writer": -1, "pad": "x".repeat(4096)})).unwrap();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    for _ in 0..50 {
                        write_json(&path, &json!({"writer": w, "pad": "x".repeat(4096)})).unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let raw = fs::read_to_string(path.as_path()).unwrap();
            let value: Value = serde_json::from_str(&raw).unwrap();
            assert!(value["writer"].is_i64());
        }
        for w in writers {
            w.join().unwrap();
        }

        let leftovers = fs::read_dir(dir.path()).unwrap().flatten().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn free_path_skips_taken_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("a-1.json"), "{}").unwrap();
        assert_eq!(free_path(dir.path(), "a", ".json"), dir.path().join("a-2.json"));
    }
}
