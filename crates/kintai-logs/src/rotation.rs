//! Size-triggered generation shifting.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// `<active>.<n>`, e.g. `server.log.2`.
pub fn generation_path(active: &Path, n: usize) -> PathBuf {
    let mut name = active.as_os_str().to_os_string();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// True when the active file exists and is larger than `max_bytes`.
pub fn needs_rotation(active: &Path, max_bytes: u64) -> bool {
    fs::metadata(active).is_ok_and(|m| m.len() > max_bytes)
}

/// Shift `.1 … .N-1` up by one (dropping `.N`), move the active file into
/// `.1`, and leave a fresh empty active file behind.
///
/// With `generations == 0` the active file is simply truncated.
///
/// Emits no tracing events: callers may hold the lock of a writer that the
/// subscriber itself writes through.
pub fn rotate_path(active: &Path, generations: usize) -> Result<()> {
    if generations == 0 {
        fs::File::create(active)?;
        return Ok(());
    }

    remove_if_exists(&generation_path(active, generations))?;
    for n in (1..generations).rev() {
        let from = generation_path(active, n);
        if from.exists() {
            fs::rename(&from, generation_path(active, n + 1))?;
        }
    }
    if active.exists() {
        fs::rename(active, generation_path(active, 1))?;
    }
    fs::File::create(active)?;
    Ok(())
}

/// Count the numbered generations currently on disk.
pub fn existing_generations(active: &Path, generations: usize) -> usize {
    (1..=generations + 1)
        .filter(|n| generation_path(active, *n).exists())
        .count()
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        fs::write(path, content).expect("write");
    }

    #[test]
    fn rotation_creates_first_generation_and_empties_active() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("server.log");
        write(&active, &"x".repeat(200));

        assert!(needs_rotation(&active, 100));
        rotate_path(&active, 3).unwrap();

        assert_eq!(fs::metadata(&active).unwrap().len(), 0);
        assert_eq!(fs::read_to_string(generation_path(&active, 1)).unwrap().len(), 200);
        assert_eq!(existing_generations(&active, 3), 1);
    }

    #[test]
    fn oldest_generation_is_dropped_past_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("server.log");
        let cap = 3;

        for i in 0..=cap {
            write(&active, &format!("round {i}"));
            rotate_path(&active, cap).unwrap();
        }

        assert_eq!(existing_generations(&active, cap), cap);
        assert!(!generation_path(&active, cap + 1).exists());
        assert_eq!(
            fs::read_to_string(generation_path(&active, 1)).unwrap(),
            format!("round {cap}")
        );
        // round 0 fell off the end
        assert_eq!(
            fs::read_to_string(generation_path(&active, cap)).unwrap(),
            "round 1"
        );
    }

    #[test]
    fn small_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("server.log");
        write(&active, "short");
        assert!(!needs_rotation(&active, 100));
        assert!(!needs_rotation(&dir.path().join("missing.log"), 0));
    }
}
