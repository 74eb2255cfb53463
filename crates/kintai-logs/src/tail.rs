//! Reading the end of a log file.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// Return the last `lines` lines of `path`. Invalid UTF-8 is replaced.
///
/// The whole file is read; rotation keeps active files small enough that
/// this stays cheap.
pub fn tail_lines(path: &Path, lines: usize) -> Result<Vec<String>> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].iter().map(|s| s.to_string()).collect())
}
