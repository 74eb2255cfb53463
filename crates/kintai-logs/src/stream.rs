use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::Result;
use crate::rotation;

/// Append-only handle on one logical log file, shared by every writer in the
/// process.
///
/// Rotation happens under the same mutex that guards appends, so a line is
/// written either entirely before or entirely after the swap.
#[derive(Clone)]
pub struct LogStream {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl LogStream {
    /// Open (or create) `<dir>/<name>.log` for appending.
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.log"));
        let file = open_append(&path)?;
        Ok(Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                path,
                file: Mutex::new(file),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Append one line (a trailing newline is added).
    pub fn append_line(&self, line: &str) -> Result<()> {
        let mut file = self.lock();
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Rotate when the active file is larger than `max_bytes`.
    /// Returns whether a rotation happened.
    pub fn rotate_if_over(&self, max_bytes: u64, generations: usize) -> Result<bool> {
        {
            let mut file = self.lock();
            if !rotation::needs_rotation(&self.inner.path, max_bytes) {
                return Ok(false);
            }
            file.flush()?;
            rotation::rotate_path(&self.inner.path, generations)?;
            *file = open_append(&self.inner.path)?;
        }
        // the subscriber may write through this stream; log only once unlocked
        info!(stream = %self.inner.name, generations, "log rotated");
        Ok(true)
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        self.inner.file.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Writer handed to `tracing_subscriber` for a single event.
pub struct StreamWriter<'a> {
    file: MutexGuard<'a, File>,
}

impl Write for StreamWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl<'a> MakeWriter<'a> for LogStream {
    type Writer = StreamWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        StreamWriter { file: self.lock() }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
