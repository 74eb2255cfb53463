//! `kintai-logs`: Bounded log storage.
//!
//! Each logical log name owns a generation chain `<name>.log` →
//! `<name>.log.1` → … → `<name>.log.N`. Rotation is size-triggered and keeps
//! at most N numbered generations. Once a day the active files are copied
//! into a date-named archive bucket; buckets past the retention window are
//! deleted.
//!
//! The running process appends through a [`LogStream`], which implements
//! `tracing_subscriber::fmt::MakeWriter` and swaps its file handle during
//! rotation so writes always land in the active file.

pub mod archive;
pub mod error;
pub mod registry;
pub mod rotation;
pub mod stream;
pub mod tail;

pub use error::{LogError, Result};
pub use registry::{LogExcerpt, LogRegistry};
pub use stream::LogStream;
