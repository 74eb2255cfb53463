//! `kintai-store`: Small keyed JSON documents with bounded backup history.
//!
//! One file per document under the data directory. Every save first renames
//! the previous version into a local backup chain (capped), then writes the
//! new version with rename-into-place. Documents marked as mirrored also get
//! a durable copy in the backup directory: a fixed `<key>_current.json` plus
//! a timestamped generation, with the generation count capped.

mod atomic;
pub mod error;
pub mod mirror;
pub mod store;

pub use error::{Result, StoreError};
pub use mirror::BackupInfo;
pub use store::{DocumentStore, RestoreReport, SaveReport};
