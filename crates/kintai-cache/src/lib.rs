//! `kintai-cache`: In-memory TTL cache shared by the request handlers.
//!
//! Entries expire lazily: a read past the TTL behaves as a miss, and nothing
//! sweeps in the background. Keys are built from normalized request
//! parameters (see [`key`]) so logically identical requests share an entry.

pub mod key;
pub mod ttl;

pub use key::{normalize_list, params_key};
pub use ttl::{CacheEntry, TtlCache};
