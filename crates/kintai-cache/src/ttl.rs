use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use kintai_core::clock::{Clock, SystemClock};
use tracing::debug;

/// A stored value and the instant it was written.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
}

/// Expiring key → value store.
///
/// Thread-safe: `DashMap` locks per shard, so a `put` replaces an entry in
/// one step and a concurrent `get` sees either the old or the new value.
/// No lock is held across an await point by callers, because both operations
/// are synchronous.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: StdDuration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: StdDuration, clock: Arc<dyn Clock>) -> Self {
        let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self {
            entries: DashMap::new(),
            ttl: Duration::milliseconds(millis),
            clock,
        }
    }

    /// Return the value for `key` if it was stored less than one TTL ago.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Like [`get`](Self::get) but also returns when the value was stored.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.get(key)?;
        if self.is_fresh(entry.stored_at) {
            Some(entry.value().clone())
        } else {
            debug!(key, "cache entry stale");
            None
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        self.entries.insert(key.into(), entry);
    }

    /// Drop every stale entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = self.clock.now();
        self.entries
            .retain(|_, entry| now.signed_duration_since(entry.stored_at) < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn ttl(&self) -> StdDuration {
        self.ttl.to_std().unwrap_or_default()
    }

    /// Number of stored entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>) -> bool {
        self.clock.now().signed_duration_since(stored_at) < self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::params_key;
    use chrono::TimeZone;
    use kintai_core::clock::ManualClock;

    fn cache_with_clock(ttl_secs: u64) -> (TtlCache<String>, Arc<ManualClock>) {
        let start = Utc.with_ymd_and_hms(2026, 2, 10, 8, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let cache = TtlCache::with_clock(StdDuration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn get_after_put_hits() {
        let (cache, _clock) = cache_with_clock(300);
        cache.put("months=2026-02", "rows".to_string());
        assert_eq!(cache.get("months=2026-02"), Some("rows".to_string()));
    }

    #[test]
    fn entry_expires_once_ttl_elapses() {
        let (cache, clock) = cache_with_clock(300);
        cache.put("k", "v".to_string());

        clock.advance(Duration::seconds(299));
        assert!(cache.get("k").is_some());

        clock.advance(Duration::seconds(1));
        assert!(cache.get("k").is_none(), "now - storedAt == TTL is stale");
    }

    #[test]
    fn stale_read_does_not_remove_entry() {
        let (cache, clock) = cache_with_clock(10);
        cache.put("k", "v".to_string());
        clock.advance(Duration::seconds(11));

        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn put_resets_stored_at() {
        let (cache, clock) = cache_with_clock(60);
        cache.put("k", "old".to_string());
        clock.advance(Duration::seconds(50));
        cache.put("k", "new".to_string());
        clock.advance(Duration::seconds(50));

        assert_eq!(cache.get("k"), Some("new".to_string()));
    }

    #[test]
    fn reordered_parameter_lists_share_an_entry() {
        let (cache, _clock) = cache_with_clock(300);
        cache.put(params_key([("months", "a,b")]), "hit".to_string());

        assert_eq!(
            cache.get(&params_key([("months", "b,a")])),
            Some("hit".to_string())
        );
    }

    #[test]
    fn purge_removes_only_stale_entries() {
        let (cache, clock) = cache_with_clock(60);
        cache.put("old", "1".to_string());
        clock.advance(Duration::seconds(61));
        cache.put("new", "2".to_string());

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").is_some());
    }

    #[test]
    fn size_grows_only_with_distinct_keys() {
        let (cache, _clock) = cache_with_clock(60);
        for _ in 0..10 {
            cache.put(params_key([("months", "2026-01,2026-02")]), "x".to_string());
            cache.put(params_key([("months", "2026-02,2026-01")]), "x".to_string());
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_readers_never_see_torn_values() {
        let (cache, _clock) = cache_with_clock(600);
        let cache = Arc::new(cache);
        cache.put("k", "a".repeat(64));

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let ch = if i % 2 == 0 { "a" } else { "b" };
                    for _ in 0..500 {
                        cache.put("k", ch.repeat(64));
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let v = cache.get("k").expect("always present");
                        assert!(v == "a".repeat(64) || v == "b".repeat(64));
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().expect("thread");
        }
    }
}
