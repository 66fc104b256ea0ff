//! Process-wide expiring key/value cache.
//!
//! Entries are replaced atomically under a `parking_lot` lock. Nothing
//! spans more than one key, so a lost race between two writers only costs a
//! redundant recompute.

use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// Default time-to-live: ten minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Every this many writes, expired entries are swept out of the map.
const SWEEP_INTERVAL: usize = 256;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// A time-bounded cache. Expired entries are invisible to readers and are
/// dropped on the next write to the same key, by the sweep that runs every
/// few hundred writes, or on [`TtlCache::purge_expired`].
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    writes: AtomicUsize,
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
{
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            writes: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Insert with the cache's default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    /// Insert with an explicit TTL. A zero TTL stores an already expired
    /// entry; a TTL too large to represent never expires.
    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl);
        let mut entries = self.entries.write();
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            let before = entries.len();
            entries.retain(|_, entry| entry.is_live(now));
            trace!(swept = before - entries.len(), "cache sweep");
        }
        entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Return the live entry for `key`, or compute, store and return one.
    ///
    /// `f` runs without the lock held.
    pub fn get_or_insert_with<F>(&self, key: K, f: F) -> V
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            trace!("cache hit");
            return value;
        }
        trace!("cache miss");
        let value = f();
        self.insert(key, value.clone());
        value
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        self.entries
            .write()
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drop every expired entry, returning how many went.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries held, live or not.
    #[cfg(test)]
    fn stored(&self) -> usize {
        self.entries.read().len()
    }
}
