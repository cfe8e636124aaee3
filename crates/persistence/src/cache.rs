//! Short-lived response cache.
//!
//! A TTL map of JSON values keyed by request shape. Read-heavy handlers put
//! their serialised response here; every mutation on the same collection
//! calls [`ResponseCache::clear`]. There is no dependency tracking.
//!
//! Each clear advances a generation counter. A handler that reads the
//! generation before its database read and stores with
//! [`ResponseCache::set_if_generation`] never caches a response that a
//! concurrent clear has already invalidated.
//!
//! Expired entries are treated as absent on read. They are physically
//! removed by [`ResponseCache::purge_expired`], which the sweeper started
//! with [`ResponseCache::start_sweeper`] runs periodically.
//!
//! ```
//! use std::time::Duration;
//! use hytt_persistence::cache::ResponseCache;
//! use serde_json::json;
//!
//! let cache = ResponseCache::new(Duration::from_secs(300));
//! cache.set("notices_page_1_size_10", json!({"total": 0}), Duration::from_secs(180));
//! assert_eq!(cache.get("notices_page_1_size_10"), Some(json!({"total": 0})));
//!
//! cache.clear();
//! assert!(cache.is_empty());
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// TTL cache of JSON values.
#[derive(Debug)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    generation: AtomicU64,
    default_ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl ResponseCache {
    /// Creates an empty cache. `default_ttl` is used by
    /// [`set_default`](Self::set_default); zero means entries never expire.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the value for `key` unless it is missing or expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Stores `value` under `key` for `ttl`. A zero TTL never expires.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        self.entries
            .write()
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Number of clears so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Stores `value` like [`set`](Self::set), unless the cache was cleared
    /// after `generation` was read. Returns whether the value was stored.
    pub fn set_if_generation(
        &self,
        key: impl Into<String>,
        value: Value,
        ttl: Duration,
        generation: u64,
    ) -> bool {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        let mut entries = self.entries.write();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("Cache cleared during read, response not cached");
            return false;
        }
        entries.insert(key.into(), CacheEntry { value, expires_at });
        true
    }

    /// Stores `value` with the cache's default TTL.
    pub fn set_default(&self, key: impl Into<String>, value: Value) {
        self.set(key, value, self.default_ttl);
    }

    /// Removes one key. Returns whether a live entry was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.entries
            .write()
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if !entries.is_empty() {
            debug!(entries = entries.len(), "Cache cleared");
        }
        entries.clear();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired entries and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Spawns a loop that purges expired entries every `check_period`.
    pub fn start_sweeper(self: &Arc<Self>, check_period: Duration) -> SweeperHandle {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let cache = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(check_period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and there is nothing to purge yet.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = rx.recv() => {
                        debug!("Cache sweeper shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            debug!(purged, "Expired cache entries purged");
                        }
                    }
                }
            }
        });

        SweeperHandle {
            shutdown_tx: Some(tx),
            handle: Some(handle),
        }
    }
}

/// Handle to a running sweeper loop.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stops the loop and waits for it to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_then_get() {
        let cache = ResponseCache::default();
        cache.set("k", json!([1, 2, 3]), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!([1, 2, 3])));
        assert_eq!(cache.get("other"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires() {
        let cache = ResponseCache::default();
        cache.set("k", json!("v"), Duration::from_secs(180));

        tokio::time::advance(Duration::from_secs(179)).await;
        assert_eq!(cache.get("k"), Some(json!("v")));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let cache = ResponseCache::default();
        cache.set_default("k", json!(1));

        tokio::time::advance(Duration::from_secs(86_400 * 365)).await;
        assert_eq!(cache.get("k"), Some(json!(1)));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set_default("a", json!(1));
        cache.set_default("b", json!(2));

        cache.clear();
        assert!(cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_clear_during_read_discards_stale_set() {
        let cache = ResponseCache::default();
        let before = cache.generation();

        cache.clear();
        assert!(!cache.set_if_generation("page", json!("stale"), Duration::from_secs(60), before));
        assert_eq!(cache.get("page"), None);

        let current = cache.generation();
        assert_eq!(current, before + 1);
        assert!(cache.set_if_generation("page", json!("fresh"), Duration::from_secs(60), current));
        assert_eq!(cache.get("page"), Some(json!("fresh")));
    }

    #[test]
    fn test_overwrite_and_remove() {
        let cache = ResponseCache::default();
        cache.set("k", json!(1), Duration::from_secs(60));
        cache.set("k", json!(2), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!(2)));

        assert!(cache.remove("k"));
        assert!(!cache.remove("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = ResponseCache::default();
        cache.set("short", json!(1), Duration::from_secs(10));
        cache.set("long", json!(2), Duration::from_secs(100));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges() {
        let cache = Arc::new(ResponseCache::default());
        cache.set("k", json!(1), Duration::from_secs(5));

        let mut sweeper = cache.start_sweeper(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert_eq!(cache.entries.read().len(), 0);
        sweeper.stop().await;
    }
}
