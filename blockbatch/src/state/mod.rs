//! Idempotent-state cache.
//!
//! Server state flags (gamerules) are expensive to query: each lookup is a
//! full round trip. [`StateCache`] remembers the last value seen per key for
//! a TTL window so repeated verifications cost nothing.
//!
//! # Invariants
//!
//! - An entry older than the TTL is never used to answer a verification.
//! - Concurrent verifications of the same key share one in-flight query
//!   (`moka`'s per-key single-flight loading).
//! - Failed queries are not cached.
//!
//! Freshness is measured with `tokio::time::Instant`, so tests running on a
//! paused clock observe expiry exactly.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::executor::CommandError;

const MAX_ENTRIES: u64 = 1_024;

/// Last known value of one state flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub fetched_at: Instant,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            fetched_at: Instant::now(),
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// TTL cache of state flag values.
pub struct StateCache {
    entries: MokaCache<String, CacheEntry>,
    ttl: Duration,
    queries: AtomicU64,
}

impl std::fmt::Debug for StateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.entry_count())
            .field("queries", &self.query_count())
            .finish()
    }
}

impl StateCache {
    pub fn new(ttl: Duration) -> Self {
        let mut builder = MokaCache::builder().max_capacity(MAX_ENTRIES);
        if !ttl.is_zero() {
            builder = builder.time_to_live(ttl);
        }
        Self {
            entries: builder.build(),
            ttl,
            queries: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of queries issued through [`StateCache::verify`].
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// Fresh cached value for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .await
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value)
    }

    /// Check that `key` currently holds `expected`.
    ///
    /// Uses the cached value when fresh; otherwise runs `fetch` once (shared
    /// with any concurrent caller for the same key) and caches its result.
    /// A failed fetch yields `false`.
    pub async fn verify<F, Fut>(&self, key: &str, expected: &str, fetch: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, CommandError>>,
    {
        if let Some(entry) = self.entries.get(key).await {
            if entry.is_fresh(self.ttl) {
                debug!(key, value = %entry.value, "State cache hit");
                return entry.value == expected;
            }
            self.entries.invalidate(key).await;
        }

        let loaded = self
            .entries
            .try_get_with(key.to_string(), async {
                self.queries.fetch_add(1, Ordering::Relaxed);
                fetch().await.map(|value| CacheEntry::new(key, value))
            })
            .await;

        match loaded {
            Ok(entry) => entry.value == expected,
            Err(error) => {
                warn!(key, error = %error, "State query failed");
                false
            }
        }
    }

    /// Store a value observed or written by the caller.
    pub async fn record(&self, key: &str, value: &str) {
        self.entries
            .insert(key.to_string(), CacheEntry::new(key, value))
            .await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ErrorKind;
    use std::sync::Arc;

    async fn fetch_value(value: &str) -> Result<String, CommandError> {
        Ok(value.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_verify_within_ttl_uses_cache() {
        let cache = StateCache::new(Duration::from_secs(30));

        assert!(cache.verify("doTileDrops", "false", || fetch_value("false")).await);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(cache.verify("doTileDrops", "false", || fetch_value("true")).await);

        assert_eq!(cache.query_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let cache = StateCache::new(Duration::from_secs(30));

        assert!(cache.verify("doTileDrops", "false", || fetch_value("false")).await);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!cache.verify("doTileDrops", "false", || fetch_value("true")).await);

        assert_eq!(cache.query_count(), 2);
        assert_eq!(cache.get("doTileDrops").await.as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_failed_query_not_cached() {
        let cache = StateCache::new(Duration::from_secs(30));

        let failed = cache
            .verify("doTileDrops", "false", || async {
                Err(CommandError::new(ErrorKind::CommandTimeout, "no response"))
            })
            .await;
        assert!(!failed);
        assert!(cache.get("doTileDrops").await.is_none());

        assert!(cache.verify("doTileDrops", "false", || fetch_value("false")).await);
        assert_eq!(cache.query_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_verifies_share_one_query() {
        let cache = Arc::new(StateCache::new(Duration::from_secs(30)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache
                    .verify("mobGriefing", "false", || async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("false".to_string())
                    })
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(cache.query_count(), 1);
    }

    #[tokio::test]
    async fn test_record_and_invalidate() {
        let cache = StateCache::new(Duration::from_secs(30));
        cache.record("keepInventory", "true").await;
        assert_eq!(cache.get("keepInventory").await.as_deref(), Some("true"));

        cache.invalidate("keepInventory").await;
        assert!(cache.get("keepInventory").await.is_none());
    }
}
