//! Short-lived in-memory cache of resolution results.
//!
//! Entries are either a resolved key or a [`CacheValue::Miss`] remembering that a name
//! recently failed to resolve. Both expire: expired entries are never returned, are dropped
//! when read, and are swept on every insert.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    Key(String),
    Miss,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CacheValue,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// A cache shared by every clone, keyed by normalized name.
#[derive(Default, Debug, Clone)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, name: &str) -> Option<CacheValue> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(name) {
                None => return None,
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }
        // Expired: drop it unless a fresh entry raced in meanwhile.
        let mut entries = self.entries.write().await;
        if entries.get(name).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(name);
        }
        None
    }

    /// Store `value` for `ttl` seconds. A zero TTL stores nothing and leaves any existing entry
    /// in place.
    pub async fn set(&self, name: &str, value: CacheValue, ttl: u32) {
        if ttl == 0 {
            return;
        }
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now + Duration::from_secs(u64::from(ttl)),
        };
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(name.to_string(), entry);
    }

    pub async fn flush(&self) {
        self.entries.write().await.clear();
    }

    /// Every stored entry, including ones that expired but haven't been swept yet.
    pub async fn list(&self) -> HashMap<String, CacheValue> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(name, entry)| (name.clone(), entry.value.clone()))
            .collect()
    }

    pub async fn purge_expired(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .await
            .retain(|_, entry| entry.is_live(now));
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn key(s: &str) -> CacheValue {
        CacheValue::Key(s.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn get_returns_live_entries() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("foo.com").await, None);

        cache.set("foo.com", key("aa"), 10).await;
        cache.set("bar.com", CacheValue::Miss, 10).await;
        assert_eq!(cache.get("foo.com").await, Some(key("aa")));
        assert_eq!(cache.get("bar.com").await, Some(CacheValue::Miss));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let cache = MemoryCache::new();
        cache.set("foo.com", key("aa"), 10).await;

        advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get("foo.com").await, Some(key("aa")));

        advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("foo.com").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_is_a_no_op() {
        let cache = MemoryCache::new();
        cache.set("foo.com", key("aa"), 0).await;
        assert!(cache.is_empty().await);

        cache.set("foo.com", key("aa"), 10).await;
        cache.set("foo.com", key("bb"), 0).await;
        assert_eq!(cache.get("foo.com").await, Some(key("aa")));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_entries_overwrite() {
        let cache = MemoryCache::new();
        cache.set("foo.com", CacheValue::Miss, 60).await;
        cache.set("foo.com", key("aa"), 3600).await;
        assert_eq!(cache.get("foo.com").await, Some(key("aa")));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn list_includes_unswept_entries_until_purged() {
        let cache = MemoryCache::new();
        cache.set("foo.com", key("aa"), 5).await;
        cache.set("bar.com", CacheValue::Miss, 60).await;

        advance(Duration::from_secs(10)).await;
        let listed = cache.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed.get("foo.com"), Some(&key("aa")));

        cache.purge_expired().await;
        let listed = cache.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.get("bar.com"), Some(&CacheValue::Miss));
    }

    #[tokio::test(start_paused = true)]
    async fn insert_sweeps_expired_entries() {
        let cache = MemoryCache::new();
        cache.set("foo.com", key("aa"), 5).await;
        advance(Duration::from_secs(10)).await;
        cache.set("bar.com", key("bb"), 5).await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn flush_clears_everything() {
        let cache = MemoryCache::new();
        cache.set("foo.com", key("aa"), 60).await;
        cache.set("bar.com", CacheValue::Miss, 60).await;
        let clone = cache.clone();
        clone.flush().await;
        assert!(cache.is_empty().await);
    }
}
