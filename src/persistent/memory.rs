use crate::error::Error;
use crate::name::is_key;
use crate::persistent::{PersistedEntry, PersistentCache};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

/// Keeps the last key of every name ever resolved. Entries are served regardless of their TTL:
/// a stale key is all a failed resolution has left.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryPersistentCache {
    entries: HashMap<String, PersistedEntry>,
}

impl InMemoryPersistentCache {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PersistedEntry> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl PersistentCache for InMemoryPersistentCache {
    async fn read(&self, name: &str, err: Error) -> Result<String, Error> {
        match self.entries.get(name) {
            Some(entry) => {
                tracing::debug!("persistent cache hit for \"{name}\" after: {err}");
                Ok(entry.key.clone())
            }
            None => Err(err),
        }
    }

    async fn write(&mut self, name: &str, key: &str, ttl: u32) -> Result<(), Error> {
        if !is_key(key) {
            return Err(Error::MalformedRecord(name.to_string()));
        }
        self.entries.insert(
            name.to_string(),
            PersistedEntry {
                key: key.to_string(),
                ttl,
                stored_at: OffsetDateTime::now_utc().unix_timestamp(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "40a7f6b6147ae695bcbcff432f684c7bb5291ea339c28c1755896cdeb80bd2f9";

    #[tokio::test]
    async fn read_returns_written_key() {
        let mut cache = InMemoryPersistentCache::default();
        cache.write("foo.com", KEY, 60).await.unwrap();

        let key = cache
            .read("foo.com", Error::RecordNotFound("foo.com".into()))
            .await
            .unwrap();
        assert_eq!(key, KEY);
        assert_eq!(cache.get("foo.com").unwrap().ttl, 60);
    }

    #[tokio::test]
    async fn read_passes_the_original_error_through() {
        let cache = InMemoryPersistentCache::default();
        let err = cache
            .read("bar.com", Error::HttpStatus(503))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HttpStatus(503)));
    }

    #[tokio::test]
    async fn write_rejects_non_keys() {
        let mut cache = InMemoryPersistentCache::default();
        assert!(cache.write("foo.com", "abc", 60).await.is_err());
        assert!(cache.is_empty());
    }
}
