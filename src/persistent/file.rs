//! A JSON file-backed implementation of the [`PersistentCache`][super::PersistentCache] trait.
//!
//! Wraps an [`InMemoryPersistentCache`][super::memory::InMemoryPersistentCache] and rewrites
//! its JSON state file after every write, so keys survive restarts.
use crate::error::Error;
use crate::persistent::memory::InMemoryPersistentCache;
use crate::persistent::PersistentCache;
use std::io::ErrorKind;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

#[derive(Default, Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FilePersistentCache {
    cache: InMemoryPersistentCache,
    path: String,
}

impl FilePersistentCache {
    /// Write the whole state to the backing file as pretty-printed JSON. The state goes to a
    /// sibling `.tmp` file first and is renamed over the old one, so an interrupted save leaves
    /// the previous state intact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the state can't be serialized, or [`Error::IO`] if the
    /// file can't be written.
    pub async fn save(&self) -> Result<(), Error> {
        let data = serde_json::to_vec_pretty(&self.cache)?;
        let tmp_path = format!("{}.tmp", self.path);
        let mut file = File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// Load the state stored at `path`. A missing file is created holding an empty state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the file doesn't hold a valid state, or [`Error::IO`]
    /// if it can't be read or created.
    pub async fn try_from_file(path: &str) -> Result<Self, Error> {
        let cache = match fs::read(path).await {
            Ok(contents) => serde_json::from_slice(&contents)?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let empty = Self {
                    cache: InMemoryPersistentCache::default(),
                    path: path.to_string(),
                };
                empty.save().await?;
                tracing::debug!("created empty persistent cache at {path}");
                return Ok(empty);
            }
            Err(err) => return Err(Error::IO(err)),
        };
        let loaded = Self {
            cache,
            path: path.to_string(),
        };
        tracing::debug!("loaded {} persisted keys from {path}", loaded.cache.len());
        Ok(loaded)
    }

    #[must_use]
    pub fn entries(&self) -> &InMemoryPersistentCache {
        &self.cache
    }
}

#[async_trait::async_trait]
impl PersistentCache for FilePersistentCache {
    async fn read(&self, name: &str, err: Error) -> Result<String, Error> {
        self.cache.read(name, err).await
    }

    async fn write(&mut self, name: &str, key: &str, ttl: u32) -> Result<(), Error> {
        self.cache.write(name, key, ttl).await?;
        self.save().await
    }
}
