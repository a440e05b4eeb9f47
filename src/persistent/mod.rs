//! Durable fallback storage for resolved keys.
//!
//! Every successful resolution is written to the persistent cache, if one is configured. It is
//! read only when live resolution fails, giving it the chance to supply the last known key
//! instead of the error.
//!
//! Two implementations are provided, [`memory::InMemoryPersistentCache`] and
//! [`file::FilePersistentCache`]. The former is not durable across restarts. The latter writes
//! its state to a JSON file on each update and loads it again on startup.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FilePersistentCache;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryPersistentCache;

/// `DynPersistentCache` is a [`PersistentCache`] that can be used by multiple read/write
/// consumers that coordinate through an [`Arc`] and a [`RwLock`] wrapping the cache.
#[allow(clippy::module_name_repetitions)]
pub type DynPersistentCache = Arc<RwLock<dyn PersistentCache + Send + Sync>>;

#[allow(clippy::module_name_repetitions)]
#[async_trait::async_trait]
pub trait PersistentCache {
    /// Supply a key for `name` now that live resolution failed with `err`.
    ///
    /// Implementations without a key for `name` return `err` unchanged, which becomes the
    /// caller's error.
    async fn read(&self, name: &str, err: Error) -> Result<String, Error>;

    /// Remember that `name` resolved to `key`, valid for `ttl` seconds.
    async fn write(&mut self, name: &str, key: &str, ttl: u32) -> Result<(), Error>;
}

/// A key as remembered by a persistent cache.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersistedEntry {
    pub key: String,
    pub ttl: u32,
    /// Unix timestamp of the write.
    pub stored_at: i64,
}
