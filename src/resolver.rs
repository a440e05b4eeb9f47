//! Name resolution.
//!
//! [`Resolver::resolve_name`] turns a name into a key:
//!
//! 1. The name is [normalized][crate::name::normalize]. Names that already are keys are
//!    returned as-is.
//! 2. The [memory cache][crate::cache::MemoryCache] is consulted. A cached key is returned and a
//!    cached miss fails the call, unless [`ResolveOptions`] say otherwise.
//! 3. The [DNS-over-HTTPS probe][crate::probe::doh] runs. Its failures are swallowed.
//! 4. Only if it produced nothing, the [well-known probe][crate::probe::well_known] runs. When
//!    it finds no record at all, a miss is cached for [`MISS_TTL`] seconds.
//! 5. A key found by either probe is cached for its TTL and handed to the persistent cache.
//!
//! When any of that fails, a configured [`PersistentCache`][crate::persistent::PersistentCache]
//! is asked for a fallback key and its answer becomes the result.

use crate::cache::{CacheValue, MemoryCache};
use crate::config::{DohProvider, Patterns, SharedConfig};
use crate::error::Error;
use crate::events::{Event, EventBus};
use crate::name::{normalize, Normalized};
use crate::persistent::DynPersistentCache;
use crate::probe::{DnsOverHttps, Resolved, WellKnown, MISS_TTL};
use crate::transport::DynTransport;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Per-call switches. Nothing here outlives the call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ResolveOptions {
    /// Neither read cached keys nor cached misses.
    pub ignore_cache: bool,
    /// Probe again even if the name is cached as a miss.
    pub ignore_cached_miss: bool,
    pub skip_dns_over_https: bool,
    pub skip_well_known: bool,
}

/// Resolves names to keys. Cheap to clone; clones share the cache, the event channel and the
/// persistent cache.
#[derive(Clone)]
pub struct Resolver {
    config: SharedConfig,
    patterns: Arc<Patterns>,
    provider: DohProvider,
    well_known_path: String,
    transport: DynTransport,
    cache: MemoryCache,
    events: EventBus,
    persistent: Option<DynPersistentCache>,
    pending_writes: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Resolver {
    /// Build a resolver. Without a configured
    /// [`dns_provider`][crate::config::Config::dns_provider] one of the public
    /// [defaults][DohProvider::defaults] is picked at random, once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if a configured pattern doesn't compile.
    pub fn new(config: SharedConfig, transport: DynTransport) -> Result<Self, Error> {
        let patterns = Arc::new(config.patterns()?);
        let provider = config
            .dns_provider
            .clone()
            .unwrap_or_else(|| DohProvider::random(&mut rand::thread_rng()));
        tracing::debug!(
            "using DNS-over-HTTPS provider {}:{}{}",
            provider.host,
            provider.port,
            provider.path
        );
        let well_known_path = config.well_known_path();
        Ok(Self {
            config,
            patterns,
            provider,
            well_known_path,
            transport,
            cache: MemoryCache::new(),
            events: EventBus::default(),
            persistent: None,
            pending_writes: Arc::default(),
        })
    }

    /// Fall back to `persistent` when resolution fails, and keep it updated with every key
    /// resolved.
    #[must_use]
    pub fn with_persistent_cache(mut self, persistent: DynPersistentCache) -> Self {
        self.persistent = Some(persistent);
        self
    }

    #[must_use]
    pub fn provider(&self) -> &DohProvider {
        &self.provider
    }

    /// Receive the [`Event`]s published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// The raw contents of the memory cache, expired entries included until swept.
    pub async fn list_cache(&self) -> HashMap<String, CacheValue> {
        self.cache.list().await
    }

    pub async fn flush_cache(&self) {
        self.cache.flush().await;
        self.events.emit(Event::CacheFlushed);
    }

    /// Resolve `name` to a lowercase 64 character hex key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if `name` can't be normalized. Otherwise, without a
    /// persistent cache, returns the error that ended resolution: that of the well-known probe
    /// if it ran, or [`Error::RecordNotFound`]. With a persistent cache, returns whatever its
    /// [`read`][crate::persistent::PersistentCache::read] returns.
    pub async fn resolve_name(&self, name: &str, opts: ResolveOptions) -> Result<String, Error> {
        let name = match normalize(name, &self.patterns)? {
            Normalized::Key(key) => return Ok(key),
            Normalized::Name(name) => name,
        };
        match self.resolve_normalized(&name, opts).await {
            Ok(key) => Ok(key),
            Err(err) => self.fall_back(&name, err).await,
        }
    }

    async fn resolve_normalized(&self, name: &str, opts: ResolveOptions) -> Result<String, Error> {
        if !opts.ignore_cache {
            match self.cache.get(name).await {
                Some(CacheValue::Key(key)) => {
                    tracing::debug!("memory cache hit for \"{name}\"");
                    return Ok(key);
                }
                Some(CacheValue::Miss) if !opts.ignore_cached_miss => {
                    tracing::debug!("memory cache miss recorded for \"{name}\"");
                    return Err(Error::RecordNotFound(name.to_string()));
                }
                _ => {}
            }
        }

        let mut resolved = None;
        if !opts.skip_dns_over_https {
            match self.dns_over_https().probe(name).await {
                Ok(found) => resolved = Some(found),
                Err(err) => tracing::debug!("DNS-over-HTTPS lookup of \"{name}\" failed: {err}"),
            }
        }
        if resolved.is_none() && !opts.skip_well_known {
            match self.well_known().probe(name).await {
                Ok(found) => resolved = Some(found),
                Err(err) => {
                    if err.is_not_found() {
                        self.cache.set(name, CacheValue::Miss, MISS_TTL).await;
                    }
                    return Err(err);
                }
            }
        }
        let Some(Resolved { key, ttl }) = resolved else {
            return Err(Error::RecordNotFound(name.to_string()));
        };

        self.cache
            .set(name, CacheValue::Key(key.clone()), ttl)
            .await;
        self.persist(name, &key, ttl).await;
        Ok(key)
    }

    fn dns_over_https(&self) -> DnsOverHttps<'_> {
        DnsOverHttps {
            transport: &self.transport,
            provider: &self.provider,
            txt_pattern: &self.patterns.txt,
            events: &self.events,
        }
    }

    fn well_known(&self) -> WellKnown<'_> {
        WellKnown {
            transport: &self.transport,
            port: self.config.well_known_port,
            path: &self.well_known_path,
            protocol_pattern: &self.patterns.protocol,
            events: &self.events,
        }
    }

    /// Hand a resolved key to the persistent cache without waiting for the write. The write
    /// runs to completion even if every clone of the resolver is dropped first.
    async fn persist(&self, name: &str, key: &str, ttl: u32) {
        let Some(persistent) = self.persistent.clone() else {
            return;
        };
        let (name, key) = (name.to_string(), key.to_string());
        let write = tokio::spawn(async move {
            if let Err(err) = persistent.write().await.write(&name, &key, ttl).await {
                tracing::warn!("failed to persist key for \"{name}\": {err}");
            }
        });
        let mut pending = self.pending_writes.lock().await;
        pending.retain(|write| !write.is_finished());
        pending.push(write);
    }

    /// Wait for every persistent cache write started so far to finish.
    pub async fn finish_pending_writes(&self) {
        let pending = std::mem::take(&mut *self.pending_writes.lock().await);
        for write in pending {
            if let Err(err) = write.await {
                tracing::warn!("persistent cache write did not complete: {err}");
            }
        }
    }

    async fn fall_back(&self, name: &str, err: Error) -> Result<String, Error> {
        match &self.persistent {
            None => Err(err),
            Some(persistent) => {
                tracing::debug!("consulting persistent cache for \"{name}\" after: {err}");
                persistent.read().await.read(name, err).await
            }
        }
    }
}
