//! datdns
//!
//! Resolves DNS names to the 64 character hex keys of a content-addressed peer-to-peer protocol
//! ([Dat] by default), the way an A record resolves a name to an address.
//!
//! Two places are checked for a name's key, in order:
//!
//! 1. A TXT record, looked up through a [DNS-over-HTTPS] JSON API:
//!    `example.com. IN TXT "datkey=<key>"`.
//! 2. A plaintext record at `https://example.com/.well-known/dat`:
//!    `dat://<key>` followed by an optional `TTL=<seconds>` line.
//!
//! Results are cached in memory for their TTL, and names without any record are remembered for
//! a minute. An optional [persistent cache][persistent] supplies the last known key when both
//! lookups fail.
//!
//! ```no_run
//! # async fn example() -> Result<(), datdns::error::Error> {
//! use datdns::{Config, HttpTransport, ResolveOptions, Resolver};
//! use std::sync::Arc;
//!
//! let config = Arc::new(Config::default());
//! let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
//! let resolver = Resolver::new(config, transport)?;
//! let key = resolver
//!     .resolve_name("dat://example.com/index.html", ResolveOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! [Dat]: https://www.datprotocol.com
//! [DNS-over-HTTPS]: https://www.rfc-editor.org/rfc/rfc8484
#![warn(clippy::pedantic)]

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod name;
pub mod persistent;
pub mod probe;
pub mod resolver;
pub mod transport;

pub use cache::{CacheValue, MemoryCache};
pub use config::{Config, DohProvider, SharedConfig};
pub use events::{Event, Method};
pub use persistent::{
    DynPersistentCache, FilePersistentCache, InMemoryPersistentCache, PersistentCache,
};
pub use resolver::{ResolveOptions, Resolver};
pub use transport::{DynTransport, HttpTransport, Transport};
