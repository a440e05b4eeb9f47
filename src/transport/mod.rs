//! The HTTP(S) transport used by the probes.
//!
//! Probes only ever need "GET this path from this host, with these headers" and look at the
//! status code, the `Location` header and the body. Anything implementing [`Transport`] will do;
//! [`http::HttpTransport`] is the default, backed by `reqwest`.

use crate::error::Error;
use std::sync::Arc;

pub mod http;

pub use http::HttpTransport;

/// `DynTransport` is a [`Transport`] shared by every clone of a resolver.
pub type DynTransport = Arc<dyn Transport + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub host: String,
    pub port: u16,
    /// Path and query, e.g. `/dns-query?name=example.com.&type=TXT`.
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            location: None,
            body: body.into(),
        }
    }

    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self {
            status,
            location: Some(location.into()),
            body: String::new(),
        }
    }
}

#[async_trait::async_trait]
pub trait Transport {
    /// Issue a GET request. Redirects are returned as-is rather than followed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when no response was received.
    async fn get(&self, request: &Request) -> Result<Response, Error>;
}
