//! Plaintext records served from a well-known path on the host.
//!
//! `GET https://example.com/.well-known/dat` should answer with the protocol URI of the key on
//! the first line and optionally a TTL on the second:
//!
//! ```text
//! dat://40a7f6b6147ae695bcbcff432f684c7bb5291ea339c28c1755896cdeb80bd2f9
//! TTL=3600
//! ```

use crate::error::Error;
use crate::events::{Event, EventBus, Method};
use crate::probe::{capture_key, clamp_ttl, Resolved};
use crate::transport::{DynTransport, Request, Response};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use url::Url;

/// Redirects followed before giving up.
pub const MAX_REDIRECTS: usize = 6;

lazy_static! {
    static ref TTL_LINE: Regex = RegexBuilder::new(r"^ttl=(\d+)$")
        .case_insensitive(true)
        .build()
        .unwrap();
}

pub struct WellKnown<'a> {
    pub transport: &'a DynTransport,
    pub port: u16,
    pub path: &'a str,
    pub protocol_pattern: &'a Regex,
    pub events: &'a EventBus,
}

impl WellKnown<'_> {
    /// Fetch the record for `name`, publishing a [`Method::WellKnown`] event with the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if the host is unreachable or answers 404,
    /// [`Error::HttpStatus`] for any other non-200 answer, [`Error::InvalidRedirect`] or
    /// [`Error::TooManyRedirects`] when redirects can't be followed, and
    /// [`Error::MalformedRecord`] if the body holds no key.
    pub async fn probe(&self, name: &str) -> Result<Resolved, Error> {
        let result = self.fetch(name).await;
        match &result {
            Ok(resolved) => {
                tracing::info!("resolved \"{name}\" via {}", self.path);
                self.events.emit(Event::Resolved {
                    method: Method::WellKnown,
                    name: name.to_string(),
                    key: resolved.key.clone(),
                });
            }
            Err(err) => self.events.emit(Event::Failed {
                method: Method::WellKnown,
                name: name.to_string(),
                err: err.to_string(),
            }),
        }
        result
    }

    async fn fetch(&self, name: &str) -> Result<Resolved, Error> {
        let mut request = Request::new(name, self.port, self.path);
        for _ in 0..=MAX_REDIRECTS {
            let response = match self.transport.get(&request).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!("{}{} unreachable: {err}", request.host, request.path);
                    Response::default()
                }
            };
            match response.status {
                0 | 404 => return Err(Error::RecordNotFound(name.to_string())),
                200 => return parse_record(name, &response.body, self.protocol_pattern),
                301 | 302 | 303 | 307 | 308 => {
                    request = follow(name, &request, response.location.as_deref())?;
                    tracing::debug!("following redirect to {}{}", request.host, request.path);
                }
                status => return Err(Error::HttpStatus(status)),
            }
        }
        Err(Error::TooManyRedirects(name.to_string()))
    }
}

/// The request a redirect from `from` to `location` points at. Relative locations keep the
/// host and port.
fn follow(name: &str, from: &Request, location: Option<&str>) -> Result<Request, Error> {
    let invalid = || Error::InvalidRedirect(name.to_string());
    let base = Url::parse(&format!("https://{}:{}{}", from.host, from.port, from.path))
        .map_err(|_| invalid())?;
    let target = base.join(location.ok_or_else(invalid)?).map_err(|_| invalid())?;
    if !matches!(target.scheme(), "http" | "https") {
        return Err(invalid());
    }
    let host = target.host_str().ok_or_else(invalid)?;
    let port = target.port_or_known_default().ok_or_else(invalid)?;
    let path = match target.query() {
        Some(query) => format!("{}?{query}", target.path()),
        None => target.path().to_string(),
    };
    Ok(Request {
        host: host.to_string(),
        port,
        path,
        headers: from.headers.clone(),
    })
}

fn parse_record(name: &str, body: &str, protocol_pattern: &Regex) -> Result<Resolved, Error> {
    let mut lines = body.lines();
    let key = lines
        .next()
        .and_then(|line| capture_key(protocol_pattern, line.trim()))
        .ok_or_else(|| Error::MalformedRecord(name.to_string()))?;
    let ttl = lines
        .next()
        .and_then(|line| TTL_LINE.captures(line.trim()))
        .and_then(|captures| captures[1].parse::<i64>().ok());
    Ok(Resolved {
        key,
        ttl: clamp_ttl(ttl),
    })
}
