//! Name normalization.
//!
//! Callers may hand the resolver a bare hostname (`example.com`), a URL
//! (`dat://example.com/some/path`), a raw key, or any of those carrying a version suffix
//! (`example.com+5`). [`normalize`] reduces all of them to either the key itself or the
//! lowercase hostname that the cache and probes work with.

use crate::config::Patterns;
use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

/// Length in characters of a hex-encoded key.
pub const KEY_LEN: usize = 64;

lazy_static! {
    static ref VERSION_SUFFIX: Regex = Regex::new(r"\+[^/]+$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// The name already was a key.
    Key(String),
    /// A hostname to look up.
    Name(String),
}

/// Whether `s` has the shape of a key: exactly [`KEY_LEN`] hex characters.
#[must_use]
pub fn is_key(s: &str) -> bool {
    s.len() == KEY_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Reduce `raw` to a key or a lookup name.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] if nothing usable is left once the scheme, path and version
/// suffix are removed.
pub fn normalize(raw: &str, patterns: &Patterns) -> Result<Normalized, Error> {
    let raw = raw.trim();
    let host_or_path = match parse_url(raw)? {
        Some(url) => match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => first_segment(url.path().trim_start_matches('/')).to_string(),
        },
        None => first_segment(raw).to_string(),
    };

    let name = VERSION_SUFFIX.replace(&host_or_path, "");
    let name = name.strip_suffix('.').unwrap_or(&name);
    if name.is_empty() {
        return Err(Error::InvalidName(raw.to_string()));
    }

    if patterns.hash.is_match(name) {
        let key: String = name.chars().take(KEY_LEN).collect();
        return Ok(Normalized::Key(key.to_ascii_lowercase()));
    }
    Ok(Normalized::Name(name.to_ascii_lowercase()))
}

/// `raw` as a URL, if it starts with a scheme. A `://` further in, say in a query string,
/// doesn't make a URL.
fn parse_url(raw: &str) -> Result<Option<Url>, Error> {
    let Some((scheme, _)) = raw.split_once("://") else {
        return Ok(None);
    };
    let is_scheme = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !is_scheme {
        return Ok(None);
    }
    Url::parse(raw)
        .map(Some)
        .map_err(|_| Error::InvalidName(raw.to_string()))
}

fn first_segment(s: &str) -> &str {
    s.split(['/', '?', '#']).next().unwrap_or_default()
}
