//! The two ways of looking a name up.
//!
//! [`doh::DnsOverHttps`] asks a DNS-over-HTTPS provider for the name's TXT records and
//! [`well_known::WellKnown`] fetches a plaintext record from a fixed path on the host itself.
//! Both produce a [`Resolved`] key with the TTL it may be cached for.

use crate::name::is_key;
use regex::Regex;

pub mod doh;
pub mod well_known;

pub use doh::DnsOverHttps;
pub use well_known::WellKnown;

/// TTL applied when a record carries none, or an unusable one. One hour.
pub const DEFAULT_TTL: u32 = 3_600;
/// Upper bound of any cached TTL. Seven days.
pub const MAX_TTL: u32 = 604_800;
/// How long a well-known "not found" is remembered.
pub const MISS_TTL: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub key: String,
    pub ttl: u32,
}

/// Largest TTL taken at face value, 2^53 - 1. Larger numbers can't be told apart reliably once
/// they have been through a JSON number and count as unusable.
pub const MAX_EXACT_TTL: i64 = (1 << 53) - 1;

/// Clamp a TTL read from a record into `0..=MAX_TTL`. Missing, negative and inexact values
/// become [`DEFAULT_TTL`].
#[must_use]
pub fn clamp_ttl(ttl: Option<i64>) -> u32 {
    match ttl {
        Some(ttl) if (0..=MAX_EXACT_TTL).contains(&ttl) => {
            u32::try_from(ttl).map_or(MAX_TTL, |ttl| ttl.min(MAX_TTL))
        }
        _ => DEFAULT_TTL,
    }
}

/// The lowercased key captured by the first group of `pattern`, if it is key-shaped.
pub(crate) fn capture_key(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|key| is_key(key))
}
