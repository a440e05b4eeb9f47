use crate::error::Error;
use rand::Rng;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub type SharedConfig = Arc<Config>;

pub const DEFAULT_RECORD_NAME: &str = "dat";
pub const DEFAULT_HASH_PATTERN: &str = "^[0-9a-f]{64}$";
pub const DEFAULT_WELL_KNOWN_PORT: u16 = 443;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2_000);

/// A DNS-over-HTTPS provider speaking the JSON API (`application/dns-json`).
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DohProvider {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl DohProvider {
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    /// The public providers used when none is configured.
    #[must_use]
    pub fn defaults() -> Vec<DohProvider> {
        vec![
            DohProvider::new("cloudflare-dns.com", 443, "/dns-query"),
            DohProvider::new("dns.google", 443, "/resolve"),
            DohProvider::new("dns.quad9.net", 5053, "/dns-query"),
        ]
    }

    /// Pick one of the [default providers][DohProvider::defaults].
    pub fn random<R: Rng>(rng: &mut R) -> DohProvider {
        let mut providers = Self::defaults();
        let idx = rng.gen_range(0..providers.len());
        providers.swap_remove(idx)
    }
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub dns_provider: Option<DohProvider>,
    pub record_name: String,
    pub hash_pattern: Option<String>,
    pub protocol_pattern: Option<String>,
    pub txt_pattern: Option<String>,
    pub well_known_port: u16,
    #[serde(rename = "request_timeout_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,
    pub persistent_cache_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dns_provider: None,
            record_name: DEFAULT_RECORD_NAME.to_string(),
            hash_pattern: None,
            protocol_pattern: None,
            txt_pattern: None,
            well_known_port: DEFAULT_WELL_KNOWN_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            persistent_cache_path: None,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a JSON file, checking that its patterns compile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, [`Error::InvalidJSON`] if it isn't a
    /// valid config, and [`Error::InvalidPattern`] if a configured pattern doesn't compile.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.patterns()?;
        Ok(conf)
    }

    /// The path of the well-known record, e.g. `/.well-known/dat`.
    #[must_use]
    pub fn well_known_path(&self) -> String {
        format!("/.well-known/{}", self.record_name)
    }

    /// Compile the configured patterns, deriving the defaults from
    /// [`Config::record_name`] where unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if a pattern doesn't compile.
    pub fn patterns(&self) -> Result<Patterns, Error> {
        let record = regex::escape(&self.record_name);
        let hash = self
            .hash_pattern
            .clone()
            .unwrap_or_else(|| DEFAULT_HASH_PATTERN.to_string());
        let protocol = self
            .protocol_pattern
            .clone()
            .unwrap_or_else(|| format!("^{record}://([0-9a-f]{{64}})"));
        let txt = self
            .txt_pattern
            .clone()
            .unwrap_or_else(|| format!("^\"?{record}key=([0-9a-f]{{64}})\"?$"));
        Ok(Patterns {
            hash: case_insensitive(&hash)?,
            protocol: case_insensitive(&protocol)?,
            txt: case_insensitive(&txt)?,
        })
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, Error> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// The compiled matchers deciding what counts as a key.
///
/// `protocol` and `txt` must capture the key in their first group.
#[derive(Debug, Clone)]
pub struct Patterns {
    /// Matches a bare key.
    pub hash: Regex,
    /// Matches the first line of a well-known record, e.g. `dat://<key>`.
    pub protocol: Regex,
    /// Matches the data of a TXT answer, e.g. `"datkey=<key>"`.
    pub txt: Regex,
}
