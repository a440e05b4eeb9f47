//! Error types.

/// Error enumerates the possible resolution error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a name can't be reduced to a hostname or a key, e.g. an empty string or a
    /// URL with neither a host nor a path.
    #[error("invalid name: \"{0}\"")]
    InvalidName(String),

    /// Returned by the [DNS-over-HTTPS probe][crate::probe::doh] when the name has no dot and so
    /// can't be the subject of a TXT query. No request is made.
    #[error("name is not a fully qualified domain name: \"{0}\"")]
    NotFQDN(String),

    /// Returned when the [`Transport`][crate::transport::Transport] couldn't complete a request
    /// at all, e.g. on timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// Returned when a host answered with a status other than 200, and other than 404 for the
    /// [well-known probe][crate::probe::well_known].
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// Returned when a name clearly has no record: the well-known host was unreachable or
    /// answered 404, the DNS-over-HTTPS answer held no matching TXT record, or a previous miss
    /// is still cached.
    #[error("no record found for \"{0}\"")]
    RecordNotFound(String),

    /// Returned when a record body was fetched but doesn't hold a usable key.
    #[error("malformed record for \"{0}\"")]
    MalformedRecord(String),

    /// Returned when a well-known redirect has no usable `Location` header.
    #[error("invalid redirect for \"{0}\"")]
    InvalidRedirect(String),

    /// Returned when a well-known lookup is redirected more than
    /// [`MAX_REDIRECTS`][crate::probe::well_known::MAX_REDIRECTS] times.
    #[error("too many redirects for \"{0}\"")]
    TooManyRedirects(String),

    /// Returned when one of the configured [`Patterns`][crate::config::Patterns] is not a valid
    /// regular expression.
    #[error("invalid pattern")]
    InvalidPattern(#[from] regex::Error),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON fails. Covers DNS-over-HTTPS answers as well as config and
    /// [`FilePersistentCache`][crate::persistent::file::FilePersistentCache] state files.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error means the name clearly doesn't resolve, as opposed to a transient or
    /// ambiguous failure. Only these failures are remembered as cached misses.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RecordNotFound(_))
    }
}
