use std::hash::Hash;
use thiserror::Error;

/// Possible errors when probing hosts with `httprobe_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Reqwest network error
    ///
    /// Covers refused connections, DNS failures, timeouts and TLS handshake
    /// failures alike. The pipeline treats all of them as "not reachable".
    #[error("Network error while trying to connect to an endpoint via reqwest")]
    NetworkError(#[source] reqwest::Error),
    /// The reqwest client could not be created
    #[error("Error creating request client: {0}")]
    BuildRequestClient(#[source] reqwest::Error),
    /// The given header could not be parsed.
    /// A possible error when converting a `HeaderValue` from a string or byte
    /// slice.
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
    /// The proxy URL cannot be used for tunnelling probes
    #[error("Invalid proxy URL `{0}`: {1}")]
    InvalidProxy(String, String),
    /// Both worker pools need at least one worker each
    #[error("Concurrency must be at least 2 (split between HTTPS and HTTP), got {0}")]
    InvalidConcurrency(usize),
    /// Requests per second must be zero (unlimited) or a positive number
    #[error("Invalid request rate {0}; use 0 for unlimited or a positive number")]
    InvalidRate(f64),
    /// An extra probe is neither a port set nor a `scheme:port` pair
    #[error("Malformed probe `{0}`; expected small, large, xlarge or proto:port")]
    MalformedProbe(String),
    /// Any form of I/O error while reading hosts or writing results
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ErrorKind {
    /// Returns `true` if the error was caused by the request timing out
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::NetworkError(e) if e.is_timeout())
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NetworkError(e1), Self::NetworkError(e2))
            | (Self::BuildRequestClient(e1), Self::BuildRequestClient(e2)) => {
                e1.to_string() == e2.to_string()
            }
            (Self::InvalidProxy(u1, r1), Self::InvalidProxy(u2, r2)) => u1 == u2 && r1 == r2,
            (Self::InvalidConcurrency(c1), Self::InvalidConcurrency(c2)) => c1 == c2,
            (Self::InvalidRate(r1), Self::InvalidRate(r2)) => r1.to_bits() == r2.to_bits(),
            (Self::MalformedProbe(p1), Self::MalformedProbe(p2)) => p1 == p2,
            (Self::IoError(e1), Self::IoError(e2)) => e1.kind() == e2.kind(),
            (Self::InvalidHeader(_), Self::InvalidHeader(_)) => true,
            _ => false,
        }
    }
}

impl Eq for ErrorKind {}

impl Hash for ErrorKind {
    fn hash<H>(&self, state: &mut H)
    where
        H: std::hash::Hasher,
    {
        match self {
            Self::NetworkError(e) | Self::BuildRequestClient(e) => e.to_string().hash(state),
            Self::InvalidHeader(e) => e.to_string().hash(state),
            Self::InvalidProxy(u, r) => (u, r).hash(state),
            Self::InvalidConcurrency(c) => c.hash(state),
            Self::InvalidRate(r) => r.to_bits().hash(state),
            Self::MalformedProbe(p) => p.hash(state),
            Self::IoError(e) => e.kind().hash(state),
        }
    }
}

impl From<reqwest::Error> for ErrorKind {
    fn from(e: reqwest::Error) -> Self {
        Self::NetworkError(e)
    }
}
