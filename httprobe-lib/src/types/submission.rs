use std::fmt::Display;

/// The protocol a [`Submission`] is probed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain-text HTTP
    Http,
    /// HTTP over TLS
    Https,
}

impl Scheme {
    /// The scheme as used in a URL, e.g. `https`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `host[:port]` awaiting a protocol probe.
///
/// Submissions never carry a scheme; the worker pool that receives one
/// decides whether it is probed over HTTPS or HTTP.
/// The host part is always lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Submission(String);

impl Submission {
    /// Create a submission for the standard port of each scheme
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self(host.trim().to_lowercase())
    }

    /// Create a submission for an explicit port
    #[must_use]
    pub fn with_port(host: &str, port: impl Display) -> Self {
        Self(format!("{}:{port}", host.trim().to_lowercase()))
    }

    /// The fully qualified URL for probing this submission with `scheme`
    #[must_use]
    pub fn url(&self, scheme: Scheme) -> String {
        format!("{scheme}://{}", self.0)
    }

    /// The raw `host[:port]` string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
