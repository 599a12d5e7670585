use http::StatusCode;
use std::fmt::Display;

/// What a successful probe learned about an endpoint.
///
/// A failed probe has no response at all; see [`crate::Probe::probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    /// Status code of the first response (redirects are not followed)
    pub status: StatusCode,
    /// Value of the `Server` response header
    pub server: Option<String>,
    /// Normalized page title, only present when the body was inspected
    pub title: Option<String>,
}

impl ProbeResponse {
    /// Create a response without server header or title
    #[must_use]
    pub const fn new(status: StatusCode) -> Self {
        Self {
            status,
            server: None,
            title: None,
        }
    }
}

/// Toggles for the optional fields appended to each [`OutputLine`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct OutputFields {
    /// Append ` [<status>]`
    pub status: bool,
    /// Append ` [<server>]`
    pub server: bool,
    /// Append ` [<title>]`
    pub title: bool,
}

/// Placeholder for an absent server header or title
const MISSING: &str = "-";

/// A formatted result line for a successful probe, e.g.
/// `https://example.com:8443 [200] [nginx] [Welcome]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputLine(String);

impl OutputLine {
    /// Format `url` together with the enabled `fields` of `response`
    #[must_use]
    pub fn new(url: String, response: &ProbeResponse, fields: OutputFields) -> Self {
        let mut line = url;
        if fields.status {
            line.push_str(&format!(" [{}]", response.status.as_u16()));
        }
        if fields.server {
            let server = response.server.as_deref().unwrap_or(MISSING);
            line.push_str(&format!(" [{server}]"));
        }
        if fields.title {
            let title = response.title.as_deref().unwrap_or(MISSING);
            line.push_str(&format!(" [{title}]"));
        }
        Self(line)
    }

    /// The formatted line without a trailing newline
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OutputLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
