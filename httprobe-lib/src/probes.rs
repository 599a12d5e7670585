//! Expansion of hostnames into submissions.
//!
//! Besides the default probe (`https:443`, cascading to `http:80`), extra
//! probes can be requested as named port sets or explicit `scheme:port`
//! pairs. [`expand`] turns a hostname and those probes into [`Route`]s,
//! which tell the feeder onto which stream each submission goes.

use log::debug;
use std::str::FromStr;

use crate::{ErrorKind, Submission};

/// Curated lists of common alternate web ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortSet {
    /// `small`
    Small,
    /// `large`
    Large,
    /// `xlarge`
    XLarge,
}

const SMALL_PORTS: &[u16] = &[
    7000, 7001, 8000, 8001, 8008, 8080, 8083, 8443, 8834, 8888, 10000,
];

const LARGE_PORTS: &[u16] = &[
    81, 591, 2082, 2087, 2095, 2096, 3000, 8000, 8001, 8008, 8080, 8083, 8443, 8834, 8888,
];

const XLARGE_PORTS: &[u16] = &[
    81, 300, 591, 593, 832, 981, 1010, 1311, 2082, 2087, 2095, 2096, 2480, 3000, 3128, 3333, 4243,
    4567, 4711, 4712, 4993, 5000, 5104, 5108, 5800, 6543, 7000, 7396, 7474, 8000, 8001, 8008, 8014,
    8042, 8069, 8080, 8081, 8088, 8090, 8091, 8118, 8123, 8172, 8222, 8243, 8280, 8281, 8333, 8443,
    8500, 8834, 8880, 8888, 8983, 9000, 9043, 9060, 9080, 9090, 9091, 9200, 9443, 9800, 9981,
    12443, 16080, 18091, 18092, 20720, 28017,
];

impl PortSet {
    /// The ports contained in this set
    #[must_use]
    pub const fn ports(self) -> &'static [u16] {
        match self {
            PortSet::Small => SMALL_PORTS,
            PortSet::Large => LARGE_PORTS,
            PortSet::XLarge => XLARGE_PORTS,
        }
    }
}

/// An extra probe requested in addition to (or instead of) the default one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProbeSpec {
    /// Probe every port of a named set over HTTPS (and HTTP, per cascade)
    PortSet(PortSet),
    /// Probe a single port with the given scheme
    Explicit {
        /// Scheme as given, e.g. `https` or `http`
        scheme: String,
        /// Port as given
        port: String,
    },
}

impl FromStr for ProbeSpec {
    type Err = ErrorKind;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "small" => Ok(Self::PortSet(PortSet::Small)),
            "large" => Ok(Self::PortSet(PortSet::Large)),
            "xlarge" => Ok(Self::PortSet(PortSet::XLarge)),
            _ => match token.split(':').collect::<Vec<_>>().as_slice() {
                [scheme, port] => Ok(Self::Explicit {
                    scheme: (*scheme).to_string(),
                    port: (*port).to_string(),
                }),
                _ => Err(ErrorKind::MalformedProbe(token.to_string())),
            },
        }
    }
}

impl ProbeSpec {
    /// Parse probe tokens, silently dropping malformed ones
    pub fn parse_all<I, S>(tokens: I) -> Vec<ProbeSpec>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .filter_map(|token| match token.as_ref().parse() {
                Ok(spec) => Some(spec),
                Err(e) => {
                    debug!("Skipping probe: {e}");
                    None
                }
            })
            .collect()
    }
}

/// Which input stream a submission is sent to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Probed over HTTPS first, then possibly over HTTP
    Https(Submission),
    /// Probed over HTTP only
    Http(Submission),
}

/// Expand `host` into the routes for the default probe (unless
/// `skip_default`) followed by every probe in `specs`, in order.
pub fn expand<'a>(
    host: &'a str,
    skip_default: bool,
    specs: &'a [ProbeSpec],
) -> impl Iterator<Item = Route> + 'a {
    let default = (!skip_default).then(|| Route::Https(Submission::new(host)));

    let extra = specs
        .iter()
        .flat_map(move |spec| -> Box<dyn Iterator<Item = Route> + 'a> {
            match spec {
                ProbeSpec::PortSet(set) => Box::new(
                    set.ports()
                        .iter()
                        .map(move |port| Route::Https(Submission::with_port(host, port))),
                ),
                ProbeSpec::Explicit { scheme, port } => {
                    let submission = Submission::with_port(host, port);
                    // `https:` still cascades to HTTP; anything else is HTTP only
                    let route = if scheme.eq_ignore_ascii_case("https") {
                        Route::Https(submission)
                    } else {
                        Route::Http(submission)
                    };
                    Box::new(std::iter::once(route))
                }
            }
        });

    default.into_iter().chain(extra)
}
