//! Probe executor.
//!
//! This module defines the [`Probe`] capability and its HTTP implementation,
//! [`Client`], which is configured through a [`ClientBuilder`].
//! A `Client` issues exactly one request per call and reduces the response
//! into a [`ProbeResponse`].
#![allow(
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::default_trait_access
)]
use async_trait::async_trait;
use http::header::{self, HeaderValue};
use log::debug;
use std::fmt::Debug;
use std::time::Duration;
use typed_builder::TypedBuilder;
use url::Url;

use crate::{ErrorKind, ProbeResponse, Result, extract::extract_title};

/// Default timeout in milliseconds before a probe is deemed as failed, 10000.
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 10_000;
/// Default user agent, `httprobe`.
pub const DEFAULT_USER_AGENT: &str = "httprobe";
/// Number of body bytes inspected for a page title.
pub const MAX_BODY_PREFIX: usize = 4096;

/// Proxy schemes that can tunnel probes
const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// A single request/response exchange against a URL.
///
/// Implementations must not retry: one call is one attempt.
#[async_trait]
pub trait Probe: Send + Sync + Debug {
    /// Probe `url` (scheme, host and optional port) once.
    ///
    /// When `inspect_body` is set, the title of the page is extracted from
    /// the beginning of the response body.
    ///
    /// # Errors
    ///
    /// Any transport or protocol failure, e.g. a refused connection, a DNS
    /// failure, a timeout or a failed TLS handshake.
    async fn probe(&self, url: &str, inspect_body: bool) -> Result<ProbeResponse>;
}

/// Builder for [`Client`].
///
/// ```no_run
/// use httprobe_lib::{ClientBuilder, Probe, Result};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let client = ClientBuilder::builder().build().client()?;
///     let response = client.probe("https://example.com", true).await?;
///     println!("{} {:?}", response.status, response.title);
///     Ok(())
/// }
/// ```
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
pub struct ClientBuilder {
    /// User-agent used for probing.
    #[builder(default = String::from(DEFAULT_USER_AGENT))]
    user_agent: String,

    /// HTTP method used for requests, e.g. `GET` or `HEAD`.
    #[builder(default = reqwest::Method::GET)]
    method: reqwest::Method,

    /// Time budget of one whole exchange, including connecting.
    #[builder(default = Duration::from_millis(DEFAULT_TIMEOUT_MILLIS))]
    timeout: Duration,

    /// Accept invalid and self-signed certificates.
    ///
    /// This is on by default: a probe answers "is HTTPS listening", not
    /// "is HTTPS trusted". Turn it off before reusing the client anywhere
    /// trust matters.
    #[builder(default = true)]
    allow_insecure: bool,

    /// Tunnel all probes through this proxy.
    ///
    /// Supported schemes are `http`, `https`, `socks5` and `socks5h`.
    proxy: Option<String>,
}

impl Default for ClientBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The user-agent is invalid.
    /// - The proxy URL cannot be parsed or has an unsupported scheme.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn client(self) -> Result<Client> {
        let user_agent = HeaderValue::from_str(&self.user_agent)?;

        let builder = reqwest::ClientBuilder::new()
            .danger_accept_invalid_certs(self.allow_insecure)
            // Report the first response instead of chasing redirects
            .redirect(reqwest::redirect::Policy::none())
            // Every probe uses a fresh connection
            .pool_max_idle_per_host(0)
            .connect_timeout(self.timeout)
            .timeout(self.timeout);

        let builder = match self.proxy.as_deref() {
            Some(proxy) => builder.proxy(parse_proxy(proxy)?),
            None => builder,
        };

        let reqwest_client = builder.build().map_err(ErrorKind::BuildRequestClient)?;

        Ok(Client {
            reqwest_client,
            method: self.method,
            user_agent,
        })
    }
}

/// Validate a proxy URL and turn it into a proxy for all schemes
fn parse_proxy(proxy: &str) -> Result<reqwest::Proxy> {
    let url = Url::parse(proxy)
        .map_err(|e| ErrorKind::InvalidProxy(proxy.to_string(), e.to_string()))?;

    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(ErrorKind::InvalidProxy(
            proxy.to_string(),
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ErrorKind::InvalidProxy(
            proxy.to_string(),
            "missing host".to_string(),
        ));
    }

    reqwest::Proxy::all(url.as_str())
        .map_err(|e| ErrorKind::InvalidProxy(proxy.to_string(), e.to_string()))
}

/// Probes endpoints over HTTP(S).
///
/// See [`ClientBuilder`] which contains sane defaults for all configuration options.
#[derive(Debug, Clone)]
pub struct Client {
    /// Underlying `reqwest` client instance that handles the HTTP requests.
    reqwest_client: reqwest::Client,
    /// HTTP method used for requests, e.g. `GET` or `HEAD`.
    method: reqwest::Method,
    /// Value of the `User-Agent` header.
    user_agent: HeaderValue,
}

#[async_trait]
impl Probe for Client {
    async fn probe(&self, url: &str, inspect_body: bool) -> Result<ProbeResponse> {
        let mut response = self
            .reqwest_client
            .request(self.method.clone(), url)
            .header(header::USER_AGENT, self.user_agent.clone())
            .header(header::CONNECTION, HeaderValue::from_static("close"))
            .send()
            .await?;

        let mut probed = ProbeResponse::new(response.status());
        probed.server = response
            .headers()
            .get(header::SERVER)
            .map(|server| String::from_utf8_lossy(server.as_bytes()).into_owned());

        if inspect_body {
            match read_prefix(&mut response, MAX_BODY_PREFIX).await {
                Ok(prefix) => probed.title = extract_title(&String::from_utf8_lossy(&prefix)),
                Err(e) => debug!("Cannot read body of {url}: {e}"),
            }
        } else {
            // Drain the body so the connection is released right away
            while let Ok(Some(_)) = response.chunk().await {}
        }

        Ok(probed)
    }
}

/// Read at most `limit` bytes from the start of the response body
async fn read_prefix(response: &mut reqwest::Response, limit: usize) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(limit);
    while body.len() < limit {
        match response.chunk().await? {
            Some(chunk) => {
                let take = chunk.len().min(limit - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            None => break,
        }
    }
    Ok(body)
}
