//! `httprobe` is a library for finding working HTTP and HTTPS endpoints.
//!
//! Every hostname is probed over HTTPS first and then, unless HTTPS already
//! answered and HTTPS is preferred, over plain HTTP. Each endpoint that
//! answers with any HTTP response is reported as one line.
//!
//! A single endpoint can be probed with a [`Client`]:
//!
//! ```no_run
//! use httprobe_lib::{ClientBuilder, Probe, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let client = ClientBuilder::default().client()?;
//!   let response = client.probe("https://example.com", false).await?;
//!   println!("{}", response.status);
//!   Ok(())
//! }
//! ```
//!
//! Whole lists of hosts are processed by a [`Pipeline`], which runs a pool
//! of HTTPS workers and a pool of HTTP workers against a shared rate limit:
//!
//! ```no_run
//! use httprobe_lib::{ClientBuilder, Pipeline, Result, ratelimit};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let pipeline = Pipeline::builder()
//!     .prober(Arc::new(ClientBuilder::default().client()?))
//!     .limiter(ratelimit::limiter(10.0)?)
//!     .prefer_https(true)
//!     .build();
//!
//!   let mut stdout = tokio::io::stdout();
//!   let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//!   pipeline.run(stdin, &mut stdout).await?;
//!   Ok(())
//! }
//! ```
#![deny(missing_docs)]

mod client;
mod pipeline;
mod types;

pub mod extract;
pub mod probes;
pub mod ratelimit;

pub use crate::{
    client::{
        Client, ClientBuilder, DEFAULT_TIMEOUT_MILLIS, DEFAULT_USER_AGENT, MAX_BODY_PREFIX, Probe,
    },
    pipeline::{DEFAULT_CONCURRENCY, Pipeline, Summary},
    probes::{PortSet, ProbeSpec},
    ratelimit::RateLimit,
    types::*,
};
