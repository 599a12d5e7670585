use crate::options::Config;
use anyhow::{Context, Result};
use http::Method;
use httprobe_lib::{Client, ClientBuilder};
use std::{str::FromStr, time::Duration};

/// Creates a client according to the command-line config
pub(crate) fn create(cfg: &Config) -> Result<Client> {
    let method = Method::from_str(&cfg.method.to_uppercase())
        .with_context(|| format!("Invalid request method `{}`", cfg.method))?;

    ClientBuilder::builder()
        .user_agent(cfg.user_agent.clone())
        .method(method)
        .timeout(Duration::from_millis(cfg.timeout))
        .proxy(cfg.proxy.clone())
        .build()
        .client()
        .context("Failed to create request client")
}
