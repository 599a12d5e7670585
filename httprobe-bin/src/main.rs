//! `httprobe` takes a list of domains and probes for working HTTP and HTTPS
//! servers.
//!
//! The httprobe binary is a wrapper around httprobe-lib, which reads
//! hostnames from stdin and prints every answering endpoint to stdout.
//!
//! Probe a list of hosts:
//! ```sh
//! cat domains.txt | httprobe
//! ```
//!
//! Also probe a few common alternate ports, and only try HTTP if HTTPS
//! does not answer:
//! ```sh
//! cat domains.txt | httprobe -p small -p http:8080 --prefer-https
//! ```
//!
//! Show status code, server and page title, at most 50 requests per second:
//! ```sh
//! cat domains.txt | httprobe --status --server --title --rate 50
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Error, Result, bail};
use clap::Parser;
use log::{error, info};
use tokio::io::BufReader;

use httprobe_lib::{Pipeline, ProbeSpec, ratelimit};

mod client;
mod logging;
mod options;
mod verbosity;

use crate::logging::init_logging;
use crate::options::{Config, HTTPROBE_CONFIG_FILE, HttprobeOptions};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator, e.g. an invalid flag value.
    #[allow(unused)]
    UnexpectedFailure = 1,
    ConfigFile = 3,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file and command-line arguments
fn load_config() -> Result<HttprobeOptions> {
    let mut opts = HttprobeOptions::parse();

    // Logging is set up after merging, so a `verbose` key in the config file
    // applies. If loading fails, the command-line verbosity is used to report
    // the error.
    let merged = merge_config_file(&mut opts);
    init_logging(&opts.config.verbose);
    merged?;

    Ok(opts)
}

/// Load a potentially existing config file and merge it into the config from
/// the CLI
fn merge_config_file(opts: &mut HttprobeOptions) -> Result<()> {
    if let Some(config_file) = &opts.config_file {
        match Config::load_from_file(config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    } else {
        // Without an explicit config file, use the default one from the
        // current directory if it exists. An invalid default file is an
        // error just like an invalid explicit one.
        let default_config = PathBuf::from(HTTPROBE_CONFIG_FILE);
        if default_config.is_file() {
            match Config::load_from_file(&default_config) {
                Ok(c) => opts.config.merge(c),
                Err(e) => {
                    bail!(
                        "Cannot load default configuration file `{}`: {e:?}",
                        default_config.display()
                    );
                }
            }
        }
    }
    Ok(())
}

/// Set up runtime and call httprobe entrypoint
fn run_main() -> Result<i32> {
    use std::process::exit;

    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error while loading config: {e}");
            exit(ExitCode::ConfigFile as i32);
        }
    };

    let runtime = match opts.config.threads {
        Some(threads) => {
            // We define our own runtime instead of the `tokio::main` attribute
            // since we want to make the number of threads configurable
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(threads)
                .enable_all()
                .build()?
        }
        None => tokio::runtime::Runtime::new()?,
    };

    match runtime.block_on(run(&opts.config)) {
        Err(e) if Some(ErrorKind::BrokenPipe) == underlying_io_error_kind(&e) => {
            exit(ExitCode::Success as i32);
        }
        res => res,
    }
}

/// Check if the given error can be traced back to an `io::ErrorKind`
/// This is helpful for troubleshooting the root cause of an error.
/// Code is taken from the anyhow documentation.
fn underlying_io_error_kind(error: &Error) -> Option<io::ErrorKind> {
    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
    }
    None
}

/// Probe every host from stdin
async fn run(cfg: &Config) -> Result<i32> {
    let limiter = ratelimit::limiter(cfg.rate).context("Invalid `--rate`")?;
    let client = client::create(cfg)?;

    let pipeline = Pipeline::builder()
        .prober(Arc::new(client))
        .limiter(limiter)
        .concurrency(cfg.concurrency)
        .prefer_https(cfg.prefer_https)
        .skip_default(cfg.skip_default)
        .probes(ProbeSpec::parse_all(&cfg.probe))
        .fields(cfg.output_fields())
        .build();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let summary = pipeline.run(stdin, &mut stdout).await?;
    info!(
        "Done: {} hosts, {} submissions, {} endpoints answered",
        summary.hosts, summary.submissions, summary.lines
    );

    Ok(ExitCode::Success as i32)
}
