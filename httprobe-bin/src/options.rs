use crate::verbosity::Verbosity;
use anyhow::{Context, Result};
use clap::Parser;
use const_format::{concatcp, formatcp};
use httprobe_lib::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_MILLIS, DEFAULT_USER_AGENT, OutputFields};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

pub(crate) const HTTPROBE_CONFIG_FILE: &str = "httprobe.toml";

const DEFAULT_METHOD: &str = "GET";
const DEFAULT_RATE: f64 = 0.0;

// this exists because clap requires `&str` type values for defaults
// whereas serde expects owned `String` types
const CONCURRENCY_STR: &str = concatcp!(DEFAULT_CONCURRENCY);
const TIMEOUT_STR: &str = concatcp!(DEFAULT_TIMEOUT_MILLIS);
// Show the default config file in the help text while still being able to
// tell whether the user passed one explicitly. Only an explicit file has to
// exist.
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    HTTPROBE_CONFIG_FILE,
);

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    concurrency: usize = DEFAULT_CONCURRENCY;
    timeout: u64 = DEFAULT_TIMEOUT_MILLIS;
    method: String = DEFAULT_METHOD.to_string();
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    verbosity: Verbosity = Verbosity::default();
}

// Fold the values of a TOML config into the CLI config, for every key that
// was left at its default on the command line.
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// httprobe takes a list of domains on stdin and probes each of them for
/// working HTTP and HTTPS servers.
///
/// Every endpoint that answers with any HTTP response is printed as one URL
/// per line, in the order the answers arrive.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct HttprobeOptions {
    #[arg(short = 'C', long = "config")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

/// The main configuration for httprobe
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// Total number of concurrent workers, split evenly between HTTPS and HTTP.
    /// Must be at least 2
    #[arg(short, long, default_value = &CONCURRENCY_STR, verbatim_doc_comment)]
    #[serde(default = "concurrency")]
    pub(crate) concurrency: usize,

    /// Add additional probe (proto:port) or use a port set (small, large, xlarge)
    #[arg(
        short,
        long,
        value_name = "PROBE",
        long_help = "Add an additional probe for every host. Can be given multiple times.

Either `proto:port`, e.g. `http:8080` or `https:8443`, or the name of a port
set which probes every port of the set over HTTPS (and HTTP, if HTTPS does
not answer):

    small   7000, 7001, 8000, 8001, 8008, 8080, 8083, 8443, 8834, 8888, 10000
    large   15 common alternate web ports
    xlarge  70 common alternate web ports

Malformed probes are skipped."
    )]
    #[serde(default)]
    pub(crate) probe: Vec<String>,

    /// Skip the default probes (http:80 and https:443)
    #[arg(short, long)]
    #[serde(default)]
    pub(crate) skip_default: bool,

    /// Timeout in milliseconds for each probe, from connect to response finished
    #[arg(short, long, default_value = &TIMEOUT_STR)]
    #[serde(default = "timeout")]
    pub(crate) timeout: u64,

    /// Only try plain HTTP if HTTPS fails
    #[arg(long)]
    #[serde(default)]
    pub(crate) prefer_https: bool,

    /// HTTP method to use, e.g. GET or HEAD
    #[arg(short = 'X', long, default_value = DEFAULT_METHOD)]
    #[serde(default = "method")]
    pub(crate) method: String,

    /// User agent
    #[arg(short = 'A', long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Proxy URL for all probes, e.g. http://127.0.0.1:8080 or socks5://127.0.0.1:1080
    #[arg(long, value_name = "URL")]
    #[serde(default)]
    pub(crate) proxy: Option<String>,

    /// Output the status code of each answering endpoint
    #[arg(long)]
    #[serde(default)]
    pub(crate) status: bool,

    /// Output the Server header of each answering endpoint
    #[arg(long)]
    #[serde(default)]
    pub(crate) server: bool,

    /// Output the page title of each answering endpoint
    #[arg(long)]
    #[serde(default)]
    pub(crate) title: bool,

    /// Maximum number of requests per second across all workers (0 = unlimited)
    #[arg(long, default_value_t = DEFAULT_RATE)]
    #[serde(default)]
    pub(crate) rate: f64,

    /// Number of threads to utilize.
    /// Defaults to number of cores available to the system
    #[arg(short = 'T', long, verbatim_doc_comment)]
    #[serde(default)]
    pub(crate) threads: Option<usize>,
}

impl Config {
    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        // Read configuration file
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        // NOTE: if you see an error within this macro call, check to make sure
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                verbose: Verbosity::default(),
                concurrency: DEFAULT_CONCURRENCY,
                probe: Vec::<String>::new(),
                skip_default: false,
                timeout: DEFAULT_TIMEOUT_MILLIS,
                prefer_https: false,
                method: DEFAULT_METHOD,
                user_agent: DEFAULT_USER_AGENT,
                proxy: None,
                status: false,
                server: false,
                title: false,
                rate: DEFAULT_RATE,
                threads: None,
            }
        }
    }

    /// Which optional fields each result line carries
    pub(crate) const fn output_fields(&self) -> OutputFields {
        OutputFields {
            status: self.status,
            server: self.server,
            title: self.title,
        }
    }
}
