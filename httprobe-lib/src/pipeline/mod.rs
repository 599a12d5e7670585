//! The probing pipeline.
//!
//! Hostnames are read from an input source and expanded into submissions,
//! which flow through two worker pools:
//!
//! ```text
//!            +--> HTTPS input --> HTTPS workers --+--> output --> writer
//! feeder ----+                        |           |
//!            +--> HTTP input  <-------+ (cascade) |
//!                      |                          |
//!                      +----> HTTP workers -------+
//! ```
//!
//! Every stream is closed exactly once, after all of its producers are
//! done: the HTTPS input after the feeder, the HTTP input after the feeder
//! and all HTTPS workers, the output after all HTTP workers.
#![allow(clippy::module_name_repetitions)]

mod collector;
mod feeder;
mod stage;
mod worker;

use async_channel::{Receiver, Sender};
use log::debug;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};
use typed_builder::TypedBuilder;

use crate::{
    ErrorKind, OutputFields, OutputLine, Probe, Result, Scheme, Submission,
    probes::ProbeSpec,
    ratelimit::{RateLimit, Unlimited},
};
use collector::collect;
use feeder::Feeder;
use stage::Stage;
use worker::{Cascade, Worker};

/// Default total number of workers, split evenly between HTTPS and HTTP
pub const DEFAULT_CONCURRENCY: usize = 20;

/// What a finished [`Pipeline::run`] processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Non-blank input lines
    pub hosts: usize,
    /// Submissions handed to the worker pools by the feeder
    pub submissions: usize,
    /// Result lines written
    pub lines: usize,
}

/// A configured probing pipeline.
///
/// ```no_run
/// use httprobe_lib::{ClientBuilder, Pipeline, Result};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let client = ClientBuilder::default().client()?;
///     let pipeline = Pipeline::builder().prober(Arc::new(client)).build();
///
///     let input: &[u8] = b"example.com\n";
///     let mut output = Vec::new();
///     pipeline.run(input, &mut output).await?;
///     print!("{}", String::from_utf8_lossy(&output));
///     Ok(())
/// }
/// ```
#[derive(TypedBuilder, Debug, Clone)]
pub struct Pipeline {
    /// Performs a single request per submission and scheme
    prober: Arc<dyn Probe>,

    /// Shared by both worker pools
    #[builder(default = Arc::new(Unlimited))]
    limiter: Arc<dyn RateLimit>,

    /// Total number of workers; half probe HTTPS and half probe HTTP.
    /// Must be at least 2.
    #[builder(default = DEFAULT_CONCURRENCY, setter(into))]
    concurrency: usize,

    /// Skip the HTTP attempt for submissions that answered over HTTPS
    #[builder(default)]
    prefer_https: bool,

    /// Do not add the default `https:443`/`http:80` probe for each host
    #[builder(default)]
    skip_default: bool,

    /// Extra probes for each host, in order
    #[builder(default, setter(into))]
    probes: Vec<ProbeSpec>,

    /// Fields appended to each result line
    #[builder(default)]
    fields: OutputFields,
}

impl Pipeline {
    /// Number of workers in each of the two pools
    const fn workers_per_scheme(&self) -> usize {
        self.concurrency / 2
    }

    /// Probe every host read from `input`, writing one line per answering
    /// endpoint to `output` in completion order.
    ///
    /// Returns once the input is exhausted, every submission is probed and
    /// every result line is written and flushed.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidConcurrency`] if fewer than two workers were
    ///   configured. Nothing is read or written in that case.
    /// - [`ErrorKind::IoError`] if writing to `output` fails. The pipeline
    ///   still shuts down cleanly before the error is returned.
    pub async fn run<R, W>(&self, input: R, output: &mut W) -> Result<Summary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if self.concurrency < 2 {
            return Err(ErrorKind::InvalidConcurrency(self.concurrency));
        }
        let workers = self.workers_per_scheme();
        debug!("Starting {workers} HTTPS and {workers} HTTP workers");

        let (https_tx, https_rx) = async_channel::bounded(workers);
        let (http_tx, http_rx) = async_channel::bounded(workers);
        let (output_tx, output_rx) = async_channel::bounded(workers);

        let mut https_stage = Stage::new("HTTPS");
        let mut http_stage = Stage::new("HTTP");
        for _ in 0..workers {
            https_stage.spawn(
                self.worker(Scheme::Https, https_rx.clone(), output_tx.clone())
                    .cascading(Cascade {
                        http: http_tx.clone(),
                        prefer_https: self.prefer_https,
                    })
                    .listen(),
            );
            http_stage.spawn(
                self.worker(Scheme::Http, http_rx.clone(), output_tx.clone())
                    .listen(),
            );
        }
        // Only the workers consume. If they all die, sends fail instead of
        // blocking forever.
        drop((https_rx, http_rx));

        let feeder = Feeder {
            skip_default: self.skip_default,
            probes: &self.probes,
        };
        let produce = async {
            let fed = feeder.feed(input, &https_tx, &http_tx, &output_tx).await;
            https_tx.close();
            https_stage.finish(&http_tx).await;
            http_stage.finish(&output_tx).await;
            fed
        };

        let (fed, written) = tokio::join!(produce, collect(output_rx, output));
        let lines = written?;

        Ok(Summary {
            hosts: fed.hosts,
            submissions: fed.submissions,
            lines,
        })
    }

    fn worker(
        &self,
        scheme: Scheme,
        requests: Receiver<Submission>,
        responses: Sender<OutputLine>,
    ) -> Worker {
        Worker {
            scheme,
            requests,
            responses,
            cascade: None,
            prober: Arc::clone(&self.prober),
            limiter: Arc::clone(&self.limiter),
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProbeResponse, probes::PortSet, ratelimit};
    use async_trait::async_trait;
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};

    /// Answers with 200 for a fixed set of URLs and records every call
    #[derive(Debug, Default)]
    struct FakeProber {
        reachable: HashSet<String>,
        calls: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl FakeProber {
        fn reaching<const N: usize>(urls: [&str; N]) -> Self {
            Self {
                reachable: urls.iter().map(ToString::to_string).collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Probe for FakeProber {
        async fn probe(&self, url: &str, inspect_body: bool) -> Result<ProbeResponse> {
            self.calls.lock().unwrap().push(url.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.reachable.contains(url) {
                let mut response = ProbeResponse::new(StatusCode::OK);
                response.server = Some("fake".to_string());
                if inspect_body {
                    response.title = Some(format!("Title of {url}"));
                }
                Ok(response)
            } else {
                Err(ErrorKind::IoError(io::Error::from(
                    io::ErrorKind::ConnectionRefused,
                )))
            }
        }
    }

    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("input went away")))
        }
    }

    async fn run(pipeline: &Pipeline, input: &str) -> (Summary, Vec<String>) {
        let mut output = Vec::new();
        let summary = tokio::time::timeout(
            Duration::from_secs(10),
            pipeline.run(input.as_bytes(), &mut output),
        )
        .await
        .expect("pipeline did not shut down")
        .unwrap();

        let mut lines: Vec<String> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(ToString::to_string)
            .collect();
        lines.sort();
        (summary, lines)
    }

    fn position(calls: &[String], url: &str) -> usize {
        calls.iter().position(|c| c == url).unwrap()
    }

    #[tokio::test]
    async fn test_reports_both_schemes() {
        let prober = Arc::new(FakeProber::reaching([
            "https://example.com",
            "http://example.com",
        ]));
        let pipeline = Pipeline::builder().prober(prober).build();

        let (summary, lines) = run(&pipeline, "example.com\n").await;
        assert_eq!(lines, vec!["http://example.com", "https://example.com"]);
        assert_eq!(
            summary,
            Summary {
                hosts: 1,
                submissions: 1,
                lines: 2
            }
        );
    }

    #[tokio::test]
    async fn test_prefer_https_skips_http() {
        let prober = Arc::new(FakeProber::reaching([
            "https://example.com",
            "http://example.com",
        ]));
        let pipeline = Pipeline::builder()
            .prober(prober.clone())
            .prefer_https(true)
            .build();

        let (_, lines) = run(&pipeline, "example.com\n").await;
        assert_eq!(lines, vec!["https://example.com"]);
        assert_eq!(prober.calls(), vec!["https://example.com"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_http() {
        let prober = Arc::new(FakeProber::reaching(["http://example.com"]));
        let pipeline = Pipeline::builder()
            .prober(prober.clone())
            .prefer_https(true)
            .build();

        let (_, lines) = run(&pipeline, "example.com\n").await;
        assert_eq!(lines, vec!["http://example.com"]);

        let calls = prober.calls();
        assert!(position(&calls, "https://example.com") < position(&calls, "http://example.com"));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let prober = Arc::new(FakeProber::default());
        let pipeline = Pipeline::builder().prober(prober.clone()).build();

        let (summary, lines) = run(&pipeline, "").await;
        assert_eq!(summary, Summary::default());
        assert!(lines.is_empty());
        assert!(prober.calls().is_empty());
    }

    #[tokio::test]
    async fn test_normalizes_and_skips_blank_lines() {
        let prober = Arc::new(FakeProber::reaching(["https://example.com"]));
        let pipeline = Pipeline::builder().prober(prober).build();

        let (summary, lines) = run(&pipeline, "\n  Example.COM  \n\n").await;
        assert_eq!(lines, vec!["https://example.com"]);
        assert_eq!(summary.hosts, 1);
    }

    #[tokio::test]
    async fn test_small_port_set() {
        let prober = Arc::new(FakeProber::default());
        let pipeline = Pipeline::builder()
            .prober(prober.clone())
            .skip_default(true)
            .probes(vec![ProbeSpec::PortSet(PortSet::Small)])
            .build();

        let (summary, lines) = run(&pipeline, "example.com\n").await;
        assert!(lines.is_empty());
        assert_eq!(summary.submissions, 11);

        let calls = prober.calls();
        let https: HashSet<_> = calls
            .iter()
            .filter(|c| c.starts_with("https://"))
            .cloned()
            .collect();
        let expected: HashSet<_> = PortSet::Small
            .ports()
            .iter()
            .map(|port| format!("https://example.com:{port}"))
            .collect();
        assert_eq!(https, expected);
        // Every unreachable HTTPS port cascades once
        assert_eq!(calls.len(), 22);
    }

    #[tokio::test]
    async fn test_explicit_http_probe_never_uses_https() {
        let prober = Arc::new(FakeProber::reaching(["http://example.com:8080"]));
        let pipeline = Pipeline::builder()
            .prober(prober.clone())
            .skip_default(true)
            .probes(ProbeSpec::parse_all(["http:8080"]))
            .build();

        let (_, lines) = run(&pipeline, "example.com\n").await;
        assert_eq!(lines, vec!["http://example.com:8080"]);
        assert_eq!(prober.calls(), vec!["http://example.com:8080"]);
    }

    #[tokio::test]
    async fn test_malformed_probe_alone_produces_nothing() {
        let prober = Arc::new(FakeProber::default());
        let pipeline = Pipeline::builder()
            .prober(prober.clone())
            .skip_default(true)
            .probes(ProbeSpec::parse_all(["bogus"]))
            .build();

        let (summary, lines) = run(&pipeline, "example.com\n").await;
        assert!(lines.is_empty());
        assert_eq!(summary.submissions, 0);
        assert!(prober.calls().is_empty());
    }

    #[tokio::test]
    async fn test_https_before_http_for_every_host() {
        let prober = Arc::new(FakeProber::default());
        let pipeline = Pipeline::builder()
            .prober(prober.clone())
            .concurrency(4usize)
            .build();

        let hosts: Vec<String> = (0..50).map(|i| format!("host{i}.test")).collect();
        run(&pipeline, &hosts.join("\n")).await;

        let calls = prober.calls();
        assert_eq!(calls.len(), 100);
        for host in &hosts {
            assert!(
                position(&calls, &format!("https://{host}"))
                    < position(&calls, &format!("http://{host}"))
            );
        }
    }

    #[tokio::test]
    async fn test_many_hosts_odd_concurrency() {
        let hosts: Vec<String> = (0..200).map(|i| format!("host{i}.test")).collect();
        let reachable: HashSet<String> = hosts
            .iter()
            .flat_map(|h| [format!("https://{h}"), format!("http://{h}")])
            .collect();
        let prober = Arc::new(FakeProber {
            reachable,
            delay: Some(Duration::from_millis(1)),
            ..FakeProber::default()
        });
        let pipeline = Pipeline::builder()
            .prober(prober)
            .concurrency(3usize)
            .build();

        let (summary, lines) = run(&pipeline, &hosts.join("\n")).await;
        assert_eq!(summary.lines, 400);
        assert_eq!(lines.len(), 400);
    }

    #[tokio::test]
    async fn test_output_fields() {
        let prober = Arc::new(FakeProber::reaching(["https://example.com"]));
        let pipeline = Pipeline::builder()
            .prober(prober)
            .prefer_https(true)
            .fields(OutputFields {
                status: true,
                server: true,
                title: true,
            })
            .build();

        let (_, lines) = run(&pipeline, "example.com").await;
        assert_eq!(
            lines,
            vec!["https://example.com [200] [fake] [Title of https://example.com]"]
        );
    }

    #[tokio::test]
    async fn test_rejects_too_few_workers() {
        for concurrency in [0usize, 1] {
            let pipeline = Pipeline::builder()
                .prober(Arc::new(FakeProber::default()))
                .concurrency(concurrency)
                .build();
            let mut output = Vec::new();
            let input: &[u8] = b"example.com\n";
            assert_eq!(
                pipeline.run(input, &mut output).await,
                Err(ErrorKind::InvalidConcurrency(concurrency))
            );
            assert!(output.is_empty());
        }
    }

    #[tokio::test]
    async fn test_write_error_shuts_down() {
        let hosts: Vec<String> = (0..1000).map(|i| format!("host{i}.test")).collect();
        let reachable: HashSet<String> =
            hosts.iter().map(|h| format!("https://{h}")).collect();
        let prober = Arc::new(FakeProber {
            reachable,
            ..FakeProber::default()
        });
        let pipeline = Pipeline::builder()
            .prober(prober.clone())
            .concurrency(2usize)
            .build();

        let input = hosts.join("\n");
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            pipeline.run(input.as_bytes(), &mut BrokenWriter),
        )
        .await
        .expect("pipeline did not shut down");

        assert!(matches!(result, Err(ErrorKind::IoError(e)) if e.kind() == io::ErrorKind::BrokenPipe));
        // Once output is gone, the rest of the input is neither read nor probed
        let calls = prober.calls().len();
        assert!(calls < 50, "{calls} probes issued after output failed");
    }

    #[tokio::test]
    async fn test_read_error_keeps_earlier_hosts() {
        let prober = Arc::new(FakeProber::reaching(["https://example.com"]));
        let pipeline = Pipeline::builder()
            .prober(prober)
            .prefer_https(true)
            .build();

        let input = BufReader::new((&b"example.com\n"[..]).chain(FailingReader));
        let mut output = Vec::new();
        let summary = pipeline.run(input, &mut output).await.unwrap();

        assert_eq!(summary.hosts, 1);
        assert_eq!(String::from_utf8(output).unwrap(), "https://example.com\n");
    }

    #[tokio::test]
    async fn test_rate_limit_spans_both_pools() {
        let prober = Arc::new(FakeProber::default());
        let pipeline = Pipeline::builder()
            .prober(prober.clone())
            .limiter(ratelimit::limiter(50.0).unwrap())
            .build();

        let start = Instant::now();
        run(&pipeline, "a.test\nb.test\nc.test\nd.test\ne.test\n").await;

        // 10 probes at 50/s need at least 9 intervals of 20ms
        assert_eq!(prober.calls().len(), 10);
        assert!(start.elapsed() >= Duration::from_millis(170));
    }
}
