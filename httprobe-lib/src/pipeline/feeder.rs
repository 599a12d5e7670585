use async_channel::Sender;
use log::{debug, error};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::probes::{ProbeSpec, Route, expand};
use crate::{OutputLine, Submission};

/// Counts of what the feeder handed to the worker pools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Fed {
    pub(crate) hosts: usize,
    pub(crate) submissions: usize,
}

/// Reads hostnames and sends their submissions onto the input streams
#[derive(Debug)]
pub(crate) struct Feeder<'a> {
    pub(crate) skip_default: bool,
    pub(crate) probes: &'a [ProbeSpec],
}

impl Feeder<'_> {
    /// Feed every line of `input` until it is exhausted.
    ///
    /// A read error ends feeding early; whatever was sent so far is still
    /// probed by the workers. Feeding also stops once `results` is closed,
    /// as nothing would be reported anymore.
    /// Lines that are not valid UTF-8 are decoded lossily.
    pub(crate) async fn feed<R>(
        &self,
        input: R,
        https: &Sender<Submission>,
        http: &Sender<Submission>,
        results: &Sender<OutputLine>,
    ) -> Fed
    where
        R: AsyncBufRead + Unpin,
    {
        let mut fed = Fed::default();
        let mut lines = input.split(b'\n');

        loop {
            if results.is_closed() {
                debug!("Output closed, no longer reading input");
                break;
            }
            let line = match lines.next_segment().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read input: {e}");
                    break;
                }
            };

            let line = String::from_utf8_lossy(&line);
            let host = line.trim();
            if host.is_empty() {
                continue;
            }
            fed.hosts += 1;

            for route in expand(host, self.skip_default, self.probes) {
                let sent = match route {
                    Route::Https(submission) => https.send(submission).await,
                    Route::Http(submission) => http.send(submission).await,
                };
                if sent.is_err() {
                    if results.is_closed() {
                        debug!("Output closed, no longer feeding workers");
                    } else {
                        error!("Workers stopped accepting submissions");
                    }
                    return fed;
                }
                fed.submissions += 1;
            }
        }

        fed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::PortSet;
    use pretty_assertions::assert_eq;

    async fn drain(rx: async_channel::Receiver<Submission>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(s) = rx.recv().await {
            out.push(s.to_string());
        }
        out
    }

    #[tokio::test]
    async fn test_feed_routes_and_normalizes() {
        let (https_tx, https_rx) = async_channel::unbounded();
        let (http_tx, http_rx) = async_channel::unbounded();
        let (results_tx, _results_rx) = async_channel::unbounded();
        let probes = ProbeSpec::parse_all(["http:8080", "bogus"]);
        let feeder = Feeder {
            skip_default: false,
            probes: &probes,
        };

        let input: &[u8] = b"Example.COM\n\n   \nfoo.org\n";
        let fed = feeder.feed(input, &https_tx, &http_tx, &results_tx).await;
        https_tx.close();
        http_tx.close();

        assert_eq!(fed, Fed { hosts: 2, submissions: 4 });
        assert_eq!(drain(https_rx).await, vec!["example.com", "foo.org"]);
        assert_eq!(
            drain(http_rx).await,
            vec!["example.com:8080", "foo.org:8080"]
        );
    }

    #[tokio::test]
    async fn test_feed_skip_default_with_port_set() {
        let (https_tx, https_rx) = async_channel::unbounded();
        let (http_tx, http_rx) = async_channel::unbounded();
        let (results_tx, _results_rx) = async_channel::unbounded();
        let probes = [ProbeSpec::PortSet(PortSet::Large)];
        let feeder = Feeder {
            skip_default: true,
            probes: &probes,
        };

        let input: &[u8] = b"example.com";
        let fed = feeder.feed(input, &https_tx, &http_tx, &results_tx).await;
        https_tx.close();
        http_tx.close();

        assert_eq!(fed.submissions, PortSet::Large.ports().len());
        assert_eq!(drain(https_rx).await.len(), PortSet::Large.ports().len());
        assert!(drain(http_rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_feed_stops_when_workers_are_gone() {
        let (https_tx, https_rx) = async_channel::bounded(1);
        let (http_tx, _http_rx) = async_channel::bounded(1);
        let (results_tx, _results_rx) = async_channel::unbounded();
        drop(https_rx);
        let feeder = Feeder {
            skip_default: false,
            probes: &[],
        };

        let input: &[u8] = b"a.com\nb.com\n";
        let fed = feeder.feed(input, &https_tx, &http_tx, &results_tx).await;
        assert_eq!(fed.submissions, 0);
    }

    #[tokio::test]
    async fn test_feed_keeps_going_after_invalid_utf8() {
        let (https_tx, https_rx) = async_channel::unbounded();
        let (http_tx, _http_rx) = async_channel::unbounded();
        let (results_tx, _results_rx) = async_channel::unbounded();
        let feeder = Feeder {
            skip_default: false,
            probes: &[],
        };

        let input: &[u8] = b"a.test\nb\xff.test\r\nc.test\nd.test\n";
        let fed = feeder.feed(input, &https_tx, &http_tx, &results_tx).await;
        https_tx.close();

        assert_eq!(fed, Fed { hosts: 4, submissions: 4 });
        assert_eq!(
            drain(https_rx).await,
            vec!["a.test", "b\u{fffd}.test", "c.test", "d.test"]
        );
    }

    #[tokio::test]
    async fn test_feed_stops_when_output_is_closed() {
        let (https_tx, https_rx) = async_channel::unbounded();
        let (http_tx, _http_rx) = async_channel::unbounded();
        let (results_tx, results_rx) = async_channel::unbounded::<OutputLine>();
        results_rx.close();
        let feeder = Feeder {
            skip_default: false,
            probes: &[],
        };

        let input: &[u8] = b"a.com\nb.com\n";
        let fed = feeder.feed(input, &https_tx, &http_tx, &results_tx).await;
        https_tx.close();

        assert_eq!(fed, Fed::default());
        assert!(drain(https_rx).await.is_empty());
    }
}
