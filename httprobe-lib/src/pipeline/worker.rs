use async_channel::{Receiver, Sender};
use log::{debug, error, trace};
use std::sync::Arc;

use crate::{OutputFields, OutputLine, Probe, RateLimit, Scheme, Submission};

/// Where an HTTPS worker forwards submissions for a plain-HTTP attempt
#[derive(Debug, Clone)]
pub(crate) struct Cascade {
    pub(crate) http: Sender<Submission>,
    /// Skip the HTTP attempt when HTTPS already answered
    pub(crate) prefer_https: bool,
}

/// Probes every submission it receives with one scheme.
///
/// HTTPS workers carry a [`Cascade`]; HTTP workers are the end of the line.
#[derive(Debug)]
pub(crate) struct Worker {
    pub(crate) scheme: Scheme,
    pub(crate) requests: Receiver<Submission>,
    pub(crate) responses: Sender<OutputLine>,
    pub(crate) cascade: Option<Cascade>,
    pub(crate) prober: Arc<dyn Probe>,
    pub(crate) limiter: Arc<dyn RateLimit>,
    pub(crate) fields: OutputFields,
}

impl Worker {
    /// Forward every submission to `cascade` after probing it
    pub(crate) fn cascading(self, cascade: Cascade) -> Self {
        Self {
            cascade: Some(cascade),
            ..self
        }
    }

    /// Process submissions until the input stream is closed and drained,
    /// or until the output stream is closed
    pub(crate) async fn listen(self) {
        while let Ok(submission) = self.requests.recv().await {
            if self.responses.is_closed() {
                debug!("Output closed, stopping {} worker", self.scheme);
                break;
            }
            let reached = self.probe(&submission).await;

            let Some(cascade) = &self.cascade else {
                continue;
            };
            if reached && cascade.prefer_https {
                continue;
            }
            trace!("Cascading {submission} to HTTP");
            if cascade.http.send(submission).await.is_err() {
                if !self.responses.is_closed() {
                    error!("HTTP input closed while {} workers were running", self.scheme);
                }
                break;
            }
        }
    }

    /// Probe one submission and report it if it answered.
    /// Returns whether the endpoint answered.
    async fn probe(&self, submission: &Submission) -> bool {
        self.limiter.acquire().await;

        let url = submission.url(self.scheme);
        match self.prober.probe(&url, self.fields.title).await {
            Ok(response) => {
                let line = OutputLine::new(url, &response, self.fields);
                if self.responses.send(line).await.is_err() {
                    debug!("Output closed, dropping result for {submission}");
                }
                true
            }
            Err(e) => {
                debug!("{url}: {e}");
                false
            }
        }
    }
}
