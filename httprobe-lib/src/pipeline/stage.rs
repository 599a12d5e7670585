use async_channel::Sender;
use log::{error, trace};
use std::future::Future;
use tokio::task::JoinSet;

/// A group of tasks producing into the same downstream channel.
///
/// The channel a stage feeds must only be closed once every task of the
/// stage is gone; [`Stage::finish`] enforces this by joining all of them
/// before closing.
#[derive(Debug)]
pub(crate) struct Stage {
    name: &'static str,
    tasks: JoinSet<()>,
}

impl Stage {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            tasks: JoinSet::new(),
        }
    }

    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Wait for every task of this stage, then close `downstream`.
    pub(crate) async fn finish<T>(mut self, downstream: &Sender<T>) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                error!("A {} worker failed: {e}", self.name);
            }
        }
        trace!("All {} workers finished, closing their output", self.name);
        downstream.close();
    }
}
