use std::collections::HashMap;
use std::future::Future;

use tokio::task::{Id, JoinError, JoinSet};
use tracing::debug;

use crate::{PumpError, Result, Stage};

/// Stage tasks of one run, labelled so a panic can be traced back to its stage.
pub(crate) struct StageTasks {
    tasks: JoinSet<Result<()>>,
    stages: HashMap<Id, Stage>,
}

impl StageTasks {
    pub(crate) fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
            stages: HashMap::new(),
        }
    }

    pub(crate) fn spawn<F>(&mut self, stage: Stage, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let handle = self.tasks.spawn(task);
        self.stages.insert(handle.id(), stage);
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every task and resolve the run outcome.
    ///
    /// Semantics:
    /// - If every task succeeded, return `Ok`.
    /// - On the first failure (error, panic or cancellation), abort the
    ///   remaining tasks and return that failure. Nothing still in flight is
    ///   drained.
    pub(crate) async fn settle(mut self) -> Result<()> {
        while let Some(joined) = self.tasks.join_next_with_id().await {
            let outcome = match joined {
                Ok((id, result)) => {
                    self.stages.remove(&id);
                    result
                }
                Err(join_error) => {
                    let stage = self
                        .stages
                        .remove(&join_error.id())
                        .unwrap_or(Stage::Relay);
                    Err(task_failure(stage, join_error))
                }
            };

            if let Err(err) = outcome {
                debug!(remaining = self.tasks.len(), "Aborting run after fatal error");
                self.tasks.shutdown().await;
                return Err(err);
            }
        }
        Ok(())
    }
}

fn task_failure(stage: Stage, join_error: JoinError) -> PumpError {
    let message = if join_error.is_cancelled() {
        "task was cancelled".to_string()
    } else {
        format!("task panicked: {join_error}")
    };
    PumpError::TaskFailed { stage, message }
}
