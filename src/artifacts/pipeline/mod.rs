//! Concurrent byte-stream pipelines
//!
//! A [`Pipeline`] is a chain of [`Stage`]s, each running as its own task and
//! connected to its neighbours by a bounded in-memory pipe. Stages never see
//! more than their own input and output, so memory stays flat no matter how
//! much flows through.
//!
//! ## Shutdown
//!
//! - a stage finishing closes its output, which its consumer sees as EOF
//! - a stage failing cancels the pipeline token; every other stage aborts its
//!   read, write or subprocess and unwinds
//! - a consumer going away turns the producer's next write into an error
//!
//! [`PipelineHandle::wait`] reports the failure that started the shutdown.

pub mod stages;

use crate::errors::GitError;
use async_trait::async_trait;
use tokio::io::DuplexStream;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Stage: Send {
    fn name(&self) -> String;

    /// Consume `input` (absent for the first stage) and produce into `output`
    ///
    /// Dropping `output` signals end of stream to the next stage.
    async fn run(
        self: Box<Self>,
        input: Option<DuplexStream>,
        output: DuplexStream,
        cancel: CancellationToken,
    ) -> Result<(), GitError>;
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    capacity: usize,
}

impl Pipeline {
    /// Create an empty pipeline whose pipes buffer `capacity` bytes each
    pub fn new(capacity: usize) -> Self {
        Pipeline {
            stages: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Start every stage
    ///
    /// # Returns
    ///
    /// The read end of the last stage's output, and a handle to wait for or
    /// cancel the stages
    pub fn spawn(self, cancel: &CancellationToken) -> (DuplexStream, PipelineHandle) {
        let cancel = cancel.child_token();
        let mut tasks = JoinSet::new();
        let mut input: Option<DuplexStream> = None;

        for stage in self.stages {
            let (output, next_input) = tokio::io::duplex(self.capacity);
            let stage_input = input.replace(next_input);
            let token = cancel.clone();
            let name = stage.name();

            tasks.spawn(async move {
                let result = stage.run(stage_input, output, token.clone()).await;
                match result {
                    Err(err) if err.is_cancelled() => Err(err),
                    Err(err) if token.is_cancelled() => {
                        // fallout of an earlier failure
                        tracing::trace!(stage = %name, %err, "pipeline stage unwound");
                        Err(GitError::Cancelled)
                    }
                    Err(err) => {
                        tracing::debug!(stage = %name, %err, "pipeline stage failed");
                        token.cancel();
                        Err(err)
                    }
                    Ok(()) => Ok(()),
                }
            });
        }

        // an empty pipeline yields an already closed stream
        let tail = input.unwrap_or_else(|| tokio::io::duplex(1).1);

        (tail, PipelineHandle { tasks, cancel })
    }
}

pub struct PipelineHandle {
    tasks: JoinSet<Result<(), GitError>>,
    cancel: CancellationToken,
}

impl PipelineHandle {
    /// Abort every stage
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for every stage to finish
    ///
    /// # Returns
    ///
    /// The first real failure, `Cancelled` if the pipeline was only cancelled
    pub async fn wait(mut self) -> Result<(), GitError> {
        let mut failure: Option<GitError> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let result = joined.unwrap_or_else(|err| {
                Err(GitError::transport(format!("pipeline stage aborted: {err}")))
            });

            if let Err(err) = result {
                self.cancel.cancel();
                failure = match failure {
                    Some(previous) if !previous.is_cancelled() || err.is_cancelled() => {
                        Some(previous)
                    }
                    _ => Some(err),
                };
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        // JoinSet aborts its tasks on drop; subprocesses are killed with them
        self.cancel.cancel();
    }
}
