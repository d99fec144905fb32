use crate::areas::command::GitCommand;
use crate::artifacts::pipeline::Stage;
use crate::errors::GitError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter, DuplexStream};
use tokio_util::sync::CancellationToken;

/// Runs one git subprocess: input is fed to its stdin, stdout becomes the output
pub struct CommandStage {
    command: GitCommand,
}

impl CommandStage {
    pub fn new(command: GitCommand) -> Self {
        CommandStage { command }
    }
}

#[async_trait]
impl Stage for CommandStage {
    fn name(&self) -> String {
        format!("git {}", self.command.describe())
    }

    async fn run(
        self: Box<Self>,
        input: Option<DuplexStream>,
        mut output: DuplexStream,
        cancel: CancellationToken,
    ) -> Result<(), GitError> {
        let mut command = self.command.command();
        command
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            GitError::transport(format!("unable to spawn `git {}`: {e}", self.command.describe()))
        })?;
        let stdin = child.stdin.take();
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| GitError::transport("stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| GitError::transport("stderr not captured"))?;

        let feed = async move {
            if let (Some(mut input), Some(mut stdin)) = (input, stdin) {
                tokio::io::copy(&mut input, &mut stdin).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let drain = async {
            tokio::io::copy(&mut stdout, &mut output).await?;
            output.shutdown().await
        };
        let collect_stderr = async {
            let mut buffer = Vec::new();
            stderr.read_to_end(&mut buffer).await.map(|_| buffer)
        };

        let work = async {
            let (fed, drained, stderr) = tokio::join!(feed, drain, collect_stderr);
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, fed, drained, stderr))
        };

        // dropping the child on cancellation kills it
        let (status, fed, drained, stderr) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GitError::Cancelled),
            result = work => result?,
        };

        if !status.success() {
            return Err(self.command.failure(status, &stderr.unwrap_or_default()));
        }
        fed.map_err(|e| GitError::transport(format!("feeding `git {}`: {e}", self.command.describe())))?;
        drained.map_err(|e| {
            GitError::transport(format!("draining `git {}`: {e}", self.command.describe()))
        })?;

        Ok(())
    }
}

/// Line-oriented filter: each input line is mapped to at most one output line
pub struct LineStage<F> {
    name: String,
    filter: F,
}

impl<F> LineStage<F>
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    pub fn new(name: impl Into<String>, filter: F) -> Self {
        LineStage {
            name: name.into(),
            filter,
        }
    }
}

#[async_trait]
impl<F> Stage for LineStage<F>
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn run(
        self: Box<Self>,
        input: Option<DuplexStream>,
        output: DuplexStream,
        cancel: CancellationToken,
    ) -> Result<(), GitError> {
        let LineStage { mut filter, .. } = *self;
        let input = input.ok_or_else(|| GitError::transport("line stage without input"))?;
        let mut lines = BufReader::new(input).lines();
        let mut output = BufWriter::new(output);

        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GitError::Cancelled),
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                break;
            };

            if let Some(mapped) = filter(&line) {
                output.write_all(mapped.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
        }

        output.flush().await?;
        output.shutdown().await?;
        Ok(())
    }
}
