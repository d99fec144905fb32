//! One-shot git subprocesses
//!
//! Every invocation that is not a batch session goes through [`GitCommand`]:
//!
//! - trusted arguments (flags chosen by this crate) are added with `arg`
//! - caller-supplied values go through `dynamic_arg`, which refuses anything
//!   git could mistake for an option
//! - paths are appended after `--`
//!
//! A failed invocation becomes [`GitError::Command`] carrying the captured stderr,
//! unless git reports an unknown object or revision, which maps to `NotExist`.

use crate::config::Settings;
use crate::errors::GitError;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Fragments of git's stderr that mean "no such object/revision"
const NOT_EXIST_MARKERS: [&str; 6] = [
    "bad object",
    "bad revision",
    "unknown revision",
    "not a valid object name",
    "not a tree object",
    "not a valid ref",
];

#[derive(Debug, Clone)]
pub struct GitCommand {
    binary: String,
    dir: PathBuf,
    args: Vec<String>,
    /// Last dynamic argument, reported back in `NotExist` errors
    subject: Option<String>,
}

impl GitCommand {
    pub fn new(settings: &Settings, dir: &Path, subcommand: &str) -> Self {
        GitCommand {
            binary: settings.git_binary.clone(),
            dir: dir.to_path_buf(),
            args: vec![subcommand.to_string()],
            subject: None,
        }
    }

    /// Add a trusted argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a caller-supplied argument such as a revision
    ///
    /// # Returns
    ///
    /// `InvalidArgument` if the value is empty or could be parsed as an option
    pub fn dynamic_arg(mut self, arg: &str) -> Result<Self, GitError> {
        if arg.is_empty() || arg.starts_with('-') {
            return Err(GitError::InvalidArgument(arg.to_string()));
        }

        self.args.push(arg.to_string());
        self.subject = Some(arg.to_string());
        Ok(self)
    }

    /// Append paths after a `--` separator
    pub fn paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.push("--".to_string());
        self.args.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn describe(&self) -> String {
        self.args.join(" ")
    }

    /// Build the process, stdin closed and output discarded unless reconfigured
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(&self.args)
            .current_dir(&self.dir)
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_NO_REPLACE_OBJECTS", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }

    /// Run to completion and return stdout
    ///
    /// The process is killed as soon as `cancel` fires.
    pub async fn output(&self, cancel: &CancellationToken) -> Result<Vec<u8>, GitError> {
        let mut command = self.command();
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        tracing::trace!(command = %self.describe(), dir = %self.dir.display(), "running git");
        let child = command.spawn().map_err(|e| {
            GitError::transport(format!("unable to spawn `git {}`: {e}", self.describe()))
        })?;

        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = cancel.cancelled() => return Err(GitError::Cancelled),
        };

        if !output.status.success() {
            return Err(self.failure(output.status, &output.stderr));
        }

        Ok(output.stdout)
    }

    /// Run to completion and return stdout as trimmed text
    pub async fn output_string(&self, cancel: &CancellationToken) -> Result<String, GitError> {
        let stdout = self.output(cancel).await?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    pub(crate) fn failure(&self, status: ExitStatus, stderr: &[u8]) -> GitError {
        let stderr = String::from_utf8_lossy(stderr).trim().to_string();
        let lowercase = stderr.to_lowercase();

        if NOT_EXIST_MARKERS
            .iter()
            .any(|marker| lowercase.contains(marker))
        {
            tracing::debug!(command = %self.describe(), %stderr, "git reported a missing object");
            return GitError::not_exist(self.subject.clone().unwrap_or_default());
        }

        GitError::Command {
            command: self.describe(),
            status: status.to_string(),
            stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> GitCommand {
        GitCommand::new(&Settings::default(), Path::new("."), "log")
    }

    #[test]
    fn dynamic_arguments_cannot_be_options() {
        assert!(command().dynamic_arg("--output=/tmp/x").is_err());
        assert!(command().dynamic_arg("").is_err());
        assert!(command().dynamic_arg("HEAD").is_ok());
    }

    #[test]
    fn paths_follow_a_separator() {
        let command = command()
            .arg("-1")
            .dynamic_arg("HEAD")
            .unwrap()
            .paths(["-weird-name"]);

        assert_eq!(command.describe(), "log -1 HEAD -- -weird-name");
    }

    #[tokio::test]
    async fn failed_invocations_are_errors() {
        let dir = std::env::temp_dir();
        let result = GitCommand::new(&Settings::default(), &dir, "rev-parse")
            .arg("--verify")
            .arg("--quiet")
            .dynamic_arg("refs/heads/does-not-exist-anywhere")
            .unwrap()
            .output(&CancellationToken::new())
            .await;

        // outside of a repository git fails with a plain error instead
        assert!(result.is_err());
    }
}
