//! Persistent `git cat-file` sessions
//!
//! A [`Batch`] owns one long-lived subprocess reading ids from stdin and
//! answering with one record per request, strictly in request order:
//!
//! - content mode (`--batch`): `<id> <type> <size>\n<content>\n`
//! - check mode (`--batch-check`): `<id> <type> <size>\n`
//! - either mode, unknown object: `<requested> missing\n`
//!
//! Because responses carry no correlation beyond their order, two requests must
//! never interleave on one session. Exclusive access is handed out by the
//! repository as a [`BatchGuard`].
//!
//! Any transport fault or cancellation *poisons* the session: the subprocess is
//! killed right away and the session is never used again. So does a guard
//! released while a record is still in flight, which happens when the future
//! driving an exchange is dropped between writing a request and consuming its
//! response.

use crate::areas::command::GitCommand;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::config::Settings;
use crate::errors::GitError;
use derive_new::new;
use std::future::Future;
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::OwnedMappedMutexGuard;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// `git cat-file --batch`
    Content,
    /// `git cat-file --batch-check`
    Check,
}

impl BatchKind {
    pub fn flag(&self) -> &'static str {
        match self {
            BatchKind::Content => "--batch",
            BatchKind::Check => "--batch-check",
        }
    }
}

/// Header line of one batch record
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct BatchHeader {
    pub id: ObjectId,
    pub object_type: ObjectType,
    pub size: u64,
}

impl BatchHeader {
    /// Parse `<id> <type> <size>`
    ///
    /// # Arguments
    ///
    /// * `line` - Header line without its newline
    /// * `requested` - Text that was written for this record, reported in `NotExist`
    pub fn parse(line: &str, requested: &str) -> Result<Self, GitError> {
        if let Some((_, status)) = line.rsplit_once(' ') {
            if status == "missing" || status == "ambiguous" {
                return Err(GitError::not_exist(requested));
            }
        }

        let mut fields = line.split(' ');
        let (Some(id), Some(object_type), Some(size), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(GitError::transport(format!(
                "malformed batch header {line:?}"
            )));
        };

        let id = ObjectId::try_parse(id)
            .map_err(|e| GitError::transport(format!("malformed batch header {line:?}: {e}")))?;
        let object_type = ObjectType::try_from(object_type)
            .map_err(|e| GitError::transport(format!("malformed batch header {line:?}: {e}")))?;
        let size = size
            .parse::<u64>()
            .map_err(|e| GitError::transport(format!("malformed batch header {line:?}: {e}")))?;

        Ok(BatchHeader::new(id, object_type, size))
    }
}

#[derive(Debug)]
pub struct Batch {
    kind: BatchKind,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    cancel: CancellationToken,
    poisoned: bool,
    /// A request was written and its record is not fully consumed yet
    in_flight: bool,
}

impl Batch {
    /// Start a session for the repository at `repo_path`
    ///
    /// The path is validated with `git rev-parse --git-dir` first: `cat-file`
    /// started outside a repository would fail only once the first request arrives.
    pub async fn spawn(
        settings: &Settings,
        repo_path: &Path,
        kind: BatchKind,
        cancel: CancellationToken,
    ) -> Result<Self, GitError> {
        ensure_valid_repository(settings, repo_path, &cancel).await?;

        let mut command = GitCommand::new(settings, repo_path, "cat-file")
            .arg(kind.flag())
            .command();
        command.stdin(Stdio::piped()).stdout(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| GitError::transport(format!("unable to spawn cat-file: {e}")))?;
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GitError::transport("cat-file stdout not captured"))?;

        tracing::debug!(path = %repo_path.display(), ?kind, pid = child.id(), "spawned batch session");

        Ok(Batch {
            kind,
            child,
            stdin,
            stdout: BufReader::new(stdout),
            cancel,
            poisoned: false,
            in_flight: false,
        })
    }

    pub fn kind(&self) -> BatchKind {
        self.kind
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Mark the session unusable and kill the subprocess
    pub fn poison(&mut self) {
        if !self.poisoned {
            tracing::debug!(kind = ?self.kind, pid = self.child.id(), "poisoning batch session");
        }
        self.poisoned = true;
        self.stdin = None;
        let _ = self.child.start_kill();
    }

    /// Write one request line
    pub async fn request(&mut self, text: &str) -> Result<(), GitError> {
        if text.contains('\n') {
            return Err(GitError::InvalidArgument(text.to_string()));
        }
        self.ensure_usable()?;
        if self.in_flight {
            self.poison();
            return Err(GitError::transport(
                "previous batch record was not consumed",
            ));
        }

        // set before writing: a partially written line desyncs the session too
        self.in_flight = true;
        let cancel = self.cancel.clone();
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(GitError::transport("batch session input closed"));
        };
        let result = cancellable(&cancel, async {
            stdin.write_all(text.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        })
        .await;

        self.settle(result)
    }

    /// Read the header of the next record
    ///
    /// A `missing` record is reported as `NotExist` and leaves the session usable.
    pub async fn read_header(&mut self, requested: &str) -> Result<BatchHeader, GitError> {
        self.ensure_usable()?;

        let cancel = self.cancel.clone();
        let mut line = String::new();
        loop {
            line.clear();
            let read = cancellable(&cancel, self.stdout.read_line(&mut line)).await;
            let read = self.settle(read)?;
            if read == 0 {
                self.poison();
                return Err(GitError::transport(format!(
                    "batch session closed while waiting for {requested:?}"
                )));
            }

            let header = line.trim_end_matches('\n');
            // a stray empty line may precede a header
            if header.is_empty() {
                continue;
            }

            return match BatchHeader::parse(header, requested) {
                Ok(header) => {
                    // check records end with their header
                    if self.kind == BatchKind::Check {
                        self.in_flight = false;
                    }
                    Ok(header)
                }
                Err(err) if err.is_not_exist() => {
                    self.in_flight = false;
                    Err(err)
                }
                Err(err) => {
                    self.poison();
                    Err(err)
                }
            };
        }
    }

    /// Read exactly `size` content bytes and the record's trailing newline
    pub async fn read_content(&mut self, size: u64) -> Result<Vec<u8>, GitError> {
        self.ensure_usable()?;

        let len = usize::try_from(size)
            .map_err(|_| GitError::transport(format!("object of {size} bytes too large")))?;
        let cancel = self.cancel.clone();
        let mut content = vec![0u8; len];
        let result = cancellable(&cancel, self.stdout.read_exact(&mut content)).await;
        self.settle(result)?;
        self.read_trailer().await?;

        Ok(content)
    }

    /// Skip `size` content bytes and the record's trailing newline
    pub async fn discard(&mut self, size: u64) -> Result<(), GitError> {
        self.ensure_usable()?;

        let cancel = self.cancel.clone();
        let result = cancellable(&cancel, async {
            let mut limited = (&mut self.stdout).take(size);
            tokio::io::copy(&mut limited, &mut tokio::io::sink()).await
        })
        .await;
        let copied = self.settle(result)?;
        if copied != size {
            self.poison();
            return Err(GitError::transport("batch session closed mid-record"));
        }

        self.read_trailer().await
    }

    /// Read a commit record and return the id of its tree
    pub async fn read_tree_id(&mut self, size: u64) -> Result<ObjectId, GitError> {
        let content = self.read_content(size).await?;
        let first_line = content.split(|b| *b == b'\n').next().unwrap_or_default();

        std::str::from_utf8(first_line)
            .ok()
            .and_then(|line| line.strip_prefix("tree "))
            .and_then(|id| ObjectId::try_parse(id).ok())
            .ok_or_else(|| GitError::transport("commit record does not start with a tree header"))
    }

    pub(crate) fn stdout_mut(&mut self) -> &mut BufReader<ChildStdout> {
        &mut self.stdout
    }

    /// Record that the current record was consumed through [`Batch::stdout_mut`]
    pub(crate) fn finish_record(&mut self) {
        self.in_flight = false;
    }

    /// Terminate the subprocess and wait for it to exit
    pub async fn close(mut self) -> Result<(), GitError> {
        // closing stdin lets cat-file exit on its own, the kill covers a stuck one
        self.stdin = None;
        let _ = self.child.start_kill();
        self.child.wait().await?;

        tracing::debug!(kind = ?self.kind, "closed batch session");
        Ok(())
    }

    async fn read_trailer(&mut self) -> Result<(), GitError> {
        let cancel = self.cancel.clone();
        let result = cancellable(&cancel, self.stdout.read_u8()).await;
        if self.settle(result)? != b'\n' {
            self.poison();
            return Err(GitError::transport("missing newline after batch record"));
        }

        self.in_flight = false;
        Ok(())
    }

    fn ensure_usable(&self) -> Result<(), GitError> {
        if self.poisoned {
            return Err(GitError::transport("batch session is poisoned"));
        }
        Ok(())
    }

    /// Poison the session when an exchange failed
    fn settle<T>(&mut self, result: Result<T, GitError>) -> Result<T, GitError> {
        if result.is_err() {
            self.poison();
        }
        result
    }
}

/// Session handed out by the repository
///
/// `Shared` borrows the repository's long-lived session and releases it on drop;
/// `Temporary` owns a throw-away session that is torn down on drop.
#[derive(Debug)]
pub enum BatchGuard {
    Shared(OwnedMappedMutexGuard<Option<Batch>, Batch>),
    Temporary(Box<Batch>),
}

impl BatchGuard {
    pub fn is_temporary(&self) -> bool {
        matches!(self, BatchGuard::Temporary(_))
    }
}

impl Deref for BatchGuard {
    type Target = Batch;

    fn deref(&self) -> &Self::Target {
        match self {
            BatchGuard::Shared(batch) => &**batch,
            BatchGuard::Temporary(batch) => &**batch,
        }
    }
}

impl DerefMut for BatchGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            BatchGuard::Shared(batch) => &mut **batch,
            BatchGuard::Temporary(batch) => &mut **batch,
        }
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if self.is_in_flight() && !self.is_poisoned() {
            tracing::debug!(kind = ?self.kind(), "batch session released mid-exchange");
            self.poison();
        }
    }
}

/// Check that `path` is a usable repository
pub async fn ensure_valid_repository(
    settings: &Settings,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<(), GitError> {
    if !path.is_dir() {
        return Err(GitError::RepoInvalid {
            path: path.to_path_buf(),
            reason: "no such directory".to_string(),
        });
    }

    GitCommand::new(settings, path, "rev-parse")
        .arg("--git-dir")
        .output(cancel)
        .await
        .map(|_| ())
        .map_err(|err| match err {
            GitError::Cancelled => GitError::Cancelled,
            err => GitError::RepoInvalid {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
        })
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = io::Result<T>>,
) -> Result<T, GitError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GitError::Cancelled),
        result = operation => result.map_err(|e| GitError::transport(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object_format::ObjectFormat;
    use pretty_assertions::assert_eq;

    #[test]
    fn header_is_parsed() {
        let id = ObjectFormat::Sha1.hash_blob(b"");
        let header = BatchHeader::parse(&format!("{id} blob 0"), "HEAD:file").unwrap();

        assert_eq!(header, BatchHeader::new(id, ObjectType::Blob, 0));
    }

    #[test]
    fn missing_and_ambiguous_are_not_exist() {
        for line in ["deadbeef missing", "HEAD:path with spaces missing", "abc ambiguous"] {
            let err = BatchHeader::parse(line, "requested").unwrap_err();
            assert!(err.is_not_exist(), "{line}");
            assert!(!err.is_transport(), "{line}");
        }
    }

    #[test]
    fn garbage_is_a_transport_fault() {
        let id = ObjectFormat::Sha1.hash_blob(b"");
        for line in [
            "garbage".to_string(),
            format!("{id} blob"),
            format!("{id} blob ten"),
            format!("{id} widget 10"),
            format!("{id} blob 10 extra"),
        ] {
            let err = BatchHeader::parse(&line, "requested").unwrap_err();
            assert!(err.is_transport(), "{line}");
        }
    }
}
