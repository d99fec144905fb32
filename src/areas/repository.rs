use crate::areas::batch::{Batch, BatchGuard, BatchKind};
use crate::areas::command::GitCommand;
use crate::areas::database::Database;
use crate::artifacts::objects::object_format::ObjectFormat;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::config::Settings;
use crate::errors::GitError;
use parking_lot::{Mutex as SyncMutex, MutexGuard as SyncMutexGuard};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

type BatchSlot = Arc<Mutex<Option<Batch>>>;

/// Handle on one on-disk repository
///
/// Owns one shared session per batch mode, spawned on first use. Concurrent
/// callers that find a shared session busy get a temporary session of their
/// own instead of waiting. The handle is `Send + Sync` and meant to be shared
/// behind an `Arc` for the duration of a request.
pub struct Repository {
    path: Box<Path>,
    settings: Arc<Settings>,
    cancel: CancellationToken,
    writer: SyncMutex<Box<dyn Write + Send>>,
    batch: BatchSlot,
    batch_check: BatchSlot,
    object_format: OnceCell<ObjectFormat>,
    tag_cache: SyncMutex<HashMap<ObjectId, Tag>>,
    temporary_batches: AtomicUsize,
}

impl Repository {
    /// Open the repository at `path`
    ///
    /// Only checks that the path is a directory; sessions validate the
    /// repository itself when they are first spawned.
    pub fn open(path: impl AsRef<Path>, settings: Settings) -> Result<Self, GitError> {
        let path = path.as_ref();
        let canonical = path.canonicalize().map_err(|e| GitError::RepoInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !canonical.is_dir() {
            return Err(GitError::RepoInvalid {
                path: canonical,
                reason: "not a directory".to_string(),
            });
        }

        Ok(Repository {
            path: canonical.into_boxed_path(),
            settings: Arc::new(settings),
            cancel: CancellationToken::new(),
            writer: SyncMutex::new(Box::new(std::io::sink())),
            batch: Arc::new(Mutex::new(None)),
            batch_check: Arc::new(Mutex::new(None)),
            object_format: OnceCell::new(),
            tag_cache: SyncMutex::new(HashMap::new()),
            temporary_batches: AtomicUsize::new(0),
        })
    }

    /// Route command output to `writer`
    pub fn with_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.writer = SyncMutex::new(writer);
        self
    }

    /// Tie every subprocess of this handle to `cancel`
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn writer(&self) -> SyncMutexGuard<'_, Box<dyn Write + Send>> {
        self.writer.lock()
    }

    pub fn database(&self) -> Database<'_> {
        Database::new(self)
    }

    /// Start a one-shot git invocation inside this repository
    pub fn git(&self, subcommand: &str) -> GitCommand {
        GitCommand::new(&self.settings, &self.path, subcommand)
    }

    /// Tree handle for a tree-ish revision
    ///
    /// Commits and annotated tags are accepted: their tree is resolved when
    /// the entries are first listed.
    pub async fn tree(&self, revision: &str) -> Result<Tree<'_>, GitError> {
        let id = self.database().resolve_revision(revision).await?;
        Ok(Tree::new(self, id))
    }

    /// Object format of the repository, probed once
    pub async fn object_format(&self) -> Result<ObjectFormat, GitError> {
        self.object_format
            .get_or_try_init(|| async {
                let name = self
                    .git("rev-parse")
                    .arg("--show-object-format")
                    .output_string(&self.cancel)
                    .await?;

                // git before 2.25 echoes unknown options back
                if name == "--show-object-format" || name.is_empty() {
                    return Ok(ObjectFormat::Sha1);
                }
                ObjectFormat::from_name(&name)
            })
            .await
            .copied()
    }

    /// Borrow a content session (`cat-file --batch`)
    pub async fn cat_file_batch(&self) -> Result<BatchGuard, GitError> {
        self.acquire(&self.batch, BatchKind::Content).await
    }

    /// Borrow a check session (`cat-file --batch-check`)
    pub async fn cat_file_batch_check(&self) -> Result<BatchGuard, GitError> {
        self.acquire(&self.batch_check, BatchKind::Check).await
    }

    /// Number of temporary sessions spawned because the shared one was busy
    pub fn temporary_batches(&self) -> usize {
        self.temporary_batches.load(Ordering::Relaxed)
    }

    /// Terminate both shared sessions and drop cached values
    ///
    /// Waits for in-flight borrowers to release their session. Calling it again
    /// is a no-op; later requests transparently spawn fresh sessions.
    pub async fn close(&self) -> Result<(), GitError> {
        for slot in [&self.batch, &self.batch_check] {
            let batch = slot.lock().await.take();
            if let Some(batch) = batch {
                batch.close().await?;
            }
        }
        self.tag_cache.lock().clear();

        Ok(())
    }

    pub(crate) fn cached_tag(&self, id: &ObjectId) -> Option<Tag> {
        self.tag_cache.lock().get(id).cloned()
    }

    pub(crate) fn cache_tag(&self, tag: Tag) {
        self.tag_cache.lock().insert(*tag.id(), tag);
    }

    async fn acquire(&self, slot: &BatchSlot, kind: BatchKind) -> Result<BatchGuard, GitError> {
        if self.cancel.is_cancelled() {
            return Err(GitError::Cancelled);
        }

        match slot.clone().try_lock_owned() {
            Ok(mut guard) => {
                if !matches!(&*guard, Some(batch) if !batch.is_poisoned()) {
                    if guard.take().is_some() {
                        tracing::debug!(?kind, "replacing poisoned batch session");
                    }
                    *guard = Some(self.spawn_batch(kind).await?);
                }

                OwnedMutexGuard::try_map(guard, Option::as_mut)
                    .map(BatchGuard::Shared)
                    .map_err(|_| GitError::transport("shared batch session vanished"))
            }
            Err(_) => {
                let spawned = self.temporary_batches.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(?kind, spawned, "shared batch session busy, spawning a temporary one");

                let batch = self.spawn_batch(kind).await?;
                Ok(BatchGuard::Temporary(Box::new(batch)))
            }
        }
    }

    async fn spawn_batch(&self, kind: BatchKind) -> Result<Batch, GitError> {
        Batch::spawn(&self.settings, &self.path, kind, self.cancel.child_token()).await
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .field("object_format", &self.object_format.get())
            .field("temporary_batches", &self.temporary_batches())
            .finish_non_exhaustive()
    }
}
