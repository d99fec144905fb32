//! Last-commit cache
//!
//! Answers "which commit last touched this path, as seen from that ref" from a
//! two-tier cache before falling back to a history walk:
//!
//! 1. an external key/value store ([`StringCache`]) maps
//!    `(repository, ref, path)` to a commit id
//! 2. an in-process map keeps the commits already decoded by this instance
//!
//! The store is strictly best effort. Timeouts, backend faults and stale ids
//! degrade to a miss with a log line and never fail a lookup.

use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::TreeEntry;
use crate::artifacts::path::join_path;
use crate::errors::{CacheError, GitError};
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Minimal string key/value store with per-entry expiry
#[async_trait]
pub trait StringCache: Send + Sync {
    async fn ping(&self) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn is_exist(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// In-process [`StringCache`] with lazy expiry
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StringCache for MemoryCache {
    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let deadline = Instant::now() + ttl;
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Store key for the last commit of `entry_path` as seen from `ref_name`
pub fn cache_key(repo_path: &str, ref_name: &str, entry_path: &str) -> String {
    let digest = Sha256::digest(format!("{repo_path}:{ref_name}:{entry_path}").as_bytes());
    format!("last_commit:{}", hex::encode(digest))
}

pub struct LastCommitCache<'r> {
    repository: &'r Repository,
    repo_path: String,
    ttl: Duration,
    store_timeout: Duration,
    store: Arc<dyn StringCache>,
    commits: Mutex<HashMap<ObjectId, Commit>>,
}

impl<'r> LastCommitCache<'r> {
    /// Create a cache for `repository`
    ///
    /// # Arguments
    ///
    /// * `commits_count` - Size of the history being browsed
    /// * `repository` - Repository the cached ids belong to
    /// * `store` - External store, `None` when no cache is configured
    ///
    /// # Returns
    ///
    /// `None` when there is no store, when the cache is disabled by a zero TTL,
    /// or when the history is too short for caching to pay off
    pub fn new(
        commits_count: u64,
        repository: &'r Repository,
        store: Option<Arc<dyn StringCache>>,
    ) -> Option<Self> {
        let store = store?;
        let settings = &repository.settings().last_commit;
        if settings.ttl.is_zero() || commits_count < settings.commits_count {
            return None;
        }

        Some(LastCommitCache {
            repository,
            repo_path: repository.path().to_string_lossy().into_owned(),
            ttl: settings.ttl,
            store_timeout: settings.store_timeout,
            store,
            commits: Mutex::new(HashMap::new()),
        })
    }

    /// Remember `commit_id` as the last commit of `entry_path` from `ref_name`
    pub async fn put(
        &self,
        ref_name: &str,
        entry_path: &str,
        commit_id: &ObjectId,
    ) -> Result<(), CacheError> {
        tracing::debug!(ref_name, entry_path, %commit_id, "last commit cache save");

        let key = cache_key(&self.repo_path, ref_name, entry_path);
        let value = commit_id.to_hex();
        self.time_boxed(self.store.put(&key, &value, self.ttl)).await
    }

    /// Cached last commit of `entry_path` from `ref_name`
    ///
    /// # Returns
    ///
    /// `None` on a miss, including when the store failed or held a stale id
    pub async fn get(&self, ref_name: &str, entry_path: &str) -> Result<Option<Commit>, GitError> {
        let key = cache_key(&self.repo_path, ref_name, entry_path);
        let value = match self.time_boxed(self.store.get(&key)).await {
            Ok(Some(value)) if !value.is_empty() => value,
            Ok(_) => return Ok(None),
            Err(err) => {
                tracing::warn!(%err, ref_name, entry_path, "last commit cache lookup failed");
                return Ok(None);
            }
        };

        let Ok(commit_id) = ObjectId::try_parse(&value) else {
            tracing::warn!(%value, "last commit cache holds an invalid id");
            return Ok(None);
        };
        tracing::debug!(ref_name, entry_path, %commit_id, "last commit cache hit level 1");

        if let Some(commit) = self.commits.lock().get(&commit_id) {
            tracing::debug!(ref_name, entry_path, %commit_id, "last commit cache hit level 2");
            return Ok(Some(commit.clone()));
        }

        match self
            .repository
            .database()
            .parse_object_as_commit(&commit_id.to_hex())
            .await
        {
            Ok(commit) => {
                self.commits.lock().insert(commit_id, commit.clone());
                Ok(Some(commit))
            }
            Err(err) if err.is_not_exist() => {
                tracing::debug!(%commit_id, "last commit cache holds a stale id");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Last commit that touched `entry_path`, as seen from `commit_id`
    ///
    /// Falls back to a history walk on a miss and stores its answer.
    pub async fn get_commit_by_path(
        &self,
        commit_id: &ObjectId,
        entry_path: &str,
    ) -> Result<Commit, GitError> {
        let ref_name = commit_id.to_hex();
        if let Some(commit) = self.get(&ref_name, entry_path).await? {
            return Ok(commit);
        }

        let last_commit = self.repository.get_commit_by_path(commit_id, entry_path).await?;
        if let Err(err) = self.put(&ref_name, entry_path, last_commit.id()).await {
            tracing::error!(
                %err,
                last_commit = %last_commit.id(),
                entry_path,
                %commit_id,
                repo = %self.repo_path,
                "unable to cache the last commit"
            );
        }
        self.commits
            .lock()
            .insert(*last_commit.id(), last_commit.clone());

        Ok(last_commit)
    }

    /// Last commit of every entry of the directory `tree_path`
    ///
    /// # Returns
    ///
    /// Pairs of entry name and commit, in the order of `entries`
    pub async fn get_commits_for_entries(
        &self,
        commit_id: &ObjectId,
        tree_path: &str,
        entries: &[TreeEntry],
    ) -> Result<Vec<(String, Commit)>, GitError> {
        let mut commits = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry_path = join_path(tree_path, entry.name());
            let commit = self.get_commit_by_path(commit_id, &entry_path).await?;
            commits.push((entry.name().to_string(), commit));
        }

        Ok(commits)
    }

    async fn time_boxed<T>(
        &self,
        operation: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.store_timeout, operation)
            .await
            .map_err(|_| CacheError::Timeout(self.store_timeout))?
    }
}

impl std::fmt::Debug for LastCommitCache<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastCommitCache")
            .field("repo_path", &self.repo_path)
            .field("ttl", &self.ttl)
            .field("decoded", &self.commits.lock().len())
            .finish_non_exhaustive()
    }
}
