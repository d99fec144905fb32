use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::artifacts::path::{join_path, normalize_path, parent_path};
use crate::errors::GitError;

/// Largest symlink blob that is still read as a link target
pub const MAX_SYMLINK_SIZE: u64 = 20 * 4096;

/// Hops followed by [`Repository::entry_follow_links`] by default
pub const DEFAULT_FOLLOW_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFollowResult {
    /// Raw link text of the last symlink followed
    pub symlink_content: String,
    pub target_full_path: String,
    pub target_entry: TreeEntry,
}

impl Repository {
    /// Resolve the symlink `entry`, found at `full_path` in the tree of `commit`
    ///
    /// # Returns
    ///
    /// - `Unprocessable` if the entry is not a symlink, the link blob is too
    ///   large, or the target is absolute or outside the repository
    /// - `BrokenLink` (a not-exist error) if nothing exists at the target
    pub async fn entry_follow_link(
        &self,
        commit: &ObjectId,
        full_path: &str,
        entry: &TreeEntry,
    ) -> Result<EntryFollowResult, GitError> {
        if !entry.is_link() {
            return Err(GitError::unprocessable(full_path, "not a symlink"));
        }

        let blob = entry.blob(self);
        let size = blob.size().await?;
        if size > MAX_SYMLINK_SIZE {
            return Err(GitError::unprocessable(
                full_path,
                format!("symlink of {size} bytes is too large"),
            ));
        }

        let link = blob.get_blob_content(size).await?;
        if link.starts_with('/') {
            return Err(GitError::unprocessable(full_path, "absolute symlink"));
        }

        let target_full_path = normalize_path(&join_path(parent_path(full_path), &link))
            .filter(|path| !path.is_empty())
            .ok_or_else(|| {
                GitError::unprocessable(full_path, "symlink points outside the repository")
            })?;

        let tree = Tree::new(self, *commit);
        let target_entry = match tree.get_tree_entry_by_path(&target_full_path).await {
            Ok(target_entry) => target_entry,
            Err(err) if err.is_not_exist() => {
                tracing::debug!(full_path, %link, "broken symlink");
                return Err(GitError::BrokenLink {
                    path: full_path.to_string(),
                    link,
                });
            }
            Err(err) => return Err(err),
        };

        Ok(EntryFollowResult {
            symlink_content: link,
            target_full_path,
            target_entry,
        })
    }

    /// Follow a chain of symlinks until something other than a link is reached
    ///
    /// # Returns
    ///
    /// `Unprocessable` if the chain is still a link after `limit` hops
    pub async fn entry_follow_links(
        &self,
        commit: &ObjectId,
        full_path: &str,
        entry: &TreeEntry,
        limit: usize,
    ) -> Result<EntryFollowResult, GitError> {
        let mut result = self.entry_follow_link(commit, full_path, entry).await?;

        for _ in 1..limit {
            if !result.target_entry.is_link() {
                return Ok(result);
            }
            result = self
                .entry_follow_link(commit, &result.target_full_path, &result.target_entry)
                .await?;
        }

        if result.target_entry.is_link() {
            return Err(GitError::unprocessable(full_path, "too many levels of symlinks"));
        }
        Ok(result)
    }
}
