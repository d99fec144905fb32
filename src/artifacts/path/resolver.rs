use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::artifacts::path::clean_path;
use crate::errors::GitError;
use std::sync::Arc;

impl<'r> Tree<'r> {
    /// Entry named `name` directly inside this tree
    pub async fn find_entry(&self, name: &str) -> Result<&TreeEntry, GitError> {
        self.list_entries()
            .await?
            .iter()
            .find(|entry| entry.name() == name)
            .ok_or_else(|| GitError::not_exist_at(self.id().to_hex(), name))
    }

    /// Entry at `path` below this tree
    ///
    /// Every intermediate segment has to be a directory: a file, symlink or
    /// submodule in the middle of the path means the path does not exist.
    /// An empty path yields a directory entry for the tree itself.
    pub async fn get_tree_entry_by_path(&self, path: &str) -> Result<TreeEntry, GitError> {
        let path = clean_path(path);
        let segments = path.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>();

        let Some((last, intermediate)) = segments.split_last() else {
            self.list_entries().await?;
            let id = self.resolved_id().copied().unwrap_or(*self.id());
            return Ok(TreeEntry::new("", EntryMode::Directory, id));
        };

        let not_exist = || GitError::not_exist_at(self.id().to_hex(), path.as_str());
        let or_not_exist = |err: GitError| if err.is_not_exist() { not_exist() } else { err };

        let mut current: Option<Tree<'r>> = None;
        for segment in intermediate {
            let tree = current.as_ref().unwrap_or(self);
            let entry = tree.find_entry(segment).await.map_err(or_not_exist)?;
            if !entry.is_dir() {
                return Err(not_exist());
            }

            let id = *entry.id();
            current = Some(Tree::new(self.repository(), id));
        }

        let tree = current.as_ref().unwrap_or(self);
        tree.find_entry(last)
            .await
            .cloned()
            .map_err(or_not_exist)
    }

    /// Handle on the directory at `path` below this tree
    ///
    /// The returned tree links back through every directory on the way, so
    /// its `path()` is `path` in cleaned form.
    pub async fn sub_tree(self: &Arc<Self>, path: &str) -> Result<Arc<Tree<'r>>, GitError> {
        let path = clean_path(path);
        let mut current = Arc::clone(self);

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let entry = current.find_entry(segment).await.map_err(|err| {
                if err.is_not_exist() {
                    GitError::not_exist_at(self.id().to_hex(), path.as_str())
                } else {
                    err
                }
            })?;
            if !entry.is_dir() {
                return Err(GitError::not_exist_at(self.id().to_hex(), path.as_str()));
            }

            let id = *entry.id();
            let child = Tree::with_parent(self.repository(), id, segment, Arc::clone(&current));
            current = Arc::new(child);
        }

        Ok(current)
    }
}
