use crate::areas::repository::Repository;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::path::{clean_path, join_path};

impl Repository {
    /// List a tree, optionally below `path` and recursively
    ///
    /// Like `git ls-tree`, a recursive listing only shows blobs and submodules,
    /// and a path naming a file lists that single entry.
    pub async fn ls_tree(
        &self,
        tree_ish: &str,
        path: Option<&str>,
        recursive: bool,
    ) -> anyhow::Result<()> {
        let root = self.tree(tree_ish).await?;
        let prefix = clean_path(path.unwrap_or_default());

        let entry = root.get_tree_entry_by_path(&prefix).await?;
        if !entry.is_dir() {
            return self.write_tree_entry(&entry, &prefix);
        }

        let tree = if prefix.is_empty() {
            root
        } else {
            Tree::new(self, *entry.id())
        };

        if recursive {
            for entry in tree.list_entries_recursive().await? {
                if !entry.is_dir() {
                    self.write_tree_entry(&entry, &join_path(&prefix, entry.name()))?;
                }
            }
        } else {
            for entry in tree.list_entries().await? {
                self.write_tree_entry(entry, &join_path(&prefix, entry.name()))?;
            }
        }

        Ok(())
    }
}
