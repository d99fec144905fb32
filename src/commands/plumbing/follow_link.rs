use crate::areas::repository::Repository;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::path::clean_path;
use crate::artifacts::path::symlink::DEFAULT_FOLLOW_LIMIT;
use std::io::Write;

impl Repository {
    /// Print where the symlink at `path` ends up, following chained links
    pub async fn follow_link(&self, revision: &str, path: &str) -> anyhow::Result<()> {
        let commit = self.database().parse_object_as_commit(revision).await?;
        let path = clean_path(path);

        let entry = Tree::new(self, *commit.id())
            .get_tree_entry_by_path(&path)
            .await?;
        let result = self
            .entry_follow_links(commit.id(), &path, &entry, DEFAULT_FOLLOW_LIMIT)
            .await?;

        writeln!(
            self.writer(),
            "{} -> {}\t{} {} {}",
            path,
            result.target_full_path,
            result.target_entry.mode(),
            result.target_entry.object_type(),
            result.target_entry.id()
        )?;

        Ok(())
    }
}
