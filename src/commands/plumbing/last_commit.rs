use crate::areas::last_commit_cache::{LastCommitCache, StringCache};
use crate::areas::repository::Repository;
use crate::artifacts::path::clean_path;
use std::io::Write;
use std::sync::Arc;

impl Repository {
    /// Print the last commit that touched `path`, as seen from `revision`
    ///
    /// Goes through a [`LastCommitCache`] backed by `store` when the history is
    /// long enough for one, straight to the history walk otherwise.
    pub async fn last_commit(
        &self,
        revision: &str,
        path: &str,
        store: Option<Arc<dyn StringCache>>,
    ) -> anyhow::Result<()> {
        let commit = self.database().parse_object_as_commit(revision).await?;
        let path = clean_path(path);

        let commits_count = self.commits_count(&commit.id().to_hex()).await?;
        let last_commit = match LastCommitCache::new(commits_count, self, store) {
            Some(cache) => cache.get_commit_by_path(commit.id(), &path).await?,
            None => self.get_commit_by_path(commit.id(), &path).await?,
        };

        writeln!(
            self.writer(),
            "{}\t{}\t{}\t{}",
            last_commit.id(),
            last_commit.author().display_name(),
            last_commit.committer().readable_timestamp(),
            last_commit.summary()
        )?;

        Ok(())
    }
}
