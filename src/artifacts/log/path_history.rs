use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::path::clean_path;
use crate::errors::GitError;

impl Repository {
    /// Id of the most recent commit reachable from `commit` that touched `path`
    ///
    /// An empty path stands for the whole tree, that is `commit` itself unless
    /// it is an empty merge.
    pub async fn last_commit_id_for_path(
        &self,
        commit: &ObjectId,
        path: &str,
    ) -> Result<ObjectId, GitError> {
        let path = clean_path(path);
        let mut command = self
            .git("log")
            .arg("-1")
            .arg("--format=%H")
            .dynamic_arg(&commit.to_hex())?;
        if !path.is_empty() {
            command = command.paths([path.as_str()]);
        }

        let output = command.output_string(self.cancel_token()).await?;
        if output.is_empty() {
            return Err(GitError::not_exist_at(commit.to_hex(), path));
        }

        ObjectId::try_parse(&output)
            .map_err(|e| GitError::transport(format!("unexpected git log output: {e}")))
    }

    /// Decode the most recent commit reachable from `commit` that touched `path`
    pub async fn get_commit_by_path(
        &self,
        commit: &ObjectId,
        path: &str,
    ) -> Result<Commit, GitError> {
        let id = self.last_commit_id_for_path(commit, path).await?;
        self.database().parse_object_as_commit(&id.to_hex()).await
    }

    /// Number of commits reachable from `revision`
    pub async fn commits_count(&self, revision: &str) -> Result<u64, GitError> {
        let output = self
            .git("rev-list")
            .arg("--count")
            .dynamic_arg(revision)?
            .output_string(self.cancel_token())
            .await?;

        output
            .parse::<u64>()
            .map_err(|e| GitError::transport(format!("unexpected rev-list output {output:?}: {e}")))
    }
}
