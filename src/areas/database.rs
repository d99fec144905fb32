use crate::areas::batch::{Batch, BatchHeader};
use crate::areas::repository::Repository;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::errors::GitError;

/// Shorthands accepted wherever a revision is expected
pub const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};

/// Object decoder over a repository's batch sessions
///
/// Cheap to create: it only borrows the repository. Types and sizes are looked
/// up through the check session; content goes through the content session,
/// borrowed once per operation so that nested lookups (a tag pointing at a
/// commit, a commit pointing at its tree) never re-acquire.
#[derive(Debug, Clone, Copy)]
pub struct Database<'r> {
    repository: &'r Repository,
}

impl<'r> Database<'r> {
    pub fn new(repository: &'r Repository) -> Self {
        Database { repository }
    }

    /// Type, size and full id of `revision`, without reading its content
    pub async fn read_header(&self, revision: &str) -> Result<BatchHeader, GitError> {
        let revision = *REF_ALIASES.get(revision).unwrap_or(&revision);

        let mut batch = self.repository.cat_file_batch_check().await?;
        batch.request(revision).await?;
        batch.read_header(revision).await
    }

    /// Header and raw content of `revision`, read in one go
    pub async fn read_object_content(
        &self,
        revision: &str,
    ) -> Result<(BatchHeader, Vec<u8>), GitError> {
        let revision = *REF_ALIASES.get(revision).unwrap_or(&revision);

        let mut batch = self.repository.cat_file_batch().await?;
        batch.request(revision).await?;
        let header = batch.read_header(revision).await?;
        let content = batch.read_content(header.size).await?;

        Ok((header, content))
    }

    pub async fn get_object_type(&self, revision: &str) -> Result<ObjectType, GitError> {
        Ok(self.read_header(revision).await?.object_type)
    }

    pub async fn object_size(&self, id: &ObjectId) -> Result<u64, GitError> {
        Ok(self.read_header(&id.to_hex()).await?.size)
    }

    /// Full id of any revision git understands (`HEAD`, `main~2`, `v1.0:src`, ...)
    ///
    /// Full hex ids are returned as is, without a round-trip to git.
    pub async fn resolve_revision(&self, revision: &str) -> Result<ObjectId, GitError> {
        if let Ok(id) = ObjectId::try_parse(revision) {
            return Ok(id);
        }

        Ok(self.read_header(revision).await?.id)
    }

    /// Decode whatever `revision` names
    ///
    /// Commits and tags are read and decoded right away, trees and blobs come
    /// back as handles with nothing but their size fetched.
    pub async fn parse_object(&self, revision: &str) -> Result<ObjectBox<'r>, GitError> {
        let header = self.read_header(revision).await?;

        match header.object_type {
            ObjectType::Blob => Ok(ObjectBox::Blob(Box::new(Blob::with_size(
                self.repository,
                header.id,
                "",
                header.size,
            )))),
            ObjectType::Tree => Ok(ObjectBox::Tree(Box::new(Tree::new(
                self.repository,
                header.id,
            )))),
            ObjectType::Commit => {
                let commit = self.parse_object_as_commit(&header.id.to_hex()).await?;
                Ok(ObjectBox::Commit(Box::new(commit)))
            }
            ObjectType::Tag => {
                let tag = self.parse_object_as_tag(&header.id.to_hex()).await?;
                Ok(ObjectBox::Tag(Box::new(tag)))
            }
        }
    }

    /// Decode the commit `revision` names, peeling annotated tags
    ///
    /// Anything that does not end in a commit is reported as not existing.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn parse_object_as_commit(&self, revision: &str) -> Result<Commit, GitError> {
        let revision = *REF_ALIASES.get(revision).unwrap_or(&revision);

        let mut batch = self.repository.cat_file_batch().await?;
        self.commit_from_batch(&mut batch, revision).await
    }

    /// Decode the annotated tag `revision` names
    ///
    /// Decoded tags are kept by the repository handle until it is closed.
    pub async fn parse_object_as_tag(&self, revision: &str) -> Result<Tag, GitError> {
        if let Some(tag) = ObjectId::try_parse(revision)
            .ok()
            .and_then(|id| self.repository.cached_tag(&id))
        {
            return Ok(tag);
        }

        let mut batch = self.repository.cat_file_batch().await?;
        batch.request(revision).await?;
        let header = batch.read_header(revision).await?;
        if header.object_type != ObjectType::Tag {
            batch.discard(header.size).await?;
            return Err(GitError::unprocessable(
                revision,
                format!("expected a tag, found a {}", header.object_type),
            ));
        }

        let data = batch.read_content(header.size).await?;
        let tag = Tag::from_bytes(header.id, &data)?;
        self.repository.cache_tag(tag.clone());

        Ok(tag)
    }

    /// Entries of the tree behind `id`
    ///
    /// `id` may name a tree, a commit (its tree is listed) or an annotated tag
    /// (its target is followed). Everything happens on one borrowed session.
    ///
    /// # Returns
    ///
    /// The id of the tree actually listed, along with its entries
    #[tracing::instrument(level = "debug", skip(self), fields(id = %id))]
    pub async fn read_tree_entries(
        &self,
        id: &ObjectId,
    ) -> Result<(ObjectId, Vec<TreeEntry>), GitError> {
        let mut batch = self.repository.cat_file_batch().await?;
        let mut requested = id.to_hex();

        loop {
            batch.request(&requested).await?;
            let header = batch.read_header(&requested).await?;

            match header.object_type {
                ObjectType::Tree => {
                    let data = batch.read_content(header.size).await?;
                    let entries = TreeEntry::parse_entries(header.id.format(), &header.id, &data)?;
                    return Ok((header.id, entries));
                }
                ObjectType::Commit => {
                    requested = batch.read_tree_id(header.size).await?.to_hex();
                }
                ObjectType::Tag => {
                    let data = batch.read_content(header.size).await?;
                    requested = Tag::from_bytes(header.id, &data)?.target().to_hex();
                }
                ObjectType::Blob => {
                    batch.discard(header.size).await?;
                    return Err(GitError::not_exist(id.to_hex()));
                }
            }
        }
    }

    /// Every entry below the tree-ish `id`, directories included, with full paths
    pub async fn read_tree_entries_recursive(
        &self,
        id: &ObjectId,
    ) -> Result<Vec<TreeEntry>, GitError> {
        let output = self
            .repository
            .git("ls-tree")
            .arg("-t")
            .arg("-r")
            .arg("-z")
            .dynamic_arg(&id.to_hex())?
            .output(self.repository.cancel_token())
            .await?;

        TreeEntry::parse_ls_tree(&output)
    }

    async fn commit_from_batch(&self, batch: &mut Batch, requested: &str) -> Result<Commit, GitError> {
        batch.request(requested).await?;
        let header = batch.read_header(requested).await?;

        match header.object_type {
            ObjectType::Commit => {
                let data = batch.read_content(header.size).await?;
                Commit::from_bytes(header.id, &data)
            }
            ObjectType::Tag => {
                let data = batch.read_content(header.size).await?;
                let tag = Tag::from_bytes(header.id, &data)?;
                let target = tag.target().to_hex();
                self.repository.cache_tag(tag);

                Box::pin(self.commit_from_batch(batch, &target)).await
            }
            object_type => {
                tracing::debug!(requested, %object_type, "revision does not name a commit");
                batch.discard(header.size).await?;
                Err(GitError::not_exist(requested))
            }
        }
    }
}
