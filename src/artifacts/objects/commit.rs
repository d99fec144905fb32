//! Git commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s) (for history, first parent is the primary lineage)
//! - Author and committer information
//! - An optional detached signature (`gpgsig` / `gpgsig-sha256`)
//! - Commit message
//!
//! ## Format
//!
//! As returned by `git cat-file --batch`:
//! ```text
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//! gpgsig -----BEGIN PGP SIGNATURE-----
//!  <continuation lines, each prefixed by a space>
//!  -----END PGP SIGNATURE-----
//!
//! <commit message>
//! ```
//!
//! The signed payload is the object with the signature header removed.

use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::signature::{CommitSignature, Signature};
use crate::errors::GitError;

/// Git commit object
///
/// Every field is derived once from the raw object bytes; a commit is never
/// mutated after decoding.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    id: ObjectId,
    /// Tree object ID representing the directory snapshot
    tree_id: ObjectId,
    /// Parent commit IDs (empty for root commits, several for merges)
    parents: Vec<ObjectId>,
    author: Signature,
    committer: Signature,
    /// Value of the `encoding` header, if any
    encoding: Option<String>,
    message: String,
    signature: Option<CommitSignature>,
}

impl Commit {
    /// Decode a commit from its raw content
    ///
    /// # Arguments
    ///
    /// * `id` - Id the content was fetched under
    /// * `data` - Object content, without the batch header
    pub fn from_bytes(id: ObjectId, data: &[u8]) -> Result<Self, GitError> {
        let content = String::from_utf8_lossy(data);
        let (headers, message) = match content.find("\n\n") {
            Some(end) => (&content[..end + 1], &content[end + 2..]),
            None => (&content[..], ""),
        };

        let mut tree_id = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        let mut encoding = None;

        let mut payload = String::with_capacity(content.len());
        let mut signature = String::new();
        let mut in_signature = false;

        for line in headers.split_inclusive('\n') {
            if in_signature {
                if let Some(continuation) = line.strip_prefix(' ') {
                    signature.push_str(continuation);
                    continue;
                }
                in_signature = false;
            }

            let (key, value) = line.split_once(' ').unwrap_or((line.trim_end(), ""));
            let value = value.trim_end_matches('\n');

            match key {
                "gpgsig" | "gpgsig-sha256" => {
                    in_signature = true;
                    signature.push_str(value);
                    signature.push('\n');
                    continue;
                }
                "tree" => {
                    tree_id = Some(
                        ObjectId::try_parse(value)
                            .map_err(|e| GitError::malformed(ObjectType::Commit, id, e.to_string()))?,
                    );
                }
                "parent" => {
                    parents.push(
                        ObjectId::try_parse(value)
                            .map_err(|e| GitError::malformed(ObjectType::Commit, id, e.to_string()))?,
                    );
                }
                "author" => author = Some(Signature::from_commit_line(value)),
                "committer" => committer = Some(Signature::from_commit_line(value)),
                "encoding" => encoding = Some(value.to_string()),
                _ => {}
            }

            payload.push_str(line);
        }

        let tree_id = tree_id
            .ok_or_else(|| GitError::malformed(ObjectType::Commit, id, "missing tree header"))?;
        let author = author.unwrap_or_else(|| Signature::from_commit_line(""));
        let committer = committer.unwrap_or_else(|| author.clone());

        let signature = if signature.is_empty() {
            None
        } else {
            payload.push('\n');
            payload.push_str(message);
            Some(CommitSignature::new(signature, payload))
        };

        Ok(Commit {
            id,
            tree_id,
            parents,
            author,
            committer,
            encoding,
            message: message.to_string(),
            signature,
        })
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Get the tree object ID
    pub fn tree_id(&self) -> &ObjectId {
        &self.tree_id
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    /// Get the n-th parent, zero being the first parent
    pub fn parent(&self, n: usize) -> Option<&ObjectId> {
        self.parents.get(n)
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    pub fn author(&self) -> &Signature {
        &self.author
    }

    pub fn committer(&self) -> &Signature {
        &self.committer
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Get the full commit message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the first line of the commit message
    ///
    /// Useful for short-form display (e.g., `git log --oneline`)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    pub fn signature(&self) -> Option<&CommitSignature> {
        self.signature.as_ref()
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.committer.when()
    }
}

impl Object for Commit {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }
}
