//! Git tree object
//!
//! Trees represent directory snapshots in Git. They contain entries for files (blobs),
//! subdirectories (other trees), symlinks and submodules, along with their names and modes.
//!
//! ## Format
//!
//! As returned by `git cat-file --batch`: `<entries>`
//! Each entry: `<mode> <name>\0<raw-object-id>`
//!
//! As returned by `git ls-tree -z`: `<mode> <type> <hex-id>\t<path>\0`
//!
//! A [`Tree`] is a handle: its entries are parsed once, on first access, and
//! kept for the lifetime of the handle. The id a tree is opened with may also
//! be a commit or an annotated tag; the listing then resolves through to the
//! tree they point at.

use crate::areas::repository::Repository;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_format::ObjectFormat;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::GitError;
use std::io::{BufRead, Cursor};
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;

/// One entry of a tree listing
///
/// `name` is a single path segment, except for entries produced by a
/// recursive listing where it holds the full path from the listed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    name: String,
    mode: EntryMode,
    id: ObjectId,
    size: OnceLock<u64>,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, mode: EntryMode, id: ObjectId) -> Self {
        TreeEntry {
            name: name.into(),
            mode,
            id,
            size: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn object_type(&self) -> ObjectType {
        self.mode.object_type()
    }

    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub fn is_link(&self) -> bool {
        self.mode.is_link()
    }

    pub fn is_submodule(&self) -> bool {
        self.mode.is_submodule()
    }

    pub fn is_regular(&self) -> bool {
        self.mode.is_regular()
    }

    pub fn is_executable(&self) -> bool {
        self.mode.is_executable()
    }

    /// Size of the blob behind the entry, memoized after the first lookup
    ///
    /// Directories and submodules have no content of their own and report zero.
    pub async fn size(&self, repository: &Repository) -> Result<u64, GitError> {
        if let Some(size) = self.size.get() {
            return Ok(*size);
        }
        if self.is_dir() || self.is_submodule() {
            return Ok(0);
        }

        let size = repository.database().object_size(&self.id).await?;
        Ok(*self.size.get_or_init(|| size))
    }

    /// Open the blob this entry points at
    pub fn blob<'r>(&self, repository: &'r Repository) -> Blob<'r> {
        match self.size.get() {
            Some(size) => Blob::with_size(repository, self.id, self.name.clone(), *size),
            None => Blob::new(repository, self.id, self.name.clone()),
        }
    }

    /// Decode the binary content of a tree object
    ///
    /// # Arguments
    ///
    /// * `format` - Object format of the repository, fixes the raw id width
    /// * `tree_id` - Id of the tree being decoded, for diagnostics
    /// * `data` - Tree content, without the batch header
    pub fn parse_entries(
        format: ObjectFormat,
        tree_id: &ObjectId,
        data: &[u8],
    ) -> Result<Vec<TreeEntry>, GitError> {
        let malformed = |reason: &str| GitError::malformed(ObjectType::Tree, tree_id, reason);

        let mut entries = Vec::new();
        let mut reader = Cursor::new(data);

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.pop() != Some(b' ') {
                return Err(malformed("unexpected end of content in mode"));
            }

            let mode = std::str::from_utf8(&mode_bytes)
                .map_err(|_| malformed("non-ascii entry mode"))?;
            let mode = EntryMode::try_from(mode).map_err(|e| malformed(&e.to_string()))?;

            // Read "name\0"
            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') {
                return Err(malformed("unexpected end of content in name"));
            }
            let name = String::from_utf8_lossy(&name_bytes).into_owned();

            let id = ObjectId::read_raw_from(format, &mut reader)
                .map_err(|_| malformed("unexpected end of content in object id"))?;

            entries.push(TreeEntry::new(name, mode, id));
        }

        Ok(entries)
    }

    /// Decode `git ls-tree -z` output
    pub fn parse_ls_tree(data: &[u8]) -> Result<Vec<TreeEntry>, GitError> {
        let invalid = |line: &str, reason: &str| {
            GitError::transport(format!("unparseable ls-tree line {line:?}: {reason}"))
        };

        data.split(|b| *b == b'\0')
            .filter(|record| !record.is_empty())
            .map(|record| {
                let record = String::from_utf8_lossy(record).into_owned();
                let record = record.as_str();
                let (info, path) = record
                    .split_once('\t')
                    .ok_or_else(|| invalid(record, "missing tab"))?;

                let mut fields = info.split(' ');
                let (Some(mode), Some(_), Some(id)) = (fields.next(), fields.next(), fields.next())
                else {
                    return Err(invalid(record, "expected mode, type and id"));
                };

                let mode = EntryMode::try_from(mode).map_err(|e| invalid(record, &e.to_string()))?;
                let id = ObjectId::try_parse(id).map_err(|e| invalid(record, &e.to_string()))?;
                Ok(TreeEntry::new(path, mode, id))
            })
            .collect()
    }
}

/// Handle on a tree object
///
/// `parent` links a sub-tree back to the tree it was reached from, which is
/// enough to rebuild its path without storing full paths anywhere.
#[derive(Debug, Clone)]
pub struct Tree<'r> {
    repository: &'r Repository,
    /// Id the tree was opened with, possibly a commit or tag
    id: ObjectId,
    resolved_id: OnceLock<ObjectId>,
    name: String,
    parent: Option<Arc<Tree<'r>>>,
    entries: OnceCell<Vec<TreeEntry>>,
}

impl<'r> Tree<'r> {
    pub fn new(repository: &'r Repository, id: ObjectId) -> Self {
        Tree {
            repository,
            id,
            resolved_id: OnceLock::new(),
            name: String::new(),
            parent: None,
            entries: OnceCell::new(),
        }
    }

    /// Create a handle reached through `parent` under the entry `name`
    pub fn with_parent(
        repository: &'r Repository,
        id: ObjectId,
        name: impl Into<String>,
        parent: Arc<Tree<'r>>,
    ) -> Self {
        let tree = Tree::new(repository, id);
        let _ = tree.resolved_id.set(id);

        Tree {
            name: name.into(),
            parent: Some(parent),
            ..tree
        }
    }

    pub fn repository(&self) -> &'r Repository {
        self.repository
    }

    /// Id the handle was opened with
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Id of the actual tree object, known once the entries were listed
    pub fn resolved_id(&self) -> Option<&ObjectId> {
        self.resolved_id.get()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Tree<'r>>> {
        self.parent.as_ref()
    }

    /// Path of this tree relative to the root it was reached from
    pub fn path(&self) -> String {
        let mut segments = vec![self.name.as_str()];
        let mut current = self.parent.as_deref();
        while let Some(tree) = current {
            segments.push(tree.name.as_str());
            current = tree.parent.as_deref();
        }

        segments
            .into_iter()
            .rev()
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Entries of the tree, parsed once and kept for the lifetime of the handle
    pub async fn list_entries(&self) -> Result<&[TreeEntry], GitError> {
        let entries = self
            .entries
            .get_or_try_init(|| async {
                let (resolved_id, entries) =
                    self.repository.database().read_tree_entries(&self.id).await?;
                let _ = self.resolved_id.set(resolved_id);
                Ok::<_, GitError>(entries)
            })
            .await?;

        Ok(entries.as_slice())
    }

    /// All entries below this tree, with full paths as names
    ///
    /// Runs `git ls-tree -t -r`, so directories are listed along with their content.
    pub async fn list_entries_recursive(&self) -> Result<Vec<TreeEntry>, GitError> {
        self.repository
            .database()
            .read_tree_entries_recursive(&self.id)
            .await
    }
}

impl Object for Tree<'_> {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }
}
