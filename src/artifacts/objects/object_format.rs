//! Hash algorithm descriptors
//!
//! A repository is pinned to exactly one object format for its whole lifetime.
//! Git currently ships two of them:
//!
//! - `sha1`: 20-byte ids, 40 hex characters (the historical default)
//! - `sha256`: 32-byte ids, 64 hex characters
//!
//! Hashes are computed exactly like git does (`<type> <size>\0<content>`), so a
//! locally computed id always matches the id of an object already stored by git.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::GitError;
use sha1::{Digest, Sha1};
use sha2::Sha256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ObjectFormat {
    #[default]
    Sha1,
    Sha256,
}

impl ObjectFormat {
    /// Byte width of an id in this format
    pub const fn raw_len(&self) -> usize {
        match self {
            ObjectFormat::Sha1 => 20,
            ObjectFormat::Sha256 => 32,
        }
    }

    /// Full hex length of an id in this format
    pub const fn hex_len(&self) -> usize {
        self.raw_len() * 2
    }

    /// Name as reported by `git rev-parse --show-object-format`
    pub fn name(&self) -> &'static str {
        match self {
            ObjectFormat::Sha1 => "sha1",
            ObjectFormat::Sha256 => "sha256",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, GitError> {
        match name.trim() {
            "sha1" => Ok(ObjectFormat::Sha1),
            "sha256" => Ok(ObjectFormat::Sha256),
            other => Err(GitError::InvalidArgument(format!(
                "unsupported object format {other}"
            ))),
        }
    }

    /// The all-zero id, used by git to denote "no object"
    pub fn empty_object_id(&self) -> ObjectId {
        match self {
            ObjectFormat::Sha1 => ObjectId::Sha1([0; 20]),
            ObjectFormat::Sha256 => ObjectId::Sha256([0; 32]),
        }
    }

    /// Id of the tree with no entries
    pub fn empty_tree(&self) -> ObjectId {
        self.compute_hash(ObjectType::Tree, b"")
    }

    /// Check length and charset only, without touching the repository
    pub fn is_valid(&self, text: &str) -> bool {
        text.len() == self.hex_len() && text.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Parse hex text that must belong to this format
    ///
    /// # Arguments
    ///
    /// * `text` - Full-length hexadecimal id
    ///
    /// # Returns
    ///
    /// The id, or `InvalidFormat` when the width or charset is wrong
    pub fn parse(&self, text: &str) -> Result<ObjectId, GitError> {
        if text.len() != self.hex_len() {
            return Err(GitError::InvalidFormat {
                text: text.to_string(),
                reason: format!(
                    "expected {} hex characters for {}, got {}",
                    self.hex_len(),
                    self.name(),
                    text.len()
                ),
            });
        }

        ObjectId::try_parse(text)
    }

    /// Build an id from raw digest bytes
    pub fn from_raw(&self, bytes: &[u8]) -> Result<ObjectId, GitError> {
        if bytes.len() != self.raw_len() {
            return Err(GitError::InvalidFormat {
                text: hex::encode(bytes),
                reason: format!(
                    "expected {} raw bytes for {}, got {}",
                    self.raw_len(),
                    self.name(),
                    bytes.len()
                ),
            });
        }

        ObjectId::from_raw(bytes)
    }

    /// Hash `content` as an object of the given type
    pub fn compute_hash(&self, object_type: ObjectType, content: &[u8]) -> ObjectId {
        let header = format!("{} {}\0", object_type.as_str(), content.len());

        match self {
            ObjectFormat::Sha1 => {
                let mut hasher = Sha1::new();
                hasher.update(header.as_bytes());
                hasher.update(content);

                let mut raw = [0u8; 20];
                raw.copy_from_slice(&hasher.finalize());
                ObjectId::Sha1(raw)
            }
            ObjectFormat::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(header.as_bytes());
                hasher.update(content);

                let mut raw = [0u8; 32];
                raw.copy_from_slice(&hasher.finalize());
                ObjectId::Sha256(raw)
            }
        }
    }

    pub fn hash_blob(&self, content: &[u8]) -> ObjectId {
        self.compute_hash(ObjectType::Blob, content)
    }
}

impl std::fmt::Display for ObjectFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_matches_git() {
        assert_eq!(
            ObjectFormat::Sha1.empty_tree().to_string(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
        assert_eq!(
            ObjectFormat::Sha256.empty_tree().to_string(),
            "6ef19b41225c5369f1c104d45d8d85efa9b057b53b14b4b9b939dd74decc5321"
        );
    }

    #[test]
    fn empty_blob_matches_git() {
        assert_eq!(
            ObjectFormat::Sha1.hash_blob(b"").to_string(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn validity_is_width_and_charset() {
        let sha1 = ObjectFormat::Sha1;

        assert!(sha1.is_valid("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"));
        assert!(!sha1.is_valid("e69de29bb2d1d6434b8b29ae775ad8c2e48c539"));
        assert!(!sha1.is_valid("z69de29bb2d1d6434b8b29ae775ad8c2e48c5391"));
        assert!(!ObjectFormat::Sha256.is_valid("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"));
    }

    #[test]
    fn parse_rejects_other_format_width() {
        let err = ObjectFormat::Sha256
            .parse("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391")
            .unwrap_err();

        assert!(matches!(err, GitError::InvalidFormat { .. }));
    }

    #[test]
    fn empty_object_id_is_all_zeroes() {
        let id = ObjectFormat::Sha256.empty_object_id();

        assert!(id.is_zero());
        assert_eq!(id.to_string(), "0".repeat(64));
    }
}
