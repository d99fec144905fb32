//! Git object identifier
//!
//! Object IDs are the raw digest of an object's bytes. Two widths exist:
//!
//! - SHA-1: 20 bytes, 40 hex characters
//! - SHA-256: 32 bytes, 64 hex characters
//!
//! The byte width always matches the format by construction. Equality, hashing
//! and ordering are byte-wise; ids of different formats never compare equal.
//!
//! ## Format
//!
//! - Full: lower-case hex (e.g., "abc123...def")
//! - Short: First 7 characters (e.g., "abc1234")

use crate::artifacts::objects::object_format::ObjectFormat;
use crate::errors::GitError;
use std::io;

/// Length of the conventional abbreviated id
pub const SHORT_OID_LENGTH: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectId {
    Sha1([u8; 20]),
    Sha256([u8; 32]),
}

impl ObjectId {
    /// Parse and validate an object ID from hex text
    ///
    /// The format is inferred from the text length.
    ///
    /// # Arguments
    ///
    /// * `id` - 40 or 64 character hexadecimal string
    ///
    /// # Returns
    ///
    /// Validated ObjectId or `InvalidFormat` if the length or characters are wrong
    pub fn try_parse(id: &str) -> Result<Self, GitError> {
        let invalid = |reason: String| GitError::InvalidFormat {
            text: id.to_string(),
            reason,
        };

        match id.len() {
            40 => {
                let mut raw = [0u8; 20];
                hex::decode_to_slice(id, &mut raw).map_err(|e| invalid(e.to_string()))?;
                Ok(ObjectId::Sha1(raw))
            }
            64 => {
                let mut raw = [0u8; 32];
                hex::decode_to_slice(id, &mut raw).map_err(|e| invalid(e.to_string()))?;
                Ok(ObjectId::Sha256(raw))
            }
            len => Err(invalid(format!("invalid object id length {len}"))),
        }
    }

    /// Build an id from its raw digest, inferring the format from the width
    pub fn from_raw(bytes: &[u8]) -> Result<Self, GitError> {
        match bytes.len() {
            20 => {
                let mut raw = [0u8; 20];
                raw.copy_from_slice(bytes);
                Ok(ObjectId::Sha1(raw))
            }
            32 => {
                let mut raw = [0u8; 32];
                raw.copy_from_slice(bytes);
                Ok(ObjectId::Sha256(raw))
            }
            len => Err(GitError::InvalidFormat {
                text: hex::encode(bytes),
                reason: format!("invalid raw object id length {len}"),
            }),
        }
    }

    /// Read an object ID in binary form, as embedded in tree objects
    ///
    /// # Arguments
    ///
    /// * `format` - Decides how many bytes are consumed
    /// * `reader` - Source of the binary data
    pub fn read_raw_from<R: io::Read + ?Sized>(
        format: ObjectFormat,
        reader: &mut R,
    ) -> io::Result<Self> {
        match format {
            ObjectFormat::Sha1 => {
                let mut raw = [0u8; 20];
                reader.read_exact(&mut raw)?;
                Ok(ObjectId::Sha1(raw))
            }
            ObjectFormat::Sha256 => {
                let mut raw = [0u8; 32];
                reader.read_exact(&mut raw)?;
                Ok(ObjectId::Sha256(raw))
            }
        }
    }

    pub fn format(&self) -> ObjectFormat {
        match self {
            ObjectId::Sha1(_) => ObjectFormat::Sha1,
            ObjectId::Sha256(_) => ObjectFormat::Sha256,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ObjectId::Sha1(raw) => raw,
            ObjectId::Sha256(raw) => raw,
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Whether this is the all-zero "no object" id
    pub fn is_zero(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }

    /// Get abbreviated form of the object ID
    ///
    /// # Returns
    ///
    /// First 7 characters of the hash (standard Git abbreviation)
    pub fn to_short_oid(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_OID_LENGTH);
        hex
    }
}

impl TryFrom<&str> for ObjectId {
    type Error = GitError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_parse(value)
    }
}

impl std::str::FromStr for ObjectId {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_is_inferred_from_length() {
        let sha1 = ObjectId::try_parse("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391").unwrap();
        let sha256 = ObjectId::try_parse(&"ab".repeat(32)).unwrap();

        assert_eq!(sha1.format(), ObjectFormat::Sha1);
        assert_eq!(sha1.as_bytes().len(), 20);
        assert_eq!(sha256.format(), ObjectFormat::Sha256);
        assert_eq!(sha256.as_bytes().len(), 32);
    }

    #[test]
    fn invalid_text_is_rejected() {
        for text in ["", "abc", &"g".repeat(40), &"a".repeat(41)] {
            let err = ObjectId::try_parse(text).unwrap_err();
            assert!(matches!(err, GitError::InvalidFormat { .. }), "{text}");
        }
    }

    #[test]
    fn display_is_lower_case_hex() {
        let id = ObjectId::try_parse("E69DE29BB2D1D6434B8B29AE775AD8C2E48C5391").unwrap();

        assert_eq!(id.to_string(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
        assert_eq!(id.to_short_oid(), "e69de29");
    }

    #[test]
    fn different_formats_never_compare_equal() {
        let zero_sha1 = ObjectFormat::Sha1.empty_object_id();
        let zero_sha256 = ObjectFormat::Sha256.empty_object_id();

        assert_ne!(zero_sha1, zero_sha256);
    }

    #[test]
    fn raw_reader_consumes_exact_width() {
        let id = ObjectFormat::Sha1.hash_blob(b"hello");
        let mut data = id.as_bytes().to_vec();
        data.extend_from_slice(b"rest");
        let mut cursor = std::io::Cursor::new(data);

        let read = ObjectId::read_raw_from(ObjectFormat::Sha1, &mut cursor).unwrap();

        assert_eq!(read, id);
        assert_eq!(cursor.position(), 20);
    }
}
