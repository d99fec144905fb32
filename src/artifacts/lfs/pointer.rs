use crate::errors::GitError;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::LazyLock;

pub const META_FILE_IDENTIFIER: &str = "version https://git-lfs.github.com/spec/v1";
pub const META_FILE_OID_PREFIX: &str = "oid sha256:";
pub const OID_REGEX: &str = r"^[a-f\d]{64}$";

static OID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(OID_REGEX).expect("oid pattern compiles"));

/// Pointer files are never larger than this
pub const BLOB_SIZE_CUTOFF: usize = 1024;

/// Content of a Git LFS pointer file: the sha256 and size of the real content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pointer {
    pub oid: String,
    pub size: u64,
}

impl Pointer {
    /// Parse pointer file content
    ///
    /// # Returns
    ///
    /// `InvalidArgument` describing the first rule the content breaks
    pub fn parse(buffer: &[u8]) -> Result<Self, GitError> {
        let invalid = |reason: &str| GitError::InvalidArgument(format!("not an lfs pointer: {reason}"));

        if buffer.len() > BLOB_SIZE_CUTOFF {
            return Err(invalid("too large"));
        }
        if !buffer.starts_with(META_FILE_IDENTIFIER.as_bytes()) {
            return Err(invalid("missing version line"));
        }

        let content = std::str::from_utf8(buffer).map_err(|_| invalid("not utf-8"))?;
        let lines = content.split('\n').collect::<Vec<_>>();
        if lines.len() < 3 {
            return Err(invalid("expected version, oid and size lines"));
        }

        let oid = lines[1]
            .strip_prefix(META_FILE_OID_PREFIX)
            .ok_or_else(|| invalid("missing oid"))?;
        if !Self::is_valid_oid(oid) {
            return Err(invalid("malformed oid"));
        }

        let size = lines[2]
            .strip_prefix("size ")
            .and_then(|size| size.parse::<u64>().ok())
            .ok_or_else(|| invalid("malformed size"))?;

        Ok(Pointer {
            oid: oid.to_string(),
            size,
        })
    }

    /// Pointer for `content`, as `git lfs clean` would write it
    pub fn generate(content: &[u8]) -> Self {
        Pointer {
            oid: hex::encode(Sha256::digest(content)),
            size: content.len() as u64,
        }
    }

    pub fn is_valid(&self) -> bool {
        Self::is_valid_oid(&self.oid)
    }

    /// Serialized pointer file
    pub fn to_content(&self) -> String {
        format!(
            "{META_FILE_IDENTIFIER}\n{META_FILE_OID_PREFIX}{}\nsize {}\n",
            self.oid, self.size
        )
    }

    /// Location of the content below an LFS object store: `ab/cd/abcd...`
    pub fn relative_path(&self) -> String {
        if self.oid.len() < 5 {
            return self.oid.clone();
        }

        format!("{}/{}/{}", &self.oid[0..2], &self.oid[2..4], self.oid)
    }

    fn is_valid_oid(oid: &str) -> bool {
        OID_PATTERN.is_match(oid)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.oid, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const OID: &str = "4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393";

    #[test]
    fn pointer_content_parses_back() {
        let pointer = Pointer {
            oid: OID.to_string(),
            size: 12345,
        };

        let parsed = Pointer::parse(pointer.to_content().as_bytes()).unwrap();

        assert_eq!(parsed, pointer);
        assert!(parsed.is_valid());
    }

    #[rstest]
    #[case::empty("")]
    #[case::wrong_version("version https://example.com/spec/v2\noid sha256:x\nsize 1\n")]
    #[case::upper_case_oid(
        "version https://git-lfs.github.com/spec/v1\noid sha256:4D7A214614AB2935C943F9E0FF69D22EADBB8F32B1258DAAA5E2CA24D17E2393\nsize 1\n"
    )]
    #[case::short_oid("version https://git-lfs.github.com/spec/v1\noid sha256:4d7a21\nsize 1\n")]
    #[case::sha1_oid(
        "version https://git-lfs.github.com/spec/v1\noid sha1:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393\nsize 1\n"
    )]
    #[case::negative_size(
        "version https://git-lfs.github.com/spec/v1\noid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393\nsize -1\n"
    )]
    #[case::missing_size(
        "version https://git-lfs.github.com/spec/v1\noid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393"
    )]
    fn invalid_pointers_are_rejected(#[case] content: &str) {
        assert!(Pointer::parse(content.as_bytes()).is_err());
    }

    #[test]
    fn oids_are_checked_against_one_compiled_pattern() {
        assert!(Pointer::is_valid_oid(OID));
        assert!(!Pointer::is_valid_oid(&OID.to_uppercase()));
        assert!(!Pointer::is_valid_oid(&OID[1..]));
        assert!(!Pointer::is_valid_oid(""));

        let hand_made = Pointer {
            oid: "nothex".to_string(),
            size: 1,
        };
        assert!(!hand_made.is_valid());
    }

    #[test]
    fn oversized_content_is_rejected() {
        let mut content = Pointer::generate(b"x").to_content().into_bytes();
        content.resize(BLOB_SIZE_CUTOFF + 1, b'\n');

        assert!(Pointer::parse(&content).is_err());
    }

    #[test]
    fn generated_pointers_hash_the_content() {
        let pointer = Pointer::generate(b"");

        assert_eq!(
            pointer.oid,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(pointer.size, 0);
        assert_eq!(
            pointer.relative_path(),
            "e3/b0/e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
