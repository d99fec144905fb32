use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::GitError;

#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
}

/// Mode of a tree entry
///
/// - `File`: a blob, regular or executable
/// - `Directory`: a nested tree
/// - `Symlink`: a blob holding the link target text
/// - `Submodule`: a commit of another repository (gitlink)
#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum EntryMode {
    File(FileMode),
    #[default]
    Directory,
    Symlink,
    Submodule,
}

impl EntryMode {
    /// Mode as written inside tree objects (no leading zero for directories)
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::File(FileMode::Regular) => "100644",
            EntryMode::File(FileMode::Executable) => "100755",
            EntryMode::Directory => "40000",
            EntryMode::Symlink => "120000",
            EntryMode::Submodule => "160000",
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::File(FileMode::Regular) => 0o100644,
            EntryMode::File(FileMode::Executable) => 0o100755,
            EntryMode::Directory => 0o40000,
            EntryMode::Symlink => 0o120000,
            EntryMode::Submodule => 0o160000,
        }
    }

    /// Type of the object the entry points at
    pub fn object_type(&self) -> ObjectType {
        match self {
            EntryMode::File(_) | EntryMode::Symlink => ObjectType::Blob,
            EntryMode::Directory => ObjectType::Tree,
            EntryMode::Submodule => ObjectType::Commit,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    pub fn is_link(&self) -> bool {
        matches!(self, EntryMode::Symlink)
    }

    pub fn is_submodule(&self) -> bool {
        matches!(self, EntryMode::Submodule)
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, EntryMode::File(FileMode::Executable))
    }

    pub fn is_regular(&self) -> bool {
        matches!(self, EntryMode::File(FileMode::Regular))
    }

    /// Regular, executable or symlink: anything whose content is a blob
    pub fn is_blob(&self) -> bool {
        self.object_type() == ObjectType::Blob
    }
}

impl TryFrom<u32> for EntryMode {
    type Error = GitError;

    fn try_from(mode: u32) -> Result<Self, Self::Error> {
        match mode {
            0o100644 => Ok(EntryMode::File(FileMode::Regular)),
            // legacy group-writable blobs written by very old git versions
            0o100664 => Ok(EntryMode::File(FileMode::Regular)),
            0o100755 => Ok(EntryMode::File(FileMode::Executable)),
            0o40000 => Ok(EntryMode::Directory),
            0o120000 => Ok(EntryMode::Symlink),
            0o160000 => Ok(EntryMode::Submodule),
            _ => Err(GitError::InvalidArgument(format!(
                "invalid entry mode {mode:o}"
            ))),
        }
    }
}

impl TryFrom<&str> for EntryMode {
    type Error = GitError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mode = u32::from_str_radix(value, 8)
            .map_err(|_| GitError::InvalidArgument(format!("invalid entry mode {value}")))?;
        EntryMode::try_from(mode)
    }
}

impl From<FileMode> for EntryMode {
    fn from(mode: FileMode) -> Self {
        EntryMode::File(mode)
    }
}

/// Padded to six digits, like `git ls-tree` prints it
impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tree_and_ls_tree_spellings() {
        assert_eq!(EntryMode::try_from("40000").unwrap(), EntryMode::Directory);
        assert_eq!(EntryMode::try_from("040000").unwrap(), EntryMode::Directory);
        assert_eq!(EntryMode::try_from("120000").unwrap(), EntryMode::Symlink);
        assert_eq!(EntryMode::try_from("160000").unwrap(), EntryMode::Submodule);
        assert!(EntryMode::try_from("100755").unwrap().is_executable());
        assert!(EntryMode::try_from("100600").is_err());
        assert!(EntryMode::try_from("mode").is_err());
    }

    #[test]
    fn display_pads_directories() {
        assert_eq!(EntryMode::Directory.to_string(), "040000");
        assert_eq!(EntryMode::Directory.as_str(), "40000");
        assert_eq!(EntryMode::Symlink.object_type(), ObjectType::Blob);
        assert_eq!(EntryMode::Submodule.object_type(), ObjectType::Commit);
        assert!(EntryMode::Symlink.is_blob());
        assert!(!EntryMode::Submodule.is_blob());
    }
}
