//! Error taxonomy
//!
//! Every fallible engine operation returns [`GitError`]. Callers are expected to
//! branch on the category helpers rather than on individual variants:
//!
//! - not-found (`is_not_exist`): a normal outcome, the object/ref/path is absent
//! - unprocessable (`is_unprocessable`): the object is of the wrong kind for the request
//! - transport (`is_transport`): the git subprocess failed or produced garbage;
//!   the session that observed it is never reused
//!
//! Cache-layer failures use the separate [`CacheError`] and are always downgraded
//! to a log line by the cache itself.

use crate::artifacts::objects::object_type::ObjectType;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("object does not exist [id: {id}, rel_path: {rel_path}]")]
    NotExist { id: String, rel_path: String },

    #[error("symlink {path:?} points to missing target {link:?}")]
    BrokenLink { path: String, link: String },

    #[error("invalid object id {text:?}: {reason}")]
    InvalidFormat { text: String, reason: String },

    #[error("invalid argument {0:?}")]
    InvalidArgument(String),

    #[error("unable to process {path:?}: {reason}")]
    Unprocessable { path: String, reason: String },

    #[error("invalid repository {}: {reason}", path.display())]
    RepoInvalid { path: PathBuf, reason: String },

    #[error("malformed {object_type} object {id}: {reason}")]
    Malformed {
        object_type: ObjectType,
        id: String,
        reason: String,
    },

    #[error("git transport failure: {0}")]
    Transport(String),

    #[error("`git {command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GitError {
    pub fn not_exist(id: impl Into<String>) -> Self {
        GitError::NotExist {
            id: id.into(),
            rel_path: String::new(),
        }
    }

    pub fn not_exist_at(id: impl Into<String>, rel_path: impl Into<String>) -> Self {
        GitError::NotExist {
            id: id.into(),
            rel_path: rel_path.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        GitError::Transport(message.into())
    }

    pub fn unprocessable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        GitError::Unprocessable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(object_type: ObjectType, id: impl ToString, reason: impl Into<String>) -> Self {
        GitError::Malformed {
            object_type,
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_not_exist(&self) -> bool {
        matches!(self, GitError::NotExist { .. } | GitError::BrokenLink { .. })
    }

    pub fn is_unprocessable(&self) -> bool {
        matches!(self, GitError::Unprocessable { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GitError::Cancelled)
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GitError::Transport(_)
                | GitError::Malformed { .. }
                | GitError::Command { .. }
                | GitError::RepoInvalid { .. }
                | GitError::Io(_)
        )
    }

    /// Link text of a broken symlink, kept for diagnostics
    pub fn symlink_content(&self) -> Option<&str> {
        match self {
            GitError::BrokenLink { link, .. } => Some(link),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("cache backend failure: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_links_count_as_not_exist() {
        let err = GitError::BrokenLink {
            path: "foo/link".to_string(),
            link: "../outside/target".to_string(),
        };

        assert!(err.is_not_exist());
        assert!(!err.is_transport());
        assert_eq!(err.symlink_content(), Some("../outside/target"));
    }

    #[test]
    fn transport_class_covers_subprocess_failures() {
        let err = GitError::Command {
            command: "log".to_string(),
            status: "exit status: 128".to_string(),
            stderr: "fatal: something".to_string(),
        };

        assert!(err.is_transport());
        assert!(!err.is_not_exist());
        assert!(GitError::transport("eof").is_transport());
        assert!(!GitError::not_exist("abc").is_transport());
    }
}
