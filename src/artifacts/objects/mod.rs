//! Git object types and operations
//!
//! Git stores all content as objects identified by their hash. There are four main types:
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Directory listing (names, modes, and object IDs)
//! - **Commit**: Snapshot with metadata (author, message, parent commits, tree)
//! - **Tag**: Annotated reference to another object
//!
//! Commits and tags decode into owned values. Trees and blobs are handles bound
//! to a repository that fetch their entries or content lazily through the
//! batch sessions.

pub mod blob;
pub mod commit;
pub mod entry_mode;
pub mod object;
pub mod object_format;
pub mod object_id;
pub mod object_type;
pub mod signature;
pub mod tag;
pub mod tree;
