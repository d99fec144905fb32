//! Plumbing commands
//!
//! Thin drivers over the library: each resolves its arguments, calls into the
//! repository handle and prints the result through the repository writer.
//!
//! ## Commands
//!
//! - `cat-file`: type, size, existence or content of an object
//! - `follow-link`: resolve a symlink inside a commit
//! - `hash-object`: compute the blob id of a file
//! - `last-commit`: last commit that touched a path
//! - `lfs-pointers`: list LFS pointer blobs
//! - `ls-tree`: list the contents of a tree

pub mod cat_file;
pub mod follow_link;
pub mod hash_object;
pub mod last_commit;
pub mod lfs_pointers;
pub mod ls_tree;
