//! Git data structures and algorithms
//!
//! - `lfs`: LFS pointer grammar and the pointer scan
//! - `log`: history lookups by path
//! - `objects`: Git object types (blob, tree, commit, tag) and identities
//! - `path`: path resolution, symlinks and submodules inside trees
//! - `pipeline`: concurrent stage pipelines connected by pipes

pub mod lfs;
pub mod log;
pub mod objects;
pub mod path;
pub mod pipeline;
