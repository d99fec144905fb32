//! Command implementations behind the `gitcat` binary
//!
//! Only plumbing exists: every command reads from the repository and none of
//! them writes to it.

pub mod plumbing;
