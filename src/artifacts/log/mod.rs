//! History lookups
//!
//! Only what the last-commit cache needs: the last commit that touched a path
//! and the size of a history. Both are delegated to `git log` / `git rev-list`,
//! which walk history far faster than decoding commits one by one would.

pub mod path_history;
