//! Core repository components
//!
//! This module contains the building blocks that talk to git:
//!
//! - `batch`: persistent `cat-file` sessions and the protocol spoken over them
//! - `command`: one-shot git invocations
//! - `database`: the object decoder
//! - `last_commit_cache`: memoized "last commit touching a path" lookups
//! - `repository`: the repository handle owning sessions and caches

pub mod batch;
pub mod command;
pub mod database;
pub mod last_commit_cache;
pub mod repository;
