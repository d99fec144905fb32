//! Typed, read-only access to a git repository's object graph
//!
//! Storage is delegated entirely to the external `git` executable: objects are
//! fetched over persistent `git cat-file --batch` / `--batch-check` sessions and
//! a handful of one-shot subprocesses.
//!
//! - `areas`: the repository handle, batch sessions and the object decoder
//! - `artifacts`: object values, path resolution, history lookups, the scan pipeline
//! - `commands`: plumbing commands driving the library from the CLI
//! - `config`: runtime settings loaded from the environment
//! - `errors`: the error taxonomy shared by every layer

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod config;
pub mod errors;
