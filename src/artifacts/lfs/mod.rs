//! Git LFS pointer support
//!
//! - `pointer`: the pointer file grammar
//! - `scanner`: finding every pointer blob in a repository with a concurrent pipeline

pub mod pointer;
pub mod scanner;
