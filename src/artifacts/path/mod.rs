//! Path resolution inside trees
//!
//! - `resolver`: path lookups and sub-tree handles
//! - `symlink`: following symlink entries to their targets
//! - `submodule`: `.gitmodules` parsing
//!
//! Paths are always `/`-separated and relative to the root tree. Empty and `.`
//! segments are ignored and `..` folds into the parent segment.

pub mod resolver;
pub mod submodule;
pub mod symlink;

/// Normalize a tree path
///
/// # Returns
///
/// The cleaned path, or `None` when `..` segments climb above the root
pub fn normalize_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            segment => segments.push(segment),
        }
    }

    Some(segments.join("/"))
}

/// Normalize a tree path, dropping `..` segments that would leave the root
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    segments.join("/")
}

pub fn join_path(dir: &str, name: &str) -> String {
    match (dir.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (_, true) => dir.to_string(),
        _ => format!("{dir}/{name}"),
    }
}

/// Directory part of a path, empty for top-level entries
pub fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a/b/c", "a/b/c")]
    #[case("/a//b/./c/", "a/b/c")]
    #[case("a/../b", "b")]
    #[case("../../a", "a")]
    #[case(".", "")]
    #[case("", "")]
    fn paths_are_cleaned(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(clean_path(path), expected);
    }

    #[test]
    fn escaping_paths_do_not_normalize() {
        assert_eq!(normalize_path("a/../../b"), None);
        assert_eq!(normalize_path("a/./b/../c"), Some("a/c".to_string()));
    }

    #[test]
    fn paths_are_joined_and_split() {
        assert_eq!(join_path("", "file"), "file");
        assert_eq!(join_path("dir", ""), "dir");
        assert_eq!(join_path("dir/sub", "file"), "dir/sub/file");
        assert_eq!(parent_path("dir/sub/file"), "dir/sub");
        assert_eq!(parent_path("file"), "");
    }
}
