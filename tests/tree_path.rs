use assert_fs::TempDir;
use gitcat::artifacts::objects::entry_mode::EntryMode;
use gitcat::artifacts::objects::object_type::ObjectType;
use gitcat::artifacts::objects::tree::Tree;
use gitcat::artifacts::path::symlink::DEFAULT_FOLLOW_LIMIT;
use gitcat::errors::GitError;
use rstest::rstest;
use std::sync::Arc;

mod common;

use common::command::{
    git_commit, git_output, init_repository_dir, open_repository, repository_dir,
    repository_with_symlinks,
};
use common::file::{FileSpec, write_file};

const ONE_BLOB: &str = "43dd47ea691c90a5fa7827892c70241913351963";
const THREE_BLOB: &str = "1d19714ffbc272ba0da6eb419d66123c20527174";

#[rstest]
#[tokio::test]
async fn root_entries_are_listed_in_tree_order(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(init_repository_dir.path());

    let tree = repository.tree("HEAD").await?;
    let entries = tree.list_entries().await?;

    let listing = entries
        .iter()
        .map(|entry| (entry.name(), entry.object_type(), entry.id().to_hex()))
        .collect::<Vec<_>>();
    pretty_assertions::assert_eq!(
        listing,
        vec![
            ("1.txt", ObjectType::Blob, ONE_BLOB.to_string()),
            (
                "a",
                ObjectType::Tree,
                git_output(init_repository_dir.path(), &["rev-parse", "HEAD:a"])?
            ),
        ]
    );
    pretty_assertions::assert_eq!(
        tree.resolved_id().map(|id| id.to_hex()),
        Some(git_output(init_repository_dir.path(), &["rev-parse", "HEAD^{tree}"])?)
    );

    Ok(())
}

#[rstest]
#[tokio::test]
async fn tags_and_commits_open_as_trees(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(init_repository_dir.path());

    for revision in ["HEAD", "v1", "HEAD^{tree}", "main"] {
        let tree = repository.tree(revision).await?;
        let entry = tree.get_tree_entry_by_path("a/b/3.txt").await?;
        pretty_assertions::assert_eq!(entry.id().to_hex(), THREE_BLOB, "{revision}");
    }

    let commit = repository.database().parse_object_as_commit("HEAD").await?;
    let entries = repository.database().read_tree_entries(commit.id()).await?;
    pretty_assertions::assert_eq!(&entries.0, commit.tree_id());

    Ok(())
}

#[rstest]
#[tokio::test]
async fn paths_resolve_to_entries(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(init_repository_dir.path());
    let tree = repository.tree("HEAD").await?;

    let entry = tree.get_tree_entry_by_path("a/b/3.txt").await?;
    pretty_assertions::assert_eq!(entry.name(), "3.txt");
    pretty_assertions::assert_eq!(entry.mode(), EntryMode::File(Default::default()));

    // messy spellings are cleaned first
    let entry = tree.get_tree_entry_by_path("/a//b/./3.txt").await?;
    pretty_assertions::assert_eq!(entry.id().to_hex(), THREE_BLOB);

    let entry = tree.get_tree_entry_by_path("a/b").await?;
    assert!(entry.is_dir());

    let root = tree.get_tree_entry_by_path("").await?;
    assert!(root.is_dir());
    pretty_assertions::assert_eq!(
        root.id().to_hex(),
        git_output(init_repository_dir.path(), &["rev-parse", "HEAD^{tree}"])?
    );

    Ok(())
}

#[rstest]
#[tokio::test]
async fn unreachable_paths_do_not_exist(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(init_repository_dir.path());
    let tree = repository.tree("HEAD").await?;

    for path in ["missing.txt", "a/missing", "1.txt/child", "a/b/3.txt/child"] {
        let err = tree.get_tree_entry_by_path(path).await.unwrap_err();
        assert!(err.is_not_exist(), "{path}: unexpected error {err:?}");
    }

    let err = tree.get_tree_entry_by_path("a/nope").await.unwrap_err();
    let GitError::NotExist { rel_path, .. } = err else {
        panic!("unexpected error {err:?}");
    };
    pretty_assertions::assert_eq!(rel_path, "a/nope");

    Ok(())
}

#[rstest]
#[tokio::test]
async fn sub_trees_remember_their_path(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(init_repository_dir.path());
    let root = Arc::new(repository.tree("HEAD").await?);

    let sub_tree = root.sub_tree("a/b").await?;
    pretty_assertions::assert_eq!(sub_tree.path(), "a/b");
    pretty_assertions::assert_eq!(sub_tree.name(), "b");
    pretty_assertions::assert_eq!(
        sub_tree.parent().map(|parent| parent.path()),
        Some("a".to_string())
    );

    let names = sub_tree
        .list_entries()
        .await?
        .iter()
        .map(|entry| entry.name().to_string())
        .collect::<Vec<_>>();
    pretty_assertions::assert_eq!(names, vec!["3.txt"]);

    let err = root.sub_tree("1.txt").await.unwrap_err();
    assert!(err.is_not_exist(), "unexpected error {err:?}");

    Ok(())
}

#[rstest]
#[tokio::test]
async fn recursive_listings_carry_full_paths(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(init_repository_dir.path());
    let tree = repository.tree("HEAD").await?;

    let names = tree
        .list_entries_recursive()
        .await?
        .iter()
        .map(|entry| entry.name().to_string())
        .collect::<Vec<_>>();
    pretty_assertions::assert_eq!(names, vec!["1.txt", "a", "a/2.txt", "a/b", "a/b/3.txt"]);

    Ok(())
}

#[rstest]
#[tokio::test]
async fn symlinks_are_followed(
    repository_with_symlinks: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(repository_with_symlinks.path());
    let commit = repository.database().parse_object_as_commit("HEAD").await?;
    let tree = Tree::new(&repository, *commit.id());

    let link = tree.get_tree_entry_by_path("link").await?;
    assert!(link.is_link());
    let result = repository
        .entry_follow_link(commit.id(), "link", &link)
        .await?;
    pretty_assertions::assert_eq!(result.symlink_content, "a/target.txt");
    pretty_assertions::assert_eq!(result.target_full_path, "a/target.txt");
    assert!(result.target_entry.is_regular());

    // relative to the directory holding the link
    let sibling = tree.get_tree_entry_by_path("a/sibling").await?;
    let result = repository
        .entry_follow_link(commit.id(), "a/sibling", &sibling)
        .await?;
    pretty_assertions::assert_eq!(result.target_full_path, "a/target.txt");

    let to_dir = tree.get_tree_entry_by_path("to_dir").await?;
    let result = repository
        .entry_follow_link(commit.id(), "to_dir", &to_dir)
        .await?;
    assert!(result.target_entry.is_dir());

    Ok(())
}

#[rstest]
#[tokio::test]
async fn symlink_chains_are_followed_up_to_a_limit(
    repository_with_symlinks: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(repository_with_symlinks.path());
    let commit = repository.database().parse_object_as_commit("HEAD").await?;
    let tree = Tree::new(&repository, *commit.id());

    let chain = tree.get_tree_entry_by_path("chain").await?;
    let single = repository
        .entry_follow_link(commit.id(), "chain", &chain)
        .await?;
    pretty_assertions::assert_eq!(single.target_full_path, "link");
    assert!(single.target_entry.is_link());

    let followed = repository
        .entry_follow_links(commit.id(), "chain", &chain, DEFAULT_FOLLOW_LIMIT)
        .await?;
    pretty_assertions::assert_eq!(followed.target_full_path, "a/target.txt");
    pretty_assertions::assert_eq!(followed.symlink_content, "a/target.txt");

    let err = repository
        .entry_follow_links(commit.id(), "chain", &chain, 1)
        .await
        .unwrap_err();
    assert!(err.is_unprocessable(), "unexpected error {err:?}");

    let loop_a = tree.get_tree_entry_by_path("loop_a").await?;
    let err = repository
        .entry_follow_links(commit.id(), "loop_a", &loop_a, DEFAULT_FOLLOW_LIMIT)
        .await
        .unwrap_err();
    assert!(err.is_unprocessable(), "unexpected error {err:?}");

    Ok(())
}

#[rstest]
#[tokio::test]
async fn bad_symlinks_are_reported(
    repository_with_symlinks: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(repository_with_symlinks.path());
    let commit = repository.database().parse_object_as_commit("HEAD").await?;
    let tree = Tree::new(&repository, *commit.id());

    let broken = tree.get_tree_entry_by_path("broken").await?;
    let err = repository
        .entry_follow_link(commit.id(), "broken", &broken)
        .await
        .unwrap_err();
    assert!(err.is_not_exist(), "unexpected error {err:?}");
    pretty_assertions::assert_eq!(err.symlink_content(), Some("nowhere.txt"));

    for path in ["escape", "absolute", "a/target.txt"] {
        let entry = tree.get_tree_entry_by_path(path).await?;
        let err = repository
            .entry_follow_link(commit.id(), path, &entry)
            .await
            .unwrap_err();
        assert!(err.is_unprocessable(), "{path}: unexpected error {err:?}");
    }

    Ok(())
}

#[rstest]
#[tokio::test]
async fn submodules_are_read_from_gitmodules(
    repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = repository_dir.path();
    common::command::git_init(dir, "sha1");
    write_file(FileSpec::new(dir.join("README.md"), "# readme".to_string()));
    git_commit(dir, "Without submodules");

    let repository = open_repository(dir);
    let first = repository.database().parse_object_as_commit("HEAD").await?;
    assert!(repository.get_submodules(first.id()).await?.is_empty());

    write_file(FileSpec::new(
        dir.join(".gitmodules"),
        "[submodule \"libfoo\"]\n\tpath = vendor/libfoo\n\turl = https://example.com/libfoo.git\n\tbranch = stable\n"
            .to_string(),
    ));
    git_commit(dir, "Declare a submodule");

    let second = repository.database().parse_object_as_commit("HEAD").await?;
    let submodules = repository.get_submodules(second.id()).await?;
    pretty_assertions::assert_eq!(submodules.len(), 1);
    pretty_assertions::assert_eq!(submodules[0].name, "libfoo");
    pretty_assertions::assert_eq!(submodules[0].url, "https://example.com/libfoo.git");
    pretty_assertions::assert_eq!(submodules[0].branch.as_deref(), Some("stable"));

    let found = repository
        .get_submodule(second.id(), "./vendor/libfoo/")
        .await?;
    pretty_assertions::assert_eq!(found.map(|submodule| submodule.path), Some("vendor/libfoo".to_string()));
    assert!(repository.get_submodule(second.id(), "vendor").await?.is_none());

    Ok(())
}
