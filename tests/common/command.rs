use crate::common::file::{FileSpec, write_file, write_symlink};
use crate::common::{lfs_pointer_for, redirect_temp_dir};
use assert_cmd::Command;
use assert_fs::TempDir;
use gitcat::areas::repository::Repository;
use gitcat::config::Settings;
use rstest::fixture;
use std::path::Path;

pub const AUTHOR_NAME: &str = "fake_user";
pub const AUTHOR_EMAIL: &str = "fake_email@email.com";
pub const AUTHOR_DATE: &str = "2023-01-01 12:00:00 +0000";

#[fixture]
pub fn repository_dir() -> TempDir {
    redirect_temp_dir();
    TempDir::new().expect("Failed to create temp dir")
}

/// `1.txt`, `a/2.txt` and `a/b/3.txt` in one commit, tagged `v1`
#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    git_init(repository_dir.path(), "sha1");

    write_file(FileSpec::new(
        repository_dir.path().join("1.txt"),
        "one".to_string(),
    ));
    write_file(FileSpec::new(
        repository_dir.path().join("a").join("2.txt"),
        "two".to_string(),
    ));
    write_file(FileSpec::new(
        repository_dir.path().join("a").join("b").join("3.txt"),
        "three".to_string(),
    ));

    git_commit(repository_dir.path(), "Initial commit");
    run_git_command(
        repository_dir.path(),
        &["tag", "-a", "v1", "-m", "release one"],
    )
    .assert()
    .success();

    repository_dir
}

/// Four commits:
///
/// 1. add `file1.txt`
/// 2. add `file2.txt`
/// 3. modify `file1.txt`
/// 4. add `dir/file4.txt`
#[fixture]
pub fn repository_with_multiple_commits(repository_dir: TempDir) -> TempDir {
    let dir = repository_dir.path();
    git_init(dir, "sha1");

    write_file(FileSpec::new(dir.join("file1.txt"), "content 1".to_string()));
    git_commit(dir, "First commit");

    write_file(FileSpec::new(dir.join("file2.txt"), "content 2".to_string()));
    git_commit(dir, "Second commit");

    write_file(FileSpec::new(
        dir.join("file1.txt"),
        "content 1, revised".to_string(),
    ));
    git_commit(dir, "Third commit");

    write_file(FileSpec::new(
        dir.join("dir").join("file4.txt"),
        "content 4".to_string(),
    ));
    git_commit(dir, "Fourth commit");

    repository_dir
}

/// Symlinks of every flavour next to `a/target.txt`
///
/// - `link` -> `a/target.txt`
/// - `a/sibling` -> `target.txt`
/// - `chain` -> `link`
/// - `to_dir` -> `a`
/// - `broken` -> `nowhere.txt`
/// - `escape` -> `../../outside`
/// - `absolute` -> `/etc/hostname`
/// - `loop_a` <-> `loop_b`
#[fixture]
pub fn repository_with_symlinks(repository_dir: TempDir) -> TempDir {
    let dir = repository_dir.path();
    git_init(dir, "sha1");

    write_file(FileSpec::new(
        dir.join("a").join("target.txt"),
        "target content".to_string(),
    ));
    write_symlink(dir, "link", "a/target.txt");
    write_symlink(dir, "a/sibling", "target.txt");
    write_symlink(dir, "chain", "link");
    write_symlink(dir, "to_dir", "a");
    write_symlink(dir, "broken", "nowhere.txt");
    write_symlink(dir, "escape", "../../outside");
    write_symlink(dir, "absolute", "/etc/hostname");
    write_symlink(dir, "loop_a", "loop_b");
    write_symlink(dir, "loop_b", "loop_a");

    git_commit(dir, "Add symlinks");

    repository_dir
}

/// Two commits holding LFS pointers, ordinary files and one oversized file
///
/// # Returns
///
/// The directory, and the pointer oids introduced by the first and second commit
#[fixture]
pub fn repository_with_lfs_pointers(repository_dir: TempDir) -> (TempDir, Vec<String>, Vec<String>) {
    let dir = repository_dir.path();
    git_init(dir, "sha1");

    let (first_oid, first_pointer) = lfs_pointer_for("first large asset");
    write_file(FileSpec::new(dir.join("assets").join("first.bin"), first_pointer));
    write_file(FileSpec::new(dir.join("README.md"), "# readme".to_string()));
    write_file(FileSpec::new(dir.join("large.txt"), "x".repeat(4096)));
    git_commit(dir, "Add first asset");

    let (second_oid, second_pointer) = lfs_pointer_for("second large asset");
    write_file(FileSpec::new(dir.join("second.bin"), second_pointer));
    write_file(FileSpec::new(
        dir.join("fake.bin"),
        "version https://git-lfs.github.com/spec/v1\noid sha256:nothex\nsize 1\n".to_string(),
    ));
    git_commit(dir, "Add second asset");

    (repository_dir, vec![first_oid], vec![second_oid])
}

#[fixture]
pub fn sha256_repository_dir(repository_dir: TempDir) -> TempDir {
    git_init(repository_dir.path(), "sha256");

    write_file(FileSpec::new(
        repository_dir.path().join("1.txt"),
        "one".to_string(),
    ));
    write_file(FileSpec::new(
        repository_dir.path().join("a").join("2.txt"),
        "two".to_string(),
    ));
    git_commit(repository_dir.path(), "Initial commit");

    repository_dir
}

pub fn run_gitcat_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("gitcat").expect("Failed to find gitcat binary");
    cmd.env_remove("GITCAT_LOG");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn run_git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir);
    cmd.envs(vec![
        ("GIT_AUTHOR_NAME", AUTHOR_NAME),
        ("GIT_AUTHOR_EMAIL", AUTHOR_EMAIL),
        ("GIT_AUTHOR_DATE", AUTHOR_DATE),
        ("GIT_COMMITTER_NAME", AUTHOR_NAME),
        ("GIT_COMMITTER_EMAIL", AUTHOR_EMAIL),
        ("GIT_COMMITTER_DATE", AUTHOR_DATE),
        ("GIT_CONFIG_NOSYSTEM", "1"),
    ]);
    cmd.args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"]);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

/// Trimmed stdout of a git invocation that must succeed
pub fn git_output(dir: &Path, args: &[&str]) -> Result<String, Box<dyn std::error::Error>> {
    let output = run_git_command(dir, args).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone())?;

    Ok(stdout.trim().to_string())
}

pub fn git_init(dir: &Path, object_format: &str) {
    run_git_command(
        dir,
        &[
            "-c",
            "init.defaultBranch=main",
            "init",
            &format!("--object-format={object_format}"),
        ],
    )
    .assert()
    .success();
}

pub fn git_commit(dir: &Path, message: &str) {
    run_git_command(dir, &["add", "--all"]).assert().success();
    run_git_command(dir, &["commit", "-q", "-m", message])
        .assert()
        .success();
}

pub fn open_repository(dir: &Path) -> Repository {
    open_repository_with(dir, Settings::default())
}

pub fn open_repository_with(dir: &Path, settings: Settings) -> Repository {
    Repository::open(dir, settings).expect("Failed to open repository")
}
