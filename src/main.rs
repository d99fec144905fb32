use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use gitcat::areas::last_commit_cache::MemoryCache;
use gitcat::areas::repository::Repository;
use gitcat::artifacts::lfs::scanner::ScanScope;
use gitcat::commands::plumbing::cat_file::CatFileMode;
use gitcat::config::Settings;
use is_terminal::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gitcat",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Typed, read-only access to git objects",
    long_about = "This is a read-only object access engine over the git executable. \
    Objects are read through persistent `git cat-file --batch` sessions \
    and decoded into typed values.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(
        short = 'C',
        global = true,
        default_value = ".",
        help = "Run as if started in this repository"
    )]
    repository: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "cat-file",
        about = "Print the type, size or content of an object",
        long_about = "This command prints information about an object in the repository. \
        Exactly one of -t, -s, -e or -p must be given.",
        group(ArgGroup::new("mode").required(true).args(["show_type", "size", "exists", "pretty"]))
    )]
    CatFile {
        #[arg(short = 't', help = "Print the object type")]
        show_type: bool,
        #[arg(short = 's', help = "Print the object size")]
        size: bool,
        #[arg(short = 'e', help = "Exit with an error unless the object exists")]
        exists: bool,
        #[arg(short = 'p', help = "Pretty-print the object content")]
        pretty: bool,
        #[arg(index = 1, help = "The object to inspect")]
        object: String,
    },
    #[command(
        name = "ls-tree",
        about = "List the contents of a tree object",
        long_about = "This command lists a tree, or the part of it below a path. \
        Commits and tags are peeled to their tree."
    )]
    LsTree {
        #[arg(short = 'r', help = "Recurse into sub-trees")]
        recursive: bool,
        #[arg(index = 1, help = "The tree-ish to list")]
        tree_ish: String,
        #[arg(index = 2, help = "Only list below this path")]
        path: Option<String>,
    },
    #[command(
        name = "hash-object",
        about = "Compute the blob id of a file",
        long_about = "This command computes the id a file would get as a blob, \
        using the object format of the repository. Nothing is written."
    )]
    HashObject {
        #[arg(index = 1)]
        file: PathBuf,
    },
    #[command(
        name = "last-commit",
        about = "Print the last commit that touched a path",
        long_about = "This command prints the id, author, date and summary of the last commit \
        reachable from a revision that changed the given path."
    )]
    LastCommit {
        #[arg(index = 1, help = "The revision to start from")]
        revision: String,
        #[arg(index = 2, default_value = "", help = "The path to look up")]
        path: String,
    },
    #[command(
        name = "follow-link",
        about = "Resolve a symlink inside a commit",
        long_about = "This command follows a chain of symlinks stored in a commit \
        and prints the entry it ends on."
    )]
    FollowLink {
        #[arg(index = 1, help = "The commit-ish to look in")]
        revision: String,
        #[arg(index = 2, help = "Path of the symlink")]
        path: String,
    },
    #[command(
        name = "lfs-pointers",
        about = "List blobs that are LFS pointers",
        long_about = "This command scans the object database, or the objects reachable \
        from a revision, and prints every blob holding a valid LFS pointer."
    )]
    LfsPointers {
        #[arg(long, help = "Only scan objects reachable from this revision")]
        head: Option<String>,
        #[arg(long, requires = "head", help = "Exclude objects reachable from this revision")]
        base: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GITCAT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load_from_env()?;
    let repository =
        Repository::open(&cli.repository, settings)?.with_writer(Box::new(std::io::stdout()));

    let result = dispatch(&repository, cli.command).await;
    repository.close().await?;

    result
}

async fn dispatch(repository: &Repository, command: Commands) -> Result<()> {
    match command {
        Commands::CatFile {
            show_type,
            size,
            exists,
            object,
            ..
        } => {
            let mode = if show_type {
                CatFileMode::Type
            } else if size {
                CatFileMode::Size
            } else if exists {
                CatFileMode::Exists
            } else {
                CatFileMode::Pretty
            };

            repository.cat_file(&object, mode).await
        }
        Commands::LsTree {
            recursive,
            tree_ish,
            path,
        } => {
            repository
                .ls_tree(&tree_ish, path.as_deref(), recursive)
                .await
        }
        Commands::HashObject { file } => repository.hash_object(&file).await,
        Commands::LastCommit { revision, path } => {
            repository
                .last_commit(&revision, &path, Some(Arc::new(MemoryCache::new())))
                .await
        }
        Commands::FollowLink { revision, path } => repository.follow_link(&revision, &path).await,
        Commands::LfsPointers { head, base } => {
            let scope = match head {
                Some(head) => ScanScope::Range { head, base },
                None => ScanScope::AllObjects,
            };

            repository.lfs_pointers(scope).await
        }
    }
}
