//! Runtime settings
//!
//! All knobs have sensible defaults and can be overridden through `GITCAT_*`
//! environment variables.

use anyhow::Context;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BLOB_BUFFER_THRESHOLD: u64 = 4096;
pub const DEFAULT_LAST_COMMIT_TTL: Duration = Duration::from_secs(8760 * 60 * 60);
pub const DEFAULT_LAST_COMMIT_COMMITS: u64 = 1000;
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_LFS_POINTER_CEILING: u64 = 1024;
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastCommitSettings {
    /// Time-to-live of store entries, zero disables the cache
    pub ttl: Duration,
    /// Repositories with fewer commits than this skip the cache entirely
    pub commits_count: u64,
    /// Upper bound for a single store round-trip
    pub store_timeout: Duration,
}

impl Default for LastCommitSettings {
    fn default() -> Self {
        LastCommitSettings {
            ttl: DEFAULT_LAST_COMMIT_TTL,
            commits_count: DEFAULT_LAST_COMMIT_COMMITS,
            store_timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfsSettings {
    /// Largest blob size still considered a pointer candidate
    pub pointer_ceiling: u64,
    /// Buffer size of each pipe between scan stages
    pub pipe_capacity: usize,
}

impl Default for LfsSettings {
    fn default() -> Self {
        LfsSettings {
            pointer_ceiling: DEFAULT_LFS_POINTER_CEILING,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub git_binary: String,
    pub blob_buffer_threshold: u64,
    pub last_commit: LastCommitSettings,
    pub lfs: LfsSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            git_binary: "git".to_string(),
            blob_buffer_threshold: DEFAULT_BLOB_BUFFER_THRESHOLD,
            last_commit: LastCommitSettings::default(),
            lfs: LfsSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `GITCAT_*` environment variables
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Returns
    ///
    /// The settings, or an error naming the variable that failed to parse
    pub fn load_from_env() -> anyhow::Result<Self> {
        let mut settings = Settings::default();

        if let Ok(binary) = std::env::var("GITCAT_GIT_BINARY") {
            if !binary.trim().is_empty() {
                settings.git_binary = binary;
            }
        }
        if let Some(threshold) = Self::parse_var::<u64>("GITCAT_BLOB_BUFFER_THRESHOLD")? {
            settings.blob_buffer_threshold = threshold;
        }
        if let Some(seconds) = Self::parse_var::<u64>("GITCAT_LAST_COMMIT_TTL")? {
            settings.last_commit.ttl = Duration::from_secs(seconds);
        }
        if let Some(count) = Self::parse_var::<u64>("GITCAT_LAST_COMMIT_COMMITS")? {
            settings.last_commit.commits_count = count;
        }
        if let Some(millis) = Self::parse_var::<u64>("GITCAT_CACHE_TIMEOUT_MS")? {
            settings.last_commit.store_timeout = Duration::from_millis(millis);
        }
        if let Some(ceiling) = Self::parse_var::<u64>("GITCAT_LFS_POINTER_CEILING")? {
            settings.lfs.pointer_ceiling = ceiling;
        }
        if let Some(capacity) = Self::parse_var::<usize>("GITCAT_PIPE_CAPACITY")? {
            if capacity == 0 {
                anyhow::bail!("GITCAT_PIPE_CAPACITY must be greater than zero");
            }
            settings.lfs.pipe_capacity = capacity;
        }

        Ok(settings)
    }

    fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match std::env::var(name) {
            Ok(value) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .with_context(|| format!("{name} has an invalid value {value:?}")),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(err) => Err(err).with_context(|| format!("{name} is not valid unicode")),
        }
    }
}
