use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fixed names the binaries read from and write to.
pub const INPUT_DIR: &str = "zst_files";
pub const DB_PATH: &str = "reddit_data.db";

/// Options for the archive import passes, with builder chaining.
#[derive(Clone, Debug)]
pub struct ImportOptions {
    pub input_dir: PathBuf,
    pub db_path: PathBuf,
    pub batch_size: usize,          // rows per upsert transaction
    pub read_buffer_bytes: usize,   // decompressed read chunk
    pub window_log_max: u32,        // zstd frames may declare windows above the default limit
    pub error_sample_limit: u64,    // how many bad records get logged in detail per file
    pub progress: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(INPUT_DIR),
            db_path: PathBuf::from(DB_PATH),
            batch_size: 100_000,
            read_buffer_bytes: 16 * 1024,
            window_log_max: 31,
            error_sample_limit: 10,
            progress: true,
        }
    }
}

impl ImportOptions {
    pub fn with_input_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.input_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_db_path(mut self, path: impl AsRef<Path>) -> Self {
        self.db_path = path.as_ref().to_path_buf();
        self
    }
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }
    pub fn with_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(4 * 1024);
        self
    }
    pub fn with_window_log_max(mut self, log: u32) -> Self {
        self.window_log_max = log;
        self
    }
    pub fn with_error_sample_limit(mut self, n: u64) -> Self {
        self.error_sample_limit = n;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
}

/// Options for the profile enrichment loop.
#[derive(Clone, Debug)]
pub struct EnrichOptions {
    pub db_path: PathBuf,
    pub batch_size: usize,  // successes + failures per commit
    pub pause: Duration,    // sleep after each committed batch
    pub progress: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DB_PATH),
            batch_size: 100,
            pause: Duration::from_millis(300),
            progress: true,
        }
    }
}

impl EnrichOptions {
    pub fn with_db_path(mut self, path: impl AsRef<Path>) -> Self {
        self.db_path = path.as_ref().to_path_buf();
        self
    }
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
}

/// Script-app credentials for the Reddit API.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl RedditCredentials {
    /// Reads `REDDIT_ID`, `REDDIT_SECRET` and optionally `REDDIT_USER_AGENT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        match (non_empty("REDDIT_ID"), non_empty("REDDIT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Ok(Self {
                client_id,
                client_secret,
                user_agent: non_empty("REDDIT_USER_AGENT").unwrap_or_else(|| "userinfo_script".to_string()),
            }),
            _ => bail!(
                "REDDIT_ID and REDDIT_SECRET environment variables not set.\n\
                 Please set them before running:\n  \
                 export REDDIT_ID='your_client_id'\n  \
                 export REDDIT_SECRET='your_client_secret'"
            ),
        }
    }
}
