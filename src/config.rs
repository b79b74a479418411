//! Process-wide analysis settings
//!
//! One [`AnalyzerConfig`] is built at startup (from CLI flags and their
//! environment fallbacks in the binaries) and handed to every component that
//! needs it. Nothing in the library reads the environment on its own.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::analysis::DecoderOptions;

/// Default GitHub REST endpoint
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default base URL that `owner/name.git` is appended to for cloning
pub const DEFAULT_CLONE_BASE_URL: &str = "https://github.com";

#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Token sent to the metadata service and used for cloning, if any
    ///
    /// Without a token GitHub allows far fewer API requests per hour, but
    /// public repositories still work.
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub clone_base_url: String,
    /// Parent directory for per-request clones; system temp dir when `None`
    pub work_dir_base: Option<PathBuf>,

    pub max_commits: usize,
    pub max_line_bytes: usize,
    pub message_max_chars: usize,
    pub top_files_limit: usize,
    pub histogram_buckets: usize,
    pub top_discussions_limit: u8,
    pub discussion_lookback_days: i64,

    /// `--depth` for the clone; `None` fetches the full history
    pub clone_depth: Option<u32>,
    /// Emit the log oldest commit first
    pub oldest_first: bool,

    /// Deadline for acquisition plus decoding
    pub analysis_timeout: Duration,
    /// Per-request timeout of the metadata HTTP client
    pub metadata_timeout: Duration,
    pub cache_ttl: Duration,
}

impl AnalyzerConfig {
    /// Options handed to the commit-log decoder
    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions {
            max_line_bytes: self.max_line_bytes,
            max_commits: Some(self.max_commits),
            message_max_chars: self.message_max_chars,
        }
    }

    pub fn work_dir_base(&self) -> PathBuf {
        self.work_dir_base
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            clone_base_url: DEFAULT_CLONE_BASE_URL.to_string(),
            work_dir_base: None,
            max_commits: 50_000,
            max_line_bytes: 10 * 1024 * 1024,
            message_max_chars: 100,
            top_files_limit: 100,
            histogram_buckets: 10,
            top_discussions_limit: 5,
            discussion_lookback_days: 365,
            clone_depth: Some(1000),
            oldest_first: true,
            analysis_timeout: Duration::from_secs(300),
            metadata_timeout: Duration::from_secs(15),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("github_api_url", &self.github_api_url)
            .field("clone_base_url", &self.clone_base_url)
            .field("work_dir_base", &self.work_dir_base)
            .field("max_commits", &self.max_commits)
            .field("max_line_bytes", &self.max_line_bytes)
            .field("message_max_chars", &self.message_max_chars)
            .field("top_files_limit", &self.top_files_limit)
            .field("histogram_buckets", &self.histogram_buckets)
            .field("top_discussions_limit", &self.top_discussions_limit)
            .field("discussion_lookback_days", &self.discussion_lookback_days)
            .field("clone_depth", &self.clone_depth)
            .field("oldest_first", &self.oldest_first)
            .field("analysis_timeout", &self.analysis_timeout)
            .field("metadata_timeout", &self.metadata_timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// Command line flags shared by the binaries
#[derive(Args, Debug, Clone)]
pub struct AnalyzerArgs {
    /// GitHub API token for authentication (falls back to GITBACK_GITHUB_TOKEN)
    #[arg(short = 't', long, env = "GITBACK_GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub github_token: Option<String>,

    /// Directory for per-request clones
    /// Defaults to system temp directory if not specified
    #[arg(short = 'w', long = "work-dir", global = true)]
    pub work_dir: Option<PathBuf>,

    /// GitHub REST API endpoint
    #[arg(long, env = "GITBACK_GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL, global = true)]
    pub github_api_url: String,

    /// Commits analyzed per repository before the history is truncated
    #[arg(long, default_value_t = 50_000, global = true)]
    pub max_commits: usize,

    /// Clone depth; 0 fetches the full history
    #[arg(long, default_value_t = 1000, global = true)]
    pub clone_depth: u32,

    /// Seconds allowed for cloning plus decoding
    #[arg(long = "timeout", default_value_t = 300, global = true)]
    pub timeout_secs: u64,
}

impl AnalyzerArgs {
    pub fn to_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            github_token: self.github_token.clone().filter(|token| !token.is_empty()),
            github_api_url: self.github_api_url.clone(),
            work_dir_base: self.work_dir.clone(),
            max_commits: self.max_commits,
            clone_depth: (self.clone_depth > 0).then_some(self.clone_depth),
            analysis_timeout: Duration::from_secs(self.timeout_secs),
            ..AnalyzerConfig::default()
        }
    }
}
