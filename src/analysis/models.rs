//! Domain models produced by the analysis pipeline
//!
//! Field names are serialized in camelCase because these structs are the
//! wire format consumed by the web client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::identity::RepositoryIdentity;

/// One decoded commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Commit hash as printed by the log
    pub hash: String,

    /// Free-text author display name, used verbatim as the contributor key
    pub author: String,

    /// Seconds since the Unix epoch
    ///
    /// When the log carries an unparsable value this is the wall-clock time at
    /// decode, and the fallback is counted in the decode summary.
    #[serde(rename = "date")]
    pub timestamp: i64,

    /// Subject line, cut to the configured length with a `...` marker
    pub message: String,

    pub added: u64,
    pub removed: u64,

    /// Number of numstat lines attributed to this commit
    pub files_touched_count: u64,
}

/// One numstat line: counts for a single file within a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    /// `None` when the log reported `-` (binary file)
    pub added: Option<u64>,
    pub removed: Option<u64>,
}

/// A finalized commit together with the files it touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCommit {
    pub record: CommitRecord,
    pub files: Vec<FileChange>,
}

/// Touch count for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTouchCount {
    pub file: String,
    pub count: u64,
}

/// Lines added/removed over a contiguous range of commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBucket {
    /// Index of the first commit in the bucket
    pub start_commit: usize,
    /// Index one past the last commit in the bucket
    pub end_commit: usize,
    pub added: u64,
    pub removed: u64,
    /// Running `added - removed` from the first commit through this bucket
    pub cumulative_lines: i64,
}

/// Statistics over the decoded commit sequence
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub total_added: u64,
    pub total_removed: u64,
    pub total_contributors: usize,
    pub total_commits: usize,
    pub file_touch_counts: BTreeMap<String, u64>,
    #[serde(rename = "mostTouchedFiles")]
    pub top_files: Vec<FileTouchCount>,
    pub lines_histogram: Vec<HistogramBucket>,
    /// Set when decoding stopped at the commit cap or the log ended at a
    /// shallow clone's depth
    pub truncated: bool,
}

impl AggregateResult {
    /// Net line count, `total_added - total_removed`, saturating at the `i64` bounds
    pub fn total_lines(&self) -> i64 {
        let added = i64::try_from(self.total_added).unwrap_or(i64::MAX);
        let removed = i64::try_from(self.total_removed).unwrap_or(i64::MAX);
        added.saturating_sub(removed)
    }
}

/// Repository attributes from the metadata service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub stars: u64,
    pub language: Option<String>,
    #[serde(rename = "sizeKB")]
    pub size_kb: u64,
}

/// Summary of one discussion thread (a pull request on GitHub)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionSummary {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: String,
    pub state: String,
    pub html_url: String,
    pub comments: u64,
    pub reactions: u64,
    pub merged: bool,
}

/// Best-effort enrichment; either part is `None` when its fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    #[serde(rename = "github")]
    pub repository: Option<RepositoryInfo>,
    #[serde(rename = "pullRequests")]
    pub top_discussions: Option<Vec<DiscussionSummary>>,
}

impl EnrichmentResult {
    /// True when at least one part is missing
    pub fn is_degraded(&self) -> bool {
        self.repository.is_none() || self.top_discussions.is_none()
    }
}

/// The externally visible result of one analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub repository: RepositoryIdentity,
    #[serde(flatten)]
    pub aggregate: AggregateResult,
    #[serde(flatten)]
    pub enrichment: EnrichmentResult,
    pub commits: Vec<CommitRecord>,
}
