//! Persistence ports: the analysis cache and the repository summary store
//!
//! Both are written only from background tasks after a response has been
//! produced. Read failures are treated as a cache miss by the analyzer.

mod memory;

pub use memory::{MemoryCache, MemorySummaryStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::error::StoreError;
use crate::analysis::{AnalysisResponse, HistogramBucket, RepositoryIdentity};

/// Full analysis responses keyed by repository
#[async_trait]
pub trait AnalysisCache: Send + Sync {
    /// `Ok(None)` on a miss, including an expired entry
    async fn get(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<Option<AnalysisResponse>, StoreError>;

    async fn put(
        &self,
        identity: &RepositoryIdentity,
        response: &AnalysisResponse,
    ) -> Result<(), StoreError>;
}

/// Per-repository summary rows with a view counter
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Inserts or replaces the statistics of a repository, keeping its view count
    async fn upsert_summary(&self, summary: RepoSummary) -> Result<(), StoreError>;

    /// Adds one view; a repository without a summary is left alone
    async fn increment_views(&self, identity: &RepositoryIdentity) -> Result<(), StoreError>;

    /// Most viewed repositories first, ties broken by stars
    async fn top_repos(&self, limit: usize) -> Result<Vec<RepoSummary>, StoreError>;
}

/// Stored summary of the latest analysis of a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub owner: String,
    pub name: String,
    pub total_additions: u64,
    pub total_removals: u64,
    pub total_lines: i64,
    pub total_commits: usize,
    pub total_contributors: usize,
    pub lines_histogram: Vec<HistogramBucket>,
    pub stars: Option<u64>,
    pub language: Option<String>,
    #[serde(rename = "sizeKB")]
    pub size_kb: Option<u64>,
    pub views: u64,
    pub updated_at: DateTime<Utc>,
}

impl RepoSummary {
    /// Summary of a fresh analysis, with no views yet
    pub fn from_response(response: &AnalysisResponse) -> Self {
        let aggregate = &response.aggregate;
        let info = response.enrichment.repository.as_ref();

        Self {
            owner: response.repository.owner().to_string(),
            name: response.repository.name().to_string(),
            total_additions: aggregate.total_added,
            total_removals: aggregate.total_removed,
            total_lines: aggregate.total_lines(),
            total_commits: aggregate.total_commits,
            total_contributors: aggregate.total_contributors,
            lines_histogram: aggregate.lines_histogram.clone(),
            stars: info.map(|info| info.stars),
            language: info.and_then(|info| info.language.clone()),
            size_kb: info.map(|info| info.size_kb),
            views: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}
