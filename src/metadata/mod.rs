//! Repository metadata used to enrich an analysis
//!
//! Enrichment is best-effort. A failing [`MetadataService`] call leaves its
//! field of the response empty and never fails the analysis.

mod github;

pub use github::GithubMetadataClient;

use async_trait::async_trait;

use crate::analysis::error::MetadataError;
use crate::analysis::{DiscussionSummary, RepositoryIdentity, RepositoryInfo};

#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Stars, primary language and size of the repository
    async fn fetch_repo_info(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<RepositoryInfo, MetadataError>;

    /// The most reacted-to recent discussions, at most `limit` of them
    async fn fetch_top_discussions(
        &self,
        identity: &RepositoryIdentity,
        limit: u8,
    ) -> Result<Vec<DiscussionSummary>, MetadataError>;
}
