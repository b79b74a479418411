use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::MetadataService;
use crate::analysis::error::MetadataError;
use crate::analysis::{DiscussionSummary, RepositoryIdentity, RepositoryInfo};
use crate::config::AnalyzerConfig;

const USER_AGENT: &str = concat!(
    "gitback/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/tacogips/gitback)"
);
const ACCEPT: &str = "application/vnd.github.v3+json";

/// GitHub REST client for repository info and top pull requests
///
/// Top discussions are pull requests created within the configured lookback
/// window, ranked by GitHub's reaction count.
#[derive(Clone)]
pub struct GithubMetadataClient {
    client: Client,
    api_url: String,
    github_token: Option<String>,
    lookback_days: i64,
}

/// GitHub-specific repository payload
#[derive(Debug, Deserialize)]
struct GitHubRepository {
    #[serde(default)]
    stargazers_count: u64,
    language: Option<String>,
    /// Kilobytes
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct GitHubIssueSearchResponse {
    #[serde(default)]
    items: Vec<GitHubPullRequestItem>,
}

#[derive(Debug, Deserialize)]
struct GitHubPullRequestItem {
    id: u64,
    number: u64,
    title: String,
    user: Option<GitHubUser>,
    created_at: String,
    state: String,
    html_url: String,
    #[serde(default)]
    comments: u64,
    reactions: Option<GitHubReactions>,
    pull_request: Option<GitHubPullRequestRef>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubReactions {
    #[serde(default)]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct GitHubPullRequestRef {
    merged_at: Option<String>,
}

impl GithubMetadataClient {
    /// Builds a client with the configured endpoint, token and timeout
    ///
    /// # Returns
    ///
    /// * `Result<Self, MetadataError>` - Fails only if the HTTP client cannot be constructed
    pub fn new(config: &AnalyzerConfig) -> Result<Self, MetadataError> {
        let client = Client::builder().timeout(config.metadata_timeout).build()?;
        Ok(Self::with_client(
            client,
            &config.github_api_url,
            config.github_token.clone(),
            config.discussion_lookback_days,
        ))
    }

    pub fn with_client(
        client: Client,
        api_url: &str,
        github_token: Option<String>,
        lookback_days: i64,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            github_token,
            lookback_days,
        }
    }

    fn repository_url(&self, identity: &RepositoryIdentity) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_url,
            urlencoding::encode(identity.owner()),
            urlencoding::encode(identity.name())
        )
    }

    /// Search URL for pull requests created on or after `since` (`YYYY-MM-DD`)
    fn top_pull_requests_url(&self, identity: &RepositoryIdentity, since: &str, limit: u8) -> String {
        let query = format!("repo:{} type:pr created:>={}", identity.key(), since);
        format!(
            "{}/search/issues?q={}&sort=reactions&order=desc&per_page={}",
            self.api_url,
            urlencoding::encode(&query),
            limit.min(100)
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, MetadataError> {
        let mut req_builder = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", ACCEPT);

        if let Some(token) = self.github_token.as_ref() {
            req_builder = req_builder.header("Authorization", format!("token {}", token));
        }

        let response = req_builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(text) => text,
                Err(_) => "Unknown error".to_string(),
            };
            return Err(MetadataError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MetadataService for GithubMetadataClient {
    async fn fetch_repo_info(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<RepositoryInfo, MetadataError> {
        let repository: GitHubRepository = self.get_json(self.repository_url(identity)).await?;

        Ok(RepositoryInfo {
            stars: repository.stargazers_count,
            language: repository.language,
            size_kb: repository.size,
        })
    }

    async fn fetch_top_discussions(
        &self,
        identity: &RepositoryIdentity,
        limit: u8,
    ) -> Result<Vec<DiscussionSummary>, MetadataError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let since = (chrono::Utc::now() - chrono::Duration::days(self.lookback_days))
            .format("%Y-%m-%d")
            .to_string();
        let url = self.top_pull_requests_url(identity, &since, limit);
        let response: GitHubIssueSearchResponse = self.get_json(url).await?;

        // Convert to our domain model
        Ok(response
            .items
            .into_iter()
            .take(usize::from(limit))
            .map(|item| DiscussionSummary {
                id: item.id,
                number: item.number,
                title: item.title,
                author: item.user.map(|user| user.login).unwrap_or_default(),
                created_at: item.created_at,
                state: item.state,
                html_url: item.html_url,
                comments: item.comments,
                reactions: item.reactions.map(|r| r.total_count).unwrap_or(0),
                merged: item
                    .pull_request
                    .and_then(|pr| pr.merged_at)
                    .is_some(),
            })
            .collect())
    }
}
