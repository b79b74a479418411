pub mod responses;

use rmcp::{model::*, schemars, tool, ServerHandler};

use crate::analysis::ErrorKind;
use crate::services::Analyzer;
use responses::{ErrorResponse, TopRepositoriesResponse};

/// Default and maximum length of the top repositories list
const DEFAULT_TOP_LIMIT: u32 = 10;
const MAX_TOP_LIMIT: u32 = 100;

/// Commit-history tools exposed through the MCP protocol
///
/// A thin wrapper around [`Analyzer`]. Every clone of the wrapper shares the
/// same analyzer, so the cache and the summary store are process-wide.
#[derive(Clone)]
pub struct GitbackTools {
    analyzer: Analyzer,
}

impl GitbackTools {
    pub fn new(analyzer: Analyzer) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }
}

#[tool(tool_box)]
impl ServerHandler for GitbackTools {
    /// Provides information about this MCP server
    fn get_info(&self) -> ServerInfo {
        let auth_status = match &self.analyzer.config().github_token {
            Some(_) => "Authenticated with GitHub token",
            None => "Not authenticated (rate limits apply)",
        };

        let instructions = format!(
            "# gitback Commit History Server

## Authentication Status
{}

## Available Tools
- `analyze_repository`: Line, contributor and file statistics over a repository's commit history
- `top_repositories`: Most viewed analyzed repositories

## Authentication
```
gitback stdio --github-token=your_token
export GITBACK_GITHUB_TOKEN=your_github_token
```

A token is optional for public repositories. It raises the GitHub API
rate limit and is required for private repositories.
",
            auth_status
        );

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(instructions),
        }
    }
}

#[tool(tool_box)]
impl GitbackTools {
    /// Analyze the commit history of a GitHub repository
    ///
    /// Clones the repository, decodes `git log --numstat` and aggregates it.
    /// Results are cached, so repeated calls for the same repository are cheap.
    #[tool(
        description = "Analyze the commit history of a GitHub repository. Returns total lines added and removed, contributor and commit counts, the most touched files, a lines-over-time histogram, the commit list, and (when available) stars, language, size and the most reacted-to recent pull requests. Histories longer than the server's commit cap are truncated and flagged with `truncated: true`. Example usage: `{\"name\": \"analyze_repository\", \"arguments\": {\"owner\": \"tokio-rs\", \"repo\": \"tokio\"}}`"
    )]
    async fn analyze_repository(
        &self,
        #[tool(param)]
        #[schemars(
            description = "Repository owner (required), e.g. 'rust-lang'. Letters, digits, '.', '_' and '-' only, at most 255 characters."
        )]
        owner: String,

        #[tool(param)]
        #[schemars(
            description = "Repository name (required), e.g. 'rust'. Letters, digits, '.', '_' and '-' only, at most 255 characters."
        )]
        repo: String,
    ) -> Result<String, String> {
        match self.analyzer.analyze(&owner, &repo).await {
            Ok(response) => serde_json::to_string(&response).map_err(|e| {
                tracing::error!("Failed to encode analysis: {}", e);
                ErrorResponse::new(ErrorKind::Internal, "Failed to encode analysis", None).to_json()
            }),
            Err(err) => {
                tracing::error!("Analysis of {}/{} failed: {}", owner, repo, err);
                Err(ErrorResponse::from_analyze_error(&err).to_json())
            }
        }
    }

    /// List the most viewed repositories analyzed by this server
    #[tool(
        description = "List the repositories analyzed by this server, most viewed first (ties broken by stars). Each entry holds the stored totals, histogram and GitHub metadata. Example usage: `{\"name\": \"top_repositories\", \"arguments\": {\"limit\": 5}}`"
    )]
    async fn top_repositories(
        &self,
        #[tool(param)]
        #[schemars(description = "Maximum number of repositories (optional, default is 10, max 100)")]
        limit: Option<u32>,
    ) -> Result<String, String> {
        let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT) as usize;

        let repositories = self.analyzer.top_repos(limit).await.map_err(|e| {
            tracing::error!("Failed to read top repositories: {}", e);
            ErrorResponse::new(ErrorKind::Internal, "Failed to read top repositories", None)
                .to_json()
        })?;

        serde_json::to_string(&TopRepositoriesResponse { repositories }).map_err(|e| {
            ErrorResponse::new(ErrorKind::Internal, "Failed to encode response", Some(e.to_string()))
                .to_json()
        })
    }
}
