//! Request orchestration
//!
//! [`Analyzer`] runs one analysis end to end:
//!
//! 1. validate the repository identity
//! 2. answer from the cache when possible (and count a view)
//! 3. acquire the commit log and decode + aggregate it in a single pass,
//!    bounded by the analysis deadline
//! 4. release the log stream
//! 5. fetch repository info and top discussions concurrently
//! 6. return the response and persist it in background tasks
//!
//! All collaborators are passed in explicitly, which keeps the analyzer free of
//! global state and lets tests substitute every port.

pub mod background;

pub use background::BackgroundTasks;

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::analysis::error::{MetadataError, StoreError};
use crate::analysis::{
    analyze_log, AnalysisResponse, AnalyzeError, EnrichmentResult, LogAnalysis,
    RepositoryIdentity,
};
use crate::config::AnalyzerConfig;
use crate::metadata::{GithubMetadataClient, MetadataService};
use crate::repository_source::{GitLogSource, LogSource};
use crate::storage::{AnalysisCache, MemoryCache, MemorySummaryStore, RepoSummary, SummaryStore};

/// Commit-history analysis service
#[derive(Clone)]
pub struct Analyzer {
    config: Arc<AnalyzerConfig>,
    source: Arc<dyn LogSource>,
    metadata: Arc<dyn MetadataService>,
    cache: Arc<dyn AnalysisCache>,
    store: Arc<dyn SummaryStore>,
    background: BackgroundTasks,
}

impl Analyzer {
    pub fn new(
        config: AnalyzerConfig,
        source: Arc<dyn LogSource>,
        metadata: Arc<dyn MetadataService>,
        cache: Arc<dyn AnalysisCache>,
        store: Arc<dyn SummaryStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            source,
            metadata,
            cache,
            store,
            background: BackgroundTasks::new(),
        }
    }

    /// Production wiring: `git` CLI, GitHub REST API and in-process stores
    ///
    /// # Returns
    ///
    /// * `Result<Self, MetadataError>` - Fails only if the HTTP client cannot be built
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, MetadataError> {
        let source = Arc::new(GitLogSource::new(&config));
        let metadata = Arc::new(GithubMetadataClient::new(&config)?);
        let cache = Arc::new(MemoryCache::new(config.cache_ttl));
        let store = Arc::new(MemorySummaryStore::new());
        Ok(Self::new(config, source, metadata, cache, store))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyzes `owner/repo`
    ///
    /// # Parameters
    ///
    /// * `owner` - Repository owner, e.g. `rust-lang`
    /// * `repo` - Repository name, e.g. `rust`
    ///
    /// # Returns
    ///
    /// * `Result<AnalysisResponse, AnalyzeError>` - The full statistics, or an
    ///   error whose [`kind`](AnalyzeError::kind) tells validation, not-found,
    ///   timeout and internal failures apart
    pub async fn analyze(&self, owner: &str, repo: &str) -> Result<AnalysisResponse, AnalyzeError> {
        self.analyze_with_cancel(owner, repo, CancellationToken::new())
            .await
    }

    /// Same as [`analyze`](Self::analyze), aborting when `cancel` fires
    ///
    /// Cancelling stops acquisition and decoding promptly and releases the
    /// log stream. Background persistence of earlier requests is unaffected.
    pub async fn analyze_with_cancel(
        &self,
        owner: &str,
        repo: &str,
        cancel: CancellationToken,
    ) -> Result<AnalysisResponse, AnalyzeError> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("analyze", %request_id, owner = %owner, repo = %repo);
        self.run(owner, repo, cancel).instrument(span).await
    }

    /// Repositories with the most views, ties broken by stars
    pub async fn top_repos(&self, limit: usize) -> Result<Vec<RepoSummary>, StoreError> {
        self.store.top_repos(limit).await
    }

    /// Waits for pending persistence, then keeps accepting requests
    pub async fn wait_for_background(&self) {
        self.background.wait_idle().await;
    }

    /// Waits for pending persistence before the process exits
    pub async fn shutdown(&self) {
        tracing::debug!(pending = self.background.len(), "draining background tasks");
        self.background.shutdown().await;
    }

    async fn run(
        &self,
        owner: &str,
        repo: &str,
        cancel: CancellationToken,
    ) -> Result<AnalysisResponse, AnalyzeError> {
        let started = Instant::now();

        let identity = RepositoryIdentity::new(owner, repo).inspect_err(|e| {
            tracing::warn!("rejected repository identity: {}", e);
        })?;

        if let Some(cached) = self.cached(&identity).await {
            tracing::info!("serving cached analysis");
            self.spawn_view_count(&identity);
            return Ok(cached);
        }

        let analysis = self.acquire_and_analyze(&identity, &cancel).await?;
        self.log_decode_fallbacks(&analysis);

        let enrich_started = Instant::now();
        let enrichment = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AnalyzeError::Cancelled),
            enrichment = self.enrich(&identity) => enrichment,
        };
        tracing::debug!(
            elapsed_ms = enrich_started.elapsed().as_millis() as u64,
            degraded = enrichment.is_degraded(),
            "enrichment finished"
        );

        let response = AnalysisResponse {
            repository: identity,
            aggregate: analysis.aggregate,
            enrichment,
            commits: analysis.commits,
        };

        self.spawn_persistence(&response);

        tracing::info!(
            commits = response.aggregate.total_commits,
            contributors = response.aggregate.total_contributors,
            truncated = response.aggregate.truncated,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis complete"
        );
        Ok(response)
    }

    async fn cached(&self, identity: &RepositoryIdentity) -> Option<AnalysisResponse> {
        match self.cache.get(identity).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("cache read failed, analyzing instead: {}", e);
                None
            }
        }
    }

    /// Acquire plus decode, under the analysis deadline
    async fn acquire_and_analyze(
        &self,
        identity: &RepositoryIdentity,
        cancel: &CancellationToken,
    ) -> Result<LogAnalysis, AnalyzeError> {
        let deadline = self.config.analysis_timeout;
        let work = cancel.child_token();

        match tokio::time::timeout(deadline, self.decode_repository(identity, work.clone())).await {
            Ok(result) => result,
            Err(_) => {
                work.cancel();
                tracing::warn!(
                    timeout_secs = deadline.as_secs(),
                    "analysis deadline exceeded"
                );
                Err(AnalyzeError::Timeout(deadline.as_secs()))
            }
        }
    }

    async fn decode_repository(
        &self,
        identity: &RepositoryIdentity,
        cancel: CancellationToken,
    ) -> Result<LogAnalysis, AnalyzeError> {
        let acquire_started = Instant::now();
        let mut stream = self.source.acquire(identity, &cancel).await.inspect_err(|e| {
            tracing::warn!("failed to acquire commit log: {}", e);
        })?;
        tracing::debug!(
            elapsed_ms = acquire_started.elapsed().as_millis() as u64,
            "commit log acquired"
        );

        let decode_started = Instant::now();
        let decoded = analyze_log(
            stream.reader(),
            self.config.decoder_options(),
            self.config.top_files_limit,
            self.config.histogram_buckets,
            cancel,
        )
        .await;

        let outcome = match decoded {
            // The producer may still be writing past the cap; release kills it
            Ok(analysis) if analysis.summary.truncated => Ok(analysis),
            Ok(analysis) => stream
                .finish()
                .await
                .map(|()| analysis)
                .map_err(AnalyzeError::from),
            Err(e) => Err(AnalyzeError::from(e)),
        };
        let shallow_depth = stream.shallow_depth();
        stream.release().await;
        let outcome = outcome.map(|analysis| mark_shallow_history(analysis, shallow_depth));

        match &outcome {
            Ok(analysis) => tracing::debug!(
                elapsed_ms = decode_started.elapsed().as_millis() as u64,
                lines = analysis.summary.lines_read,
                commits = analysis.summary.commits,
                "commit log decoded"
            ),
            Err(e) => tracing::warn!("failed to decode commit log: {}", e),
        }
        outcome
    }

    fn log_decode_fallbacks(&self, analysis: &LogAnalysis) {
        let summary = &analysis.summary;
        if summary.truncated {
            tracing::warn!(
                max_commits = self.config.max_commits,
                "history truncated at the commit cap"
            );
        }
        if summary.timestamp_fallbacks > 0 {
            tracing::warn!(
                count = summary.timestamp_fallbacks,
                "commit timestamps could not be parsed and were replaced with the current time"
            );
        }
        if summary.unparsable_counts > 0 || summary.unrecognized_lines > 0 {
            tracing::debug!(
                unparsable_counts = summary.unparsable_counts,
                unrecognized_lines = summary.unrecognized_lines,
                "skipped malformed log content"
            );
        }
    }

    /// Repository info and top discussions, fetched concurrently
    ///
    /// A failed fetch leaves its field empty.
    async fn enrich(&self, identity: &RepositoryIdentity) -> EnrichmentResult {
        let (repository, top_discussions) = tokio::join!(
            self.metadata.fetch_repo_info(identity),
            self.metadata
                .fetch_top_discussions(identity, self.config.top_discussions_limit),
        );

        EnrichmentResult {
            repository: repository
                .inspect_err(|e| tracing::warn!("failed to fetch repository info: {}", e))
                .ok(),
            top_discussions: top_discussions
                .inspect_err(|e| tracing::warn!("failed to fetch top discussions: {}", e))
                .ok(),
        }
    }

    fn spawn_view_count(&self, identity: &RepositoryIdentity) {
        let store = Arc::clone(&self.store);
        let identity = identity.clone();
        self.background.spawn("increment_views", async move {
            store.increment_views(&identity).await
        });
    }

    /// Writes the response to the cache and the summary store
    ///
    /// Runs after the response exists; nothing here can change it.
    fn spawn_persistence(&self, response: &AnalysisResponse) {
        let cache = Arc::clone(&self.cache);
        let identity = response.repository.clone();
        let cached = response.clone();
        self.background.spawn("cache_put", async move {
            cache.put(&identity, &cached).await
        });

        let store = Arc::clone(&self.store);
        let identity = response.repository.clone();
        let summary = RepoSummary::from_response(response);
        self.background.spawn("save_summary", async move {
            store.upsert_summary(summary).await?;
            store.increment_views(&identity).await
        });
    }
}

/// Flags the result as truncated when the log ended at a shallow clone's depth
fn mark_shallow_history(mut analysis: LogAnalysis, shallow_depth: Option<usize>) -> LogAnalysis {
    if let Some(depth) = shallow_depth {
        if analysis.commits.len() >= depth && !analysis.aggregate.truncated {
            tracing::warn!(depth, "history truncated at the clone depth");
            analysis.aggregate.truncated = true;
        }
    }
    analysis
}
