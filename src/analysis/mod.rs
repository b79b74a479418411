//! Commit-log decoding and aggregation
//!
//! This module holds the CPU-bound core of the service:
//!
//! - [`commit_log`]: streaming decoder from `git log --numstat` text to commits
//! - [`aggregate`]: totals, contributors, file touch ranking and the lines histogram
//! - [`identity`]: validated `owner/name` keys
//! - [`models`]: the wire-facing data model
//! - [`error`]: the error taxonomy shared by the whole pipeline
//!
//! [`analyze_log`] fuses decoding and aggregation into one pass so commits are
//! never buffered twice.

pub mod aggregate;
pub mod commit_log;
pub mod error;
pub mod identity;
pub mod models;

pub use aggregate::{aggregate, Aggregator};
pub use commit_log::{CommitLogDecoder, DecodeSummary, DecodedLog, DecoderOptions};
pub use error::{AnalyzeError, DecodeError, ErrorKind, ValidationError};
pub use identity::RepositoryIdentity;
pub use models::*;

use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;

/// Outcome of one fused decode + aggregate pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogAnalysis {
    pub aggregate: AggregateResult,
    /// Commits in stream order, without their per-file detail
    pub commits: Vec<CommitRecord>,
    pub summary: DecodeSummary,
}

/// Decodes `reader` and aggregates each commit as soon as it is finalized
///
/// Either the whole stream is analyzed or an error is returned; no partial
/// result escapes on failure.
pub async fn analyze_log<R>(
    reader: R,
    options: DecoderOptions,
    top_files_limit: usize,
    histogram_buckets: usize,
    cancel: CancellationToken,
) -> Result<LogAnalysis, DecodeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut decoder = CommitLogDecoder::new(reader, options, cancel);
    let mut aggregator = Aggregator::new(top_files_limit, histogram_buckets);
    let mut commits = Vec::new();

    while let Some(commit) = decoder.next_commit().await? {
        aggregator.observe(&commit);
        commits.push(commit.record);
    }

    let summary = decoder.summary();
    Ok(LogAnalysis {
        aggregate: aggregator.finish(summary.truncated),
        commits,
        summary,
    })
}
