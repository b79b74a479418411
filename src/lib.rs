//! gitback: commit history statistics for GitHub repositories
//!
//! This library turns a repository's `git log --numstat` output into line,
//! contributor and file statistics, enriches them with GitHub metadata, and
//! serves the result through Model Context Protocol (MCP) tools.
//!
//! ## Features
//!
//! - Streaming commit-log decoding with bounded memory per line
//! - Totals, contributor count, most touched files and a lines histogram
//! - Repository info and most reacted-to pull requests from the GitHub API
//! - In-process response cache and a per-repository summary store with view counts
//!
//! ## Authentication
//!
//! GitHub operations work without a token for public repositories. A token
//! raises the API rate limit and allows cloning private repositories.
//!
//! ```bash
//! # Set GitHub token for authentication (optional)
//! export GITBACK_GITHUB_TOKEN=your_github_token
//! ```
//!
//! ## Usage
//!
//! - As an MCP server (`gitback stdio` or `gitback http`)
//! - From the terminal (`gitback-cli analyze owner/name`)
//! - Directly as a Rust library:
//!
//! ```no_run
//! use gitback::config::AnalyzerConfig;
//! use gitback::services::Analyzer;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let analyzer = Analyzer::from_config(AnalyzerConfig::default())?;
//!     let response = analyzer.analyze("tokio-rs", "tokio").await?;
//!     println!("{} commits", response.aggregate.total_commits);
//!     analyzer.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod metadata;
pub mod repository_source;
pub mod services;
pub mod storage;
pub mod tools;
pub mod transport;
