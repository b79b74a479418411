use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{self, EnvFilter};

use gitback::analysis::{analyze_log, AggregateResult, CommitRecord, DecodeSummary, RepositoryIdentity};
use gitback::config::AnalyzerArgs;
use gitback::services::Analyzer;
use gitback::tools::responses::ErrorResponse;

#[derive(Parser)]
#[command(author, version = "0.1.0", about = "gitback CLI for commit history statistics", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    analyzer: AnalyzerArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze GitHub repositories and print the results as JSON
    Analyze {
        #[arg(
            required = true,
            help = "Repositories to analyze - 'owner/name', 'github:owner/name' or 'https://github.com/owner/name'"
        )]
        repositories: Vec<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Decode and aggregate a saved `git log --numstat --format=%H|%an|%at|%s` output
    Stats {
        /// Log file to read; standard input when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Include the decoded commit list
        #[arg(long)]
        with_commits: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Analyze repositories, then print them ranked by views and stars
    Top {
        #[arg(required = true, help = "Repositories to analyze before ranking")]
        repositories: Vec<String>,

        /// Number of repositories to print
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

/// Output of the stats command
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOutput {
    #[serde(flatten)]
    aggregate: AggregateResult,
    decode: DecodeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    commits: Option<Vec<CommitRecord>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr) // Use stderr for logging
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = cli.analyzer.to_config();
    tracing::debug!(?config, "gitback CLI initialized");

    match cli.command {
        Commands::Analyze {
            repositories,
            pretty,
        } => {
            let analyzer = Analyzer::from_config(config)?;
            let mut failures = 0;

            for repository in &repositories {
                match analyze_repository(&analyzer, repository).await {
                    Ok(response) => print_json(&response, pretty)?,
                    Err(envelope) => {
                        failures += 1;
                        eprintln!("{}", envelope.to_json());
                    }
                }
            }

            analyzer.shutdown().await;
            if failures > 0 {
                anyhow::bail!("{} of {} analyses failed", failures, repositories.len());
            }
            Ok(())
        }
        Commands::Stats {
            file,
            with_commits,
            pretty,
        } => {
            let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &file {
                Some(path) => {
                    let file = tokio::fs::File::open(path)
                        .await
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    Box::new(BufReader::new(file))
                }
                None => Box::new(BufReader::new(tokio::io::stdin())),
            };

            let analysis = analyze_log(
                reader,
                config.decoder_options(),
                config.top_files_limit,
                config.histogram_buckets,
                CancellationToken::new(),
            )
            .await
            .context("Failed to decode commit log")?;

            if analysis.summary.timestamp_fallbacks > 0 {
                tracing::warn!(
                    "{} commit timestamps could not be parsed and were replaced with the current time",
                    analysis.summary.timestamp_fallbacks
                );
            }

            let output = StatsOutput {
                aggregate: analysis.aggregate,
                decode: analysis.summary,
                commits: with_commits.then_some(analysis.commits),
            };
            print_json(&output, pretty)
        }
        Commands::Top {
            repositories,
            limit,
        } => {
            let analyzer = Analyzer::from_config(config)?;

            for repository in &repositories {
                if let Err(envelope) = analyze_repository(&analyzer, repository).await {
                    eprintln!("{}", envelope.to_json());
                }
            }

            // Summaries are written in the background
            analyzer.wait_for_background().await;
            let repositories = analyzer.top_repos(limit).await?;

            for (i, summary) in repositories.iter().enumerate() {
                println!(
                    "{}. {}/{} - {} views, {} stars, {} commits, {} contributors",
                    i + 1,
                    summary.owner,
                    summary.name,
                    summary.views,
                    summary.stars.unwrap_or(0),
                    summary.total_commits,
                    summary.total_contributors
                );
            }
            analyzer.shutdown().await;
            Ok(())
        }
    }
}

async fn analyze_repository(
    analyzer: &Analyzer,
    reference: &str,
) -> std::result::Result<gitback::analysis::AnalysisResponse, ErrorResponse> {
    let identity: RepositoryIdentity = reference.parse().map_err(|e| {
        ErrorResponse::from_analyze_error(&gitback::analysis::AnalyzeError::Validation(e))
    })?;

    analyzer
        .analyze(identity.owner(), identity.name())
        .await
        .map_err(|e| {
            tracing::error!("Analysis of {} failed: {}", identity, e);
            ErrorResponse::from_analyze_error(&e)
        })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
