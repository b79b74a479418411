//! Tests for the `git` CLI log source against local fixture repositories
//!
//! These tests are skipped when no `git` executable is available.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use gitback::analysis::error::{AcquireError, MetadataError};
use gitback::analysis::{analyze_log, DiscussionSummary, RepositoryIdentity, RepositoryInfo};
use gitback::config::AnalyzerConfig;
use gitback::metadata::MetadataService;
use gitback::repository_source::{GitLogSource, LogSource};
use gitback::services::Analyzer;
use gitback::storage::{MemoryCache, MemorySummaryStore};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Metadata service without network access
struct OfflineMetadata;

#[async_trait]
impl MetadataService for OfflineMetadata {
    async fn fetch_repo_info(
        &self,
        _identity: &RepositoryIdentity,
    ) -> Result<RepositoryInfo, MetadataError> {
        Err(MetadataError::Url("offline".to_string()))
    }

    async fn fetch_top_discussions(
        &self,
        _identity: &RepositoryIdentity,
        _limit: u8,
    ) -> Result<Vec<DiscussionSummary>, MetadataError> {
        Err(MetadataError::Url("offline".to_string()))
    }
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str], timestamp: i64) {
    let date = format!("{} +0000", timestamp);
    let status = Command::new("git")
        .current_dir(dir)
        .args([
            "-c",
            "user.name=Test Author",
            "-c",
            "user.email=author@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "init.defaultBranch=main",
        ])
        .args(args)
        .env("GIT_AUTHOR_DATE", &date)
        .env("GIT_COMMITTER_DATE", &date)
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {:?} failed", args);
}

/// Creates `<base>/octo/widgets.git` with two commits
fn fixture_repository(base: &Path) -> PathBuf {
    let repo = base.join("octo").join("widgets.git");
    std::fs::create_dir_all(&repo).unwrap();

    git(&repo, &["init", "--quiet"], 1_700_000_000);

    std::fs::write(repo.join("a.txt"), "one\ntwo\nthree\n").unwrap();
    git(&repo, &["add", "a.txt"], 1_700_000_000);
    git(&repo, &["commit", "--quiet", "-m", "first"], 1_700_000_000);

    std::fs::write(repo.join("a.txt"), "one\nTWO\nthree\n").unwrap();
    std::fs::write(repo.join("b.txt"), "alpha\nbeta\n").unwrap();
    git(&repo, &["add", "a.txt", "b.txt"], 1_700_000_500);
    git(&repo, &["commit", "--quiet", "-m", "second"], 1_700_000_500);

    repo
}

/// Creates `<base>/octo/history.git` with `commits` linear commits
fn linear_repository(base: &Path, commits: usize) {
    let repo = base.join("octo").join("history.git");
    std::fs::create_dir_all(&repo).unwrap();
    git(&repo, &["init", "--quiet"], 1_700_000_000);

    let mut content = String::new();
    for i in 0..commits {
        let timestamp = 1_700_000_000 + i as i64 * 60;
        content.push_str(&format!("line {}\n", i));
        std::fs::write(repo.join("log.txt"), &content).unwrap();
        git(&repo, &["add", "log.txt"], timestamp);
        git(&repo, &["commit", "--quiet", "-m", &format!("commit {}", i)], timestamp);
    }
}

fn analyzer_for(config: AnalyzerConfig) -> Analyzer {
    Analyzer::new(
        config.clone(),
        Arc::new(GitLogSource::new(&config)),
        Arc::new(OfflineMetadata),
        Arc::new(MemoryCache::new(config.cache_ttl)),
        Arc::new(MemorySummaryStore::new()),
    )
}

struct Fixture {
    _remote: TempDir,
    work: TempDir,
    source: GitLogSource,
    config: AnalyzerConfig,
}

fn fixture() -> Fixture {
    let remote = TempDir::new().unwrap();
    fixture_repository(remote.path());
    let work = TempDir::new().unwrap();

    let config = AnalyzerConfig {
        clone_base_url: format!("file://{}", remote.path().display()),
        work_dir_base: Some(work.path().to_path_buf()),
        ..AnalyzerConfig::default()
    };
    let source = GitLogSource::new(&config);

    Fixture {
        _remote: remote,
        work,
        source,
        config,
    }
}

fn leftover_clones(work_dir: &Path) -> usize {
    std::fs::read_dir(work_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| {
                    entry
                        .file_name()
                        .to_string_lossy()
                        .starts_with("gitback-analysis-")
                })
                .count()
        })
        .unwrap_or(0)
}

#[tokio::test]
async fn test_decodes_local_repository() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let f = fixture();
    let identity = RepositoryIdentity::new("octo", "widgets").unwrap();

    let mut stream = f
        .source
        .acquire(&identity, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(leftover_clones(f.work.path()), 1);

    let analysis = analyze_log(
        stream.reader(),
        f.config.decoder_options(),
        f.config.top_files_limit,
        f.config.histogram_buckets,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    stream.finish().await.unwrap();
    stream.release().await;

    // Oldest commit first
    let messages: Vec<&str> = analysis.commits.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second"]);
    assert_eq!(analysis.commits[0].author, "Test Author");
    assert_eq!(analysis.commits[0].timestamp, 1_700_000_000);
    assert_eq!(analysis.commits[1].files_touched_count, 2);

    assert_eq!(analysis.aggregate.total_added, 6);
    assert_eq!(analysis.aggregate.total_removed, 1);
    assert_eq!(analysis.aggregate.total_contributors, 1);
    assert_eq!(analysis.aggregate.file_touch_counts["a.txt"], 2);
    assert!(!analysis.aggregate.truncated);

    assert_eq!(leftover_clones(f.work.path()), 0);
}

#[tokio::test]
async fn test_commit_cap_against_real_log() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let f = fixture();
    let config = AnalyzerConfig {
        max_commits: 1,
        ..f.config.clone()
    };
    let source = GitLogSource::new(&config);
    let identity = RepositoryIdentity::new("octo", "widgets").unwrap();

    let mut stream = source
        .acquire(&identity, &CancellationToken::new())
        .await
        .unwrap();
    let analysis = analyze_log(
        stream.reader(),
        config.decoder_options(),
        config.top_files_limit,
        config.histogram_buckets,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    stream.release().await;

    assert!(analysis.aggregate.truncated);
    assert_eq!(analysis.commits.len(), 1);
    assert_eq!(leftover_clones(f.work.path()), 0);
}

#[tokio::test]
async fn test_missing_repository_is_not_found() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let f = fixture();
    let identity = RepositoryIdentity::new("octo", "missing").unwrap();

    let result = f.source.acquire(&identity, &CancellationToken::new()).await;

    match result {
        Err(AcquireError::NotFound(key)) => assert_eq!(key, "octo/missing"),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("missing repository was acquired"),
    }
    assert_eq!(leftover_clones(f.work.path()), 0);
}

#[tokio::test]
async fn test_cancelled_acquire_cleans_up() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let f = fixture();
    let identity = RepositoryIdentity::new("octo", "widgets").unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = f.source.acquire(&identity, &cancel).await;

    assert!(matches!(result, Err(AcquireError::Cancelled)));
    assert_eq!(leftover_clones(f.work.path()), 0);
}

#[tokio::test]
async fn test_shallow_clone_marks_history_truncated() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let remote = TempDir::new().unwrap();
    linear_repository(remote.path(), 5);
    let work = TempDir::new().unwrap();
    let config = AnalyzerConfig {
        clone_base_url: format!("file://{}", remote.path().display()),
        work_dir_base: Some(work.path().to_path_buf()),
        clone_depth: Some(2),
        ..AnalyzerConfig::default()
    };

    let identity = RepositoryIdentity::new("octo", "history").unwrap();
    let mut stream = GitLogSource::new(&config)
        .acquire(&identity, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stream.shallow_depth(), Some(2));
    stream.release().await;

    let analyzer = analyzer_for(config);
    let response = analyzer.analyze("octo", "history").await.unwrap();
    analyzer.shutdown().await;

    assert_eq!(response.aggregate.total_commits, 2);
    assert!(response.aggregate.truncated);
    assert_eq!(response.commits.last().unwrap().message, "commit 4");
    assert_eq!(leftover_clones(work.path()), 0);
}

#[tokio::test]
async fn test_clone_deeper_than_history_is_complete() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }
    let remote = TempDir::new().unwrap();
    linear_repository(remote.path(), 5);
    let work = TempDir::new().unwrap();
    let config = AnalyzerConfig {
        clone_base_url: format!("file://{}", remote.path().display()),
        work_dir_base: Some(work.path().to_path_buf()),
        clone_depth: Some(10),
        ..AnalyzerConfig::default()
    };

    let analyzer = analyzer_for(config);
    let response = analyzer.analyze("octo", "history").await.unwrap();
    analyzer.shutdown().await;

    assert_eq!(response.aggregate.total_commits, 5);
    assert!(!response.aggregate.truncated);
    assert_eq!(response.aggregate.total_added, 5);
}
