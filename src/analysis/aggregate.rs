//! Single-pass aggregation over decoded commits
//!
//! Contributors are keyed by the exact author string. `"Jane Doe"` and
//! `"jane doe"` count as two contributors, and so do a display name and its
//! email-style variant; author fields are free text and are not normalized.
//!
//! File touches are counted per numstat line. A path listed twice in one
//! commit counts twice.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::models::{AggregateResult, DecodedCommit, FileTouchCount, HistogramBucket};

/// Running totals fed one commit at a time
#[derive(Debug)]
pub struct Aggregator {
    top_files_limit: usize,
    histogram_buckets: usize,
    total_added: u64,
    total_removed: u64,
    contributors: HashSet<String>,
    /// path -> (touch count, first-seen order)
    file_touches: HashMap<String, (u64, usize)>,
    /// (added, removed) per commit, in stream order
    line_deltas: Vec<(u64, u64)>,
}

impl Aggregator {
    pub fn new(top_files_limit: usize, histogram_buckets: usize) -> Self {
        Self {
            top_files_limit,
            histogram_buckets,
            total_added: 0,
            total_removed: 0,
            contributors: HashSet::new(),
            file_touches: HashMap::new(),
            line_deltas: Vec::new(),
        }
    }

    pub fn observe(&mut self, commit: &DecodedCommit) {
        let record = &commit.record;
        self.total_added = self.total_added.saturating_add(record.added);
        self.total_removed = self.total_removed.saturating_add(record.removed);
        self.line_deltas.push((record.added, record.removed));

        if !self.contributors.contains(&record.author) {
            self.contributors.insert(record.author.clone());
        }

        for file in &commit.files {
            let next_order = self.file_touches.len();
            self.file_touches
                .entry(file.path.clone())
                .or_insert((0, next_order))
                .0 += 1;
        }
    }

    pub fn commits_observed(&self) -> usize {
        self.line_deltas.len()
    }

    /// Produces the final statistics
    ///
    /// `truncated` is carried into the result unchanged.
    pub fn finish(self, truncated: bool) -> AggregateResult {
        let top_files = top_files(&self.file_touches, self.top_files_limit);
        let lines_histogram = lines_histogram(&self.line_deltas, self.histogram_buckets);
        let file_touch_counts: BTreeMap<String, u64> = self
            .file_touches
            .into_iter()
            .map(|(path, (count, _))| (path, count))
            .collect();

        AggregateResult {
            total_added: self.total_added,
            total_removed: self.total_removed,
            total_contributors: self.contributors.len(),
            total_commits: self.line_deltas.len(),
            file_touch_counts,
            top_files,
            lines_histogram,
            truncated,
        }
    }
}

/// Aggregates an already materialized commit sequence
pub fn aggregate<'a, I>(
    commits: I,
    top_files_limit: usize,
    histogram_buckets: usize,
) -> AggregateResult
where
    I: IntoIterator<Item = &'a DecodedCommit>,
{
    let mut aggregator = Aggregator::new(top_files_limit, histogram_buckets);
    for commit in commits {
        aggregator.observe(commit);
    }
    aggregator.finish(false)
}

/// Files ordered by touch count descending, ties in first-seen order
fn top_files(file_touches: &HashMap<String, (u64, usize)>, limit: usize) -> Vec<FileTouchCount> {
    let mut ranked: Vec<(&String, u64, usize)> = file_touches
        .iter()
        .map(|(path, (count, order))| (path, *count, *order))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(path, count, _)| FileTouchCount {
            file: path.clone(),
            count,
        })
        .collect()
}

/// Splits the commit sequence into equal index ranges
///
/// Buckets are by commit position, not calendar time. With fewer commits than
/// requested buckets, each commit gets its own bucket. The last bucket takes
/// the remainder.
fn lines_histogram(line_deltas: &[(u64, u64)], buckets: usize) -> Vec<HistogramBucket> {
    let bucket_count = buckets.min(line_deltas.len());
    if bucket_count == 0 {
        return Vec::new();
    }

    let bucket_size = line_deltas.len() / bucket_count;
    let mut cumulative: i64 = 0;
    let mut histogram = Vec::with_capacity(bucket_count);

    for index in 0..bucket_count {
        let start = index * bucket_size;
        let end = if index + 1 == bucket_count {
            line_deltas.len()
        } else {
            start + bucket_size
        };

        let (added, removed) = line_deltas[start..end]
            .iter()
            .fold((0u64, 0u64), |(a, r), (added, removed)| {
                (a.saturating_add(*added), r.saturating_add(*removed))
            });
        cumulative = cumulative
            .saturating_add(to_i64(added))
            .saturating_sub(to_i64(removed));

        histogram.push(HistogramBucket {
            start_commit: start,
            end_commit: end,
            added,
            removed,
            cumulative_lines: cumulative,
        });
    }

    histogram
}

fn to_i64(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}
