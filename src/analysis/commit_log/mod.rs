//! Streaming decoder for commit-log text
//!
//! [`CommitLogDecoder`] turns a line stream into [`DecodedCommit`]s one at a
//! time. It holds only the commit currently being assembled; a commit is
//! handed out when the next header line or the end of the stream is reached.
//!
//! Lossy-but-safe fallbacks are counted in [`DecodeSummary`] rather than
//! aborting the decode:
//!
//! - a numstat count that is neither an integer nor `-` contributes 0
//! - an unparsable timestamp becomes the current wall-clock time
//! - unrecognized lines are skipped

mod line;
mod reader;

pub use line::{CountField, HeaderLine, LogLine, NumstatLine};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;

use super::error::DecodeError;
use super::models::{CommitRecord, DecodedCommit, FileChange};
use reader::BoundedLineReader;

/// Marker appended to messages cut at `message_max_chars`
pub const TRUNCATION_MARKER: &str = "...";

/// Limits applied while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Longest accepted line in bytes
    pub max_line_bytes: usize,
    /// Stop cleanly after this many commits
    pub max_commits: Option<usize>,
    /// Messages longer than this many characters are cut
    pub message_max_chars: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_line_bytes: 10 * 1024 * 1024,
            max_commits: None,
            message_max_chars: 100,
        }
    }
}

/// Counters describing how a decode went
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeSummary {
    /// Commits handed out so far
    pub commits: usize,
    /// Decoding stopped at `max_commits` with more history remaining
    pub truncated: bool,
    /// Headers whose timestamp could not be parsed
    pub timestamp_fallbacks: usize,
    /// Numstat count fields that were neither integers nor `-`
    pub unparsable_counts: usize,
    /// Non-blank lines that were neither headers nor numstat lines
    pub unrecognized_lines: usize,
    pub lines_read: u64,
}

/// Every commit of a stream plus the decode summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    pub commits: Vec<DecodedCommit>,
    pub summary: DecodeSummary,
}

/// Single-pass decoder over a buffered async reader
pub struct CommitLogDecoder<R> {
    reader: BoundedLineReader<R>,
    options: DecoderOptions,
    cancel: CancellationToken,
    current: Option<DecodedCommit>,
    summary: DecodeSummary,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> CommitLogDecoder<R> {
    pub fn new(reader: R, options: DecoderOptions, cancel: CancellationToken) -> Self {
        Self {
            reader: BoundedLineReader::new(reader, options.max_line_bytes),
            options,
            cancel,
            current: None,
            summary: DecodeSummary::default(),
            finished: false,
        }
    }

    /// Counters for everything decoded so far
    pub fn summary(&self) -> DecodeSummary {
        DecodeSummary {
            lines_read: self.reader.lines_read(),
            ..self.summary
        }
    }

    /// Returns the next finalized commit, or `None` once the stream is done
    ///
    /// After `None`, or after the commit cap is reached, further calls keep
    /// returning `None`. Cancellation is checked before every line and while
    /// waiting for input.
    pub async fn next_commit(&mut self) -> Result<Option<DecodedCommit>, DecodeError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            if self.cancel.is_cancelled() {
                return Err(DecodeError::Cancelled);
            }

            let line = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(DecodeError::Cancelled),
                line = self.reader.next_line() => line?,
            };

            let Some(line) = line else {
                self.finished = true;
                let last = self.current.take();
                if last.is_some() {
                    self.summary.commits += 1;
                }
                return Ok(last);
            };

            match LogLine::parse(&line) {
                LogLine::Blank => {}
                LogLine::Unrecognized => {
                    self.summary.unrecognized_lines += 1;
                    tracing::trace!(line = %line, "skipping unrecognized log line");
                }
                LogLine::Numstat(numstat) => match self.current.as_mut() {
                    Some(commit) => {
                        apply_numstat(commit, &numstat, &mut self.summary);
                    }
                    None => {
                        self.summary.unrecognized_lines += 1;
                    }
                },
                LogLine::Header(header) => {
                    let previous = self.current.take();
                    let started = self.summary.commits + usize::from(previous.is_some());

                    if self.options.max_commits.is_some_and(|cap| started >= cap) {
                        self.finished = true;
                        self.summary.truncated = true;
                        if previous.is_some() {
                            self.summary.commits += 1;
                        }
                        tracing::debug!(commits = started, "commit cap reached, stopping decode");
                        return Ok(previous);
                    }

                    self.current = Some(start_commit(
                        &header,
                        self.options.message_max_chars,
                        &mut self.summary,
                    ));

                    if previous.is_some() {
                        self.summary.commits += 1;
                        return Ok(previous);
                    }
                }
            }
        }
    }

    /// Drains the stream into memory
    pub async fn decode_all(mut self) -> Result<DecodedLog, DecodeError> {
        let mut commits = Vec::new();
        while let Some(commit) = self.next_commit().await? {
            commits.push(commit);
        }
        Ok(DecodedLog {
            commits,
            summary: self.summary(),
        })
    }
}

fn start_commit(
    header: &HeaderLine<'_>,
    message_max_chars: usize,
    summary: &mut DecodeSummary,
) -> DecodedCommit {
    let timestamp = match header.timestamp.trim().parse::<i64>() {
        Ok(timestamp) => timestamp,
        Err(_) => {
            summary.timestamp_fallbacks += 1;
            tracing::debug!(
                hash = header.hash,
                raw = header.timestamp,
                "unparsable commit timestamp, using current time"
            );
            chrono::Utc::now().timestamp()
        }
    };

    DecodedCommit {
        record: CommitRecord {
            hash: header.hash.to_string(),
            author: header.author.to_string(),
            timestamp,
            message: truncate_message(header.message, message_max_chars),
            added: 0,
            removed: 0,
            files_touched_count: 0,
        },
        files: Vec::new(),
    }
}

fn apply_numstat(commit: &mut DecodedCommit, numstat: &NumstatLine<'_>, summary: &mut DecodeSummary) {
    for field in [numstat.added, numstat.removed] {
        if field == CountField::Invalid {
            summary.unparsable_counts += 1;
        }
    }

    let added = numstat.added.value();
    let removed = numstat.removed.value();

    commit.record.added = commit.record.added.saturating_add(added.unwrap_or(0));
    commit.record.removed = commit.record.removed.saturating_add(removed.unwrap_or(0));
    commit.record.files_touched_count += 1;
    commit.files.push(FileChange {
        path: numstat.path.to_string(),
        added,
        removed,
    });
}

/// Cuts `message` to `max_chars` characters, appending [`TRUNCATION_MARKER`] when cut
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &message[..cut], TRUNCATION_MARKER),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short", 10), "short");
        assert_eq!(truncate_message("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_message("this is too long", 7), "this is...");
        assert_eq!(truncate_message("héllo wörld", 5), "héllo...");
    }

    #[tokio::test]
    async fn test_decodes_commit_without_numstat_at_end() {
        let input: &[u8] = b"aaa|alice|100|first\n1\t1\ta.txt\n\nbbb|bob|200|second\n";
        let log = CommitLogDecoder::new(input, DecoderOptions::default(), CancellationToken::new())
            .decode_all()
            .await
            .unwrap();

        assert_eq!(log.commits.len(), 2);
        let last = &log.commits[1].record;
        assert_eq!(last.hash, "bbb");
        assert_eq!((last.added, last.removed, last.files_touched_count), (0, 0, 0));
        assert_eq!(log.summary.commits, 2);
        assert!(!log.summary.truncated);
    }

    #[tokio::test]
    async fn test_numstat_before_any_header_is_ignored() {
        let input: &[u8] = b"3\t4\torphan.rs\naaa|alice|100|msg\n1\t0\ta.rs\n";
        let log = CommitLogDecoder::new(input, DecoderOptions::default(), CancellationToken::new())
            .decode_all()
            .await
            .unwrap();

        assert_eq!(log.commits.len(), 1);
        assert_eq!(log.commits[0].record.added, 1);
        assert_eq!(log.summary.unrecognized_lines, 1);
    }

    #[tokio::test]
    async fn test_stops_after_finished() {
        let input: &[u8] = b"aaa|alice|100|msg\n";
        let mut decoder =
            CommitLogDecoder::new(input, DecoderOptions::default(), CancellationToken::new());
        assert!(decoder.next_commit().await.unwrap().is_some());
        assert!(decoder.next_commit().await.unwrap().is_none());
        assert!(decoder.next_commit().await.unwrap().is_none());
    }
}
