//! Line grammar of `git log --numstat --format=%H|%an|%at|%s`
//!
//! Every line of the stream is exactly one of four shapes:
//!
//! ```text
//! <hash>|<author>|<unix-seconds>|<subject>     header
//! <added>\t<removed>\t<path>                   numstat ("-" counts for binary files)
//!                                              blank
//! anything else                                unrecognized
//! ```
//!
//! Shapes are tested in the order listed in [`LogLine::parse`]. The numstat
//! test runs before the header test so that a file path containing `|` is not
//! mistaken for a header; a numstat line never has `|` in its first field.

/// Numeric column of a numstat line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountField {
    Count(u64),
    /// `-`, reported by git for binary files
    Binary,
    /// Anything that is neither a non-negative integer nor `-`
    Invalid,
}

impl CountField {
    fn parse(field: &str) -> Self {
        let field = field.trim();
        if field == "-" {
            return CountField::Binary;
        }
        match field.parse::<u64>() {
            Ok(count) => CountField::Count(count),
            Err(_) => CountField::Invalid,
        }
    }

    /// Contribution to the commit totals
    pub fn value(&self) -> Option<u64> {
        match self {
            CountField::Count(count) => Some(*count),
            CountField::Binary | CountField::Invalid => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLine<'a> {
    pub hash: &'a str,
    pub author: &'a str,
    pub timestamp: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumstatLine<'a> {
    pub added: CountField,
    pub removed: CountField,
    pub path: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLine<'a> {
    Header(HeaderLine<'a>),
    Numstat(NumstatLine<'a>),
    Blank,
    Unrecognized,
}

impl<'a> LogLine<'a> {
    /// Classifies one line (without its trailing newline)
    pub fn parse(line: &'a str) -> Self {
        if line.trim().is_empty() {
            return LogLine::Blank;
        }

        if let Some(numstat) = parse_numstat(line) {
            return LogLine::Numstat(numstat);
        }

        match parse_header(line) {
            Some(header) => LogLine::Header(header),
            None => LogLine::Unrecognized,
        }
    }
}

fn parse_numstat(line: &str) -> Option<NumstatLine<'_>> {
    let (added, rest) = line.split_once('\t')?;
    if added.contains('|') {
        return None;
    }
    let (removed, path) = rest.split_once('\t')?;
    if path.is_empty() {
        return None;
    }

    Some(NumstatLine {
        added: CountField::parse(added),
        removed: CountField::parse(removed),
        path,
    })
}

fn parse_header(line: &str) -> Option<HeaderLine<'_>> {
    let mut parts = line.splitn(4, '|');
    let hash = parts.next()?.trim();
    let author = parts.next()?;
    let timestamp = parts.next()?;
    let message = parts.next()?;

    if hash.is_empty() {
        return None;
    }

    Some(HeaderLine {
        hash,
        author,
        timestamp,
        message,
    })
}
