use std::borrow::Cow;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::analysis::error::DecodeError;

/// Line reader that refuses to buffer more than `max_line_bytes` per line
///
/// Lines are split on `\n` with an optional preceding `\r` removed. Invalid
/// UTF-8 is replaced rather than rejected, since author names and paths in
/// old histories are not always valid UTF-8.
pub(crate) struct BoundedLineReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_line_bytes: usize,
    lines_read: u64,
}

impl<R: AsyncBufRead + Unpin> BoundedLineReader<R> {
    pub(crate) fn new(inner: R, max_line_bytes: usize) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            max_line_bytes,
            lines_read: 0,
        }
    }

    pub(crate) fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Reads the next line, or `None` at end of stream
    pub(crate) async fn next_line(&mut self) -> Result<Option<Cow<'_, str>>, DecodeError> {
        self.buf.clear();

        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                break;
            }

            let newline = available.iter().position(|b| *b == b'\n');
            let content_len = newline.unwrap_or(available.len());

            if self.buf.len() + content_len > self.max_line_bytes {
                return Err(DecodeError::LineTooLong {
                    line: self.lines_read + 1,
                    limit: self.max_line_bytes,
                });
            }

            self.buf.extend_from_slice(&available[..content_len]);
            let consumed = newline.map_or(content_len, |_| content_len + 1);
            self.inner.consume(consumed);

            if newline.is_some() {
                break;
            }
        }

        self.lines_read += 1;
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf)))
    }
}
