//! Sources of commit-log streams
//!
//! A [`LogSource`] turns a [`RepositoryIdentity`] into a [`LogStream`]: a
//! readable `git log --numstat --format=%H|%an|%at|%s` byte stream plus
//! whatever resources back it (a clone directory, a child process).
//!
//! Streams release their resources on [`LogStream::release`] and again, as a
//! fallback, when dropped, so an early return, a cancelled future or a panic
//! never leaves a clone directory behind.

mod git;
mod memory;

pub use git::GitLogSource;
pub use memory::MemoryLogSource;

use async_trait::async_trait;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;

use crate::analysis::error::AcquireError;
use crate::analysis::RepositoryIdentity;

/// Log format every source must produce
pub const LOG_FORMAT: &str = "--format=%H|%an|%at|%s";

#[async_trait]
pub trait LogSource: Send + Sync {
    /// Prepares the commit-log stream for `identity`
    ///
    /// Fails with [`AcquireError::NotFound`] when the repository does not exist
    /// or is not accessible, with [`AcquireError::Cancelled`] when `cancel`
    /// fires first, and with another variant for infrastructure failures.
    async fn acquire(
        &self,
        identity: &RepositoryIdentity,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn LogStream>, AcquireError>;
}

#[async_trait]
pub trait LogStream: Send {
    /// The commit-log text
    fn reader(&mut self) -> &mut (dyn AsyncBufRead + Unpin + Send);

    /// Waits for the producer after the reader hit end of stream
    ///
    /// Reports a producer failure that the stream itself could not show,
    /// such as `git log` exiting with an error.
    async fn finish(&mut self) -> Result<(), AcquireError>;

    /// Depth the history was cut at, when the stream holds only its newest part
    ///
    /// A shallow clone ends at its depth even though older commits exist, so a
    /// stream that yields this many commits does not cover the whole history.
    fn shallow_depth(&self) -> Option<usize> {
        None
    }

    /// Frees everything backing the stream; calling it twice is harmless
    async fn release(&mut self);
}
