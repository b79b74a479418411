use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;

use super::{LogSource, LogStream};
use crate::analysis::error::AcquireError;
use crate::analysis::RepositoryIdentity;

/// Serves pre-recorded commit logs keyed by `owner/name`
///
/// Unknown repositories are reported as not found. The source counts
/// acquisitions and streams that have not been released yet, which lets
/// callers check that every stream is cleaned up.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSource {
    logs: Arc<DashMap<String, String>>,
    delay: Option<Duration>,
    shallow_depth: Option<usize>,
    acquired: Arc<AtomicUsize>,
    open: Arc<AtomicUsize>,
}

impl MemoryLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(self, identity: &RepositoryIdentity, log: impl Into<String>) -> Self {
        self.insert(identity, log);
        self
    }

    /// Waits this long inside every acquire, honoring cancellation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reports every stream as cut at `depth` commits, like a shallow clone
    pub fn with_shallow_depth(mut self, depth: usize) -> Self {
        self.shallow_depth = Some(depth);
        self
    }

    pub fn insert(&self, identity: &RepositoryIdentity, log: impl Into<String>) {
        self.logs.insert(identity.key(), log.into());
    }

    /// Number of acquire calls, successful or not
    pub fn acquire_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Streams handed out and not yet released or dropped
    pub fn open_streams(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSource for MemoryLogSource {
    async fn acquire(
        &self,
        identity: &RepositoryIdentity,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn LogStream>, AcquireError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AcquireError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let log = self
            .logs
            .get(&identity.key())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AcquireError::NotFound(identity.key()))?;

        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryLogStream {
            reader: Cursor::new(log.into_bytes()),
            shallow_depth: self.shallow_depth,
            open: Some(Arc::clone(&self.open)),
        }))
    }
}

struct MemoryLogStream {
    reader: Cursor<Vec<u8>>,
    shallow_depth: Option<usize>,
    open: Option<Arc<AtomicUsize>>,
}

impl MemoryLogStream {
    fn close(&mut self) {
        if let Some(open) = self.open.take() {
            open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl LogStream for MemoryLogStream {
    fn reader(&mut self) -> &mut (dyn AsyncBufRead + Unpin + Send) {
        &mut self.reader
    }

    async fn finish(&mut self) -> Result<(), AcquireError> {
        Ok(())
    }

    fn shallow_depth(&self) -> Option<usize> {
        self.shallow_depth
    }

    async fn release(&mut self) {
        self.close();
    }
}

impl Drop for MemoryLogStream {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let identity = RepositoryIdentity::new("octo", "widgets").unwrap();
        let source = MemoryLogSource::new().with_log(&identity, "abc|a|1|m\n");

        let mut stream = source
            .acquire(&identity, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(source.open_streams(), 1);

        let mut text = String::new();
        stream.reader().read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "abc|a|1|m\n");

        stream.release().await;
        stream.release().await;
        drop(stream);
        assert_eq!(source.open_streams(), 0);
    }

    #[tokio::test]
    async fn test_unknown_repository_is_not_found() {
        let identity = RepositoryIdentity::new("octo", "missing").unwrap();
        let source = MemoryLogSource::new();
        let result = source.acquire(&identity, &CancellationToken::new()).await;
        assert!(matches!(result, Err(AcquireError::NotFound(_))));
        assert_eq!(source.acquire_count(), 1);
        assert_eq!(source.open_streams(), 0);
    }
}
