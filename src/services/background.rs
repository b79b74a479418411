use std::fmt::Display;
use std::future::Future;

use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// Fire-and-forget work that outlives the request that started it
///
/// Tasks run detached on the runtime and are never tied to a request's
/// cancellation token. Failures are logged with the task label and dropped.
/// The tracker lets the owner wait for in-flight work before exiting.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` under a span named after `label`
    ///
    /// The span is a child of the caller's current span, so the request id
    /// shows up on anything the task logs.
    pub fn spawn<F, E>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let span = tracing::info_span!("background", task = label);
        self.tracker.spawn(
            async move {
                match task.await {
                    Ok(()) => tracing::debug!("background task {} finished", label),
                    Err(e) => tracing::warn!("background task {} failed: {}", label, e),
                }
            }
            .instrument(span),
        );
    }

    /// Tasks still running
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Waits for every task spawned so far, then keeps accepting new ones
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Waits for every task spawned so far
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
