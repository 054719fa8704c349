//! Tracking for per-event handler tasks.

use parking_lot::Mutex;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::warn;

/// Spawns handler tasks and lets shutdown wait for them.
///
/// Once closed, no new task is spawned.
#[derive(Debug, Default)]
pub(crate) struct JobTracker {
    inner: Mutex<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    handles: Vec<JoinHandle<()>>,
    closed: bool,
}

impl JobTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Spawn `job` unless the tracker is closed. Returns whether it was spawned.
    pub(crate) fn spawn<F>(&self, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if inner.closed {
            return false;
        }
        inner.handles.retain(|h| !h.is_finished());
        inner.handles.push(tokio::spawn(job));
        true
    }

    /// Refuse all further work.
    pub(crate) fn close(&self) {
        self.inner.lock().closed = true;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Wait until every spawned task has finished.
    pub(crate) async fn wait(&self) {
        loop {
            let handles = std::mem::take(&mut self.inner.lock().handles);
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "event handler task failed");
                }
            }
        }
    }
}
