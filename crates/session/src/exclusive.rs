use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// A single lane that runs one operation at a time.
///
/// Operations queue in the order `run` is first polled and each waits for the
/// previous one to finish completely. The operation future is not polled
/// until the lane is free, so nothing inside it runs early.
#[derive(Debug, Default)]
pub struct RunExclusive {
    lane: Mutex<()>,
    waiting: AtomicUsize,
}

impl RunExclusive {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F>(&self, label: &'static str, op: F) -> F::Output
    where
        F: Future,
    {
        let ahead = self.waiting.fetch_add(1, Ordering::SeqCst);
        if ahead > 0 {
            debug!(op = label, ahead, "waiting for in-flight playback operation");
        }
        let _guard = self.lane.lock().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        op.await
    }
}
