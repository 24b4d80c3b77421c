//! Module for handling the background scheduler task.

use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use tokio::task::JoinHandle;
use tracing::error;
use super::queue::RequestQueue;

/// A handle for managing the background task that drains a [`RequestQueue`].
///
/// Shutting down clears the running flag and closes the queue, which both rejects new
/// work and wakes the task if it is waiting for requests.
///
/// # Example
///
/// ```ignore
/// let queue = Arc::new(RequestQueue::new(1024, Duration::from_millis(100)));
/// let mut worker = BatchWorkerHandle::new(queue.clone(), |running| {
///     tokio::spawn(async move {
///         while running.load(Ordering::SeqCst) {
///             let batch = queue.drain(8, Duration::from_millis(50)).await;
///             // dispatch batch
///         }
///     })
/// });
///
/// // Stop the task and wait for it to finish
/// worker.shutdown();
/// worker.join().await;
/// ```
pub struct BatchWorkerHandle {
    /// Flag indicating whether the background task should continue running
    running: Arc<AtomicBool>,

    /// Handle to the spawned background task, becomes `None` once joined
    handle: Option<JoinHandle<()>>,

    /// Queue the task drains, closed on shutdown
    queue: Arc<RequestQueue>,
}

impl BatchWorkerHandle {
    /// Creates a new `BatchWorkerHandle` by spawning a background task.
    ///
    /// # Parameters
    ///
    /// * `queue` - The queue the task drains
    /// * `task` - A function that takes the running flag and returns a `JoinHandle`.
    ///   This function is responsible for creating and spawning the actual background task.
    pub fn new<F>(queue: Arc<RequestQueue>, task: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) -> JoinHandle<()>,
    {
        let running = Arc::new(AtomicBool::new(true));
        let handle = task(running.clone());

        Self {
            running,
            handle: Some(handle),
            queue,
        }
    }

    /// Returns a clone of the atomic boolean that indicates whether the task should continue running.
    pub fn running(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signals the background task to stop.
    ///
    /// This method:
    /// 1. Sets the running flag to `false`
    /// 2. Closes the queue, so new requests are refused and a waiting drain returns
    ///
    /// It does not wait for the task; see [`join`](Self::join). Calling it more than once
    /// is harmless.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.queue.close();
    }

    /// Waits for the background task to exit. Returns immediately if it was already joined.
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                error!(error = %err, "batch worker terminated abnormally");
            }
        }
    }
}

impl Drop for BatchWorkerHandle {
    /// Signals the background task to stop when the handle is dropped.
    ///
    /// The task is detached; it still fails any pending requests before exiting.
    fn drop(&mut self) {
        self.shutdown();
    }
}
