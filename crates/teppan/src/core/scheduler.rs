use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use futures::FutureExt;
use tokio::sync::oneshot::Sender;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};
use crate::batch::{PaddedBatchBuilder, ResultDemux};
use crate::communication::{Outcome, QueueItem};
use crate::config::BatchConfig;
use crate::error::{BatchError, InferencePanic};
use crate::request::{RequestId, Translation};
use crate::stats::SchedulerStats;
use super::client::InferenceClient;
use super::queue::RequestQueue;

/// Phases of one scheduling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting on the queue for a batch's worth of requests
    Idle,
    /// Building the padded batch from the drained requests
    Collecting,
    /// Waiting on the inference collaborator
    Dispatching,
}

/// # BatchScheduler
///
/// The single consumer of a [`RequestQueue`]. Each cycle drains up to
/// `max_batch_size` requests, pads them into one batch, runs the inference client,
/// and delivers one outcome to every request of the batch.
///
/// Exactly one batch is in flight at a time. A failed batch fails every one of its
/// requests; nothing is retried.
pub struct BatchScheduler<C> {
    client: C,
    queue: Arc<RequestQueue>,
    builder: PaddedBatchBuilder,
    max_batch_size: usize,
    max_wait: Duration,
    stats: Arc<SchedulerStats>,
}

impl<C> BatchScheduler<C>
where
    C: InferenceClient,
{
    pub fn new(
        client: C,
        queue: Arc<RequestQueue>,
        config: &BatchConfig,
        stats: Arc<SchedulerStats>,
    ) -> Self {
        Self {
            client,
            queue,
            builder: PaddedBatchBuilder::with_pad_token(config.pad_token),
            max_batch_size: config.max_batch_size,
            max_wait: config.max_wait,
            stats,
        }
    }

    /// Runs cycles until `running` is cleared or the queue is closed, then fails every
    /// request still pending with [`BatchError::ShuttingDown`].
    ///
    /// A batch already dispatched when shutdown is signalled completes normally. The
    /// pending requests are also failed, and the queue closed, if the loop unwinds or
    /// the task is aborted.
    pub async fn run(self, running: Arc<AtomicBool>) {
        debug!(
            max_batch_size = self.max_batch_size,
            max_wait_ms = self.max_wait.as_millis() as u64,
            "scheduler started"
        );
        let _pending = PendingGuard {
            queue: self.queue.clone(),
            stats: self.stats.clone(),
        };
        while running.load(Ordering::SeqCst) && !self.queue.is_closed() {
            self.tick().await;
        }
    }

    /// Performs one `Idle → Collecting → Dispatching → Idle` cycle.
    ///
    /// # Returns
    ///
    /// The number of requests dispatched; `0` when the drain came back empty.
    pub async fn tick(&self) -> usize {
        self.enter(SchedulerState::Idle);
        let items = self.queue.drain(self.max_batch_size, self.max_wait).await;
        if items.is_empty() {
            return 0;
        }
        let count = items.len();
        self.dispatch(items).await;
        count
    }

    async fn dispatch(&self, items: Vec<QueueItem>) {
        self.enter(SchedulerState::Collecting);
        let (requests, senders): (Vec<_>, Vec<_>) =
            items.into_iter().map(QueueItem::into_parts).unzip();

        let batch = match self.builder.build(requests) {
            Ok(batch) => batch,
            Err(err) => unreachable!("drain yields a non-empty single-language set: {err}"),
        };

        let dispatched_at = Instant::now();
        let queued: Vec<Duration> = batch
            .requests()
            .iter()
            .map(|request| dispatched_at.duration_since(request.enqueue_time()))
            .collect();
        let ids: Vec<RequestId> = batch.ids().collect();
        let size = batch.len();

        self.stats.record_dispatch(size, batch.padding_tokens());
        self.enter(SchedulerState::Dispatching);
        debug!(
            batch_size = size,
            max_len = batch.max_len(),
            target_lang = batch.target_lang(),
            padding = batch.padding_tokens(),
            "dispatching batch"
        );

        let outcome = match AssertUnwindSafe(self.client.infer(&batch)).catch_unwind().await {
            Ok(Ok(result)) => ResultDemux::split(&batch, result),
            Ok(Err(cause)) => Err(BatchError::inference_failed(cause)),
            Err(payload) => Err(BatchError::inference_failed(Box::new(InferencePanic::from_payload(payload)))),
        };
        let inference = dispatched_at.elapsed();

        match outcome {
            Ok(outputs) => {
                for ((sender, queued), (id, tokens)) in senders.into_iter().zip(queued).zip(outputs) {
                    let translation = Translation {
                        id,
                        tokens,
                        queued,
                        inference,
                    };
                    self.deliver(id, sender, Ok(translation));
                }
                self.stats.record_completed(size);
                debug!(batch_size = size, inference_ms = inference.as_millis() as u64, "batch completed");
            }
            Err(err) => {
                warn!(batch_size = size, error = %err, "batch failed, failing every request in it");
                for (id, sender) in ids.into_iter().zip(senders) {
                    self.deliver(id, sender, Err(err.clone()));
                }
                self.stats.record_batch_failed();
                self.stats.record_failed(size);
            }
        }
    }

    fn deliver(&self, id: RequestId, sender: Sender<Outcome>, outcome: Outcome) {
        if sender.send(outcome).is_err() {
            debug!(request_id = %id, "requester dropped its destination, discarding result");
            self.stats.record_abandoned();
        }
    }

    #[inline]
    fn enter(&self, state: SchedulerState) {
        trace!(?state, pending = self.queue.len(), "scheduler state");
    }
}

/// Closes the queue and fails whatever is still in it when dropped, so no caller
/// waits on a scheduler that is gone.
struct PendingGuard {
    queue: Arc<RequestQueue>,
    stats: Arc<SchedulerStats>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let pending = self.queue.close_and_take_all();
        let count = pending.len();
        if thread::panicking() {
            error!(pending = count, "scheduler panicked, failing pending requests");
        } else {
            info!(pending = count, "scheduler shutting down");
        }

        for item in pending {
            let id = item.id();
            if !item.fulfill(Err(BatchError::ShuttingDown)) {
                debug!(request_id = %id, "requester dropped its destination");
                self.stats.record_abandoned();
            }
        }
        self.stats.record_failed(count);
    }
}
