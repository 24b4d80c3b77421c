use std::sync::Arc;
use tracing::info;
use crate::communication::ResultDestination;
use crate::config::BatchConfig;
use crate::core::client::InferenceClient;
use crate::core::queue::RequestQueue;
use crate::core::scheduler::BatchScheduler;
use crate::core::worker::BatchWorkerHandle;
use crate::error::{BatchError, ConfigError};
use crate::request::{Translation, TranslationRequest};
use crate::stats::{SchedulerStats, StatsSnapshot};
use crate::TokenId;

/// # TranslationBatcher
///
/// Entry point for callers: owns the request queue and the background scheduler that
/// batches requests for an [`InferenceClient`].
///
/// Cloning is not supported; share it behind an `Arc`. Dropping the batcher signals
/// the scheduler to stop; requests still queued then receive
/// [`BatchError::ShuttingDown`].
pub struct TranslationBatcher {
    queue: Arc<RequestQueue>,
    stats: Arc<SchedulerStats>,
    config: BatchConfig,
    handle: BatchWorkerHandle,
}

impl TranslationBatcher {
    /// Validates `config` and spawns the scheduler on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// When called outside a tokio runtime.
    pub fn new<C>(client: C, config: BatchConfig) -> Result<Self, ConfigError>
    where
        C: InferenceClient,
    {
        config.validate()?;

        let queue = Arc::new(RequestQueue::from_config(&config));
        let stats = Arc::new(SchedulerStats::default());
        let scheduler = BatchScheduler::new(client, queue.clone(), &config, stats.clone());
        let handle = BatchWorkerHandle::new(queue.clone(), move |running| {
            tokio::spawn(scheduler.run(running))
        });

        info!(
            max_batch_size = config.max_batch_size,
            max_wait_ms = config.max_wait.as_millis() as u64,
            queue_high_water_mark = config.queue_high_water_mark,
            "translation batcher started"
        );

        Ok(Self {
            queue,
            stats,
            config,
            handle,
        })
    }

    /// Queues `tokens` for translation without waiting for the result.
    ///
    /// # Errors
    ///
    /// * [`BatchError::InputTooLong`] if `max_input_tokens` is set and exceeded
    /// * [`BatchError::QueueFull`] when the queue is at its high-water mark
    /// * [`BatchError::Closed`] after shutdown
    pub fn submit(&self, tokens: Vec<TokenId>) -> Result<ResultDestination, BatchError> {
        self.submit_request(TranslationRequest::new(tokens))
    }

    /// Like [`submit`](Self::submit), for a prepared request such as one carrying a
    /// target language. It is only batched with requests for the same language.
    pub fn submit_request(&self, request: TranslationRequest) -> Result<ResultDestination, BatchError> {
        if let Some(limit) = self.config.max_input_tokens {
            if request.len() > limit {
                self.stats.record_rejected();
                return Err(BatchError::InputTooLong {
                    len: request.len(),
                    limit,
                });
            }
        }

        self.queue
            .enqueue(request)
            .inspect_err(|_| self.stats.record_rejected())
    }

    /// Queues `tokens` and waits for the translation.
    pub async fn translate(&self, tokens: Vec<TokenId>) -> Result<Translation, BatchError> {
        self.submit(tokens)?.await
    }

    /// Queues `request` and waits for the translation.
    pub async fn translate_request(&self, request: TranslationRequest) -> Result<Translation, BatchError> {
        self.submit_request(request)?.await
    }

    /// Stops accepting requests and tells the scheduler to exit. Does not wait.
    pub fn signal_shutdown(&self) {
        self.handle.shutdown();
    }

    /// Stops accepting requests and waits until the scheduler has exited.
    ///
    /// A batch in flight completes normally; everything still queued receives
    /// [`BatchError::ShuttingDown`].
    pub async fn shutdown(&mut self) {
        self.handle.shutdown();
        self.handle.join().await;
        info!("translation batcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Number of requests waiting to be batched.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time;
    use crate::backend::mock::{EchoClient, FailingClient, GatedClient, PanickingClient, RecordingClient};

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let result = TranslationBatcher::new(EchoClient, BatchConfig::default().with_max_batch_size(0));
        assert!(matches!(result, Err(ConfigError::ZeroBatchSize)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_round_trip() {
        let mut batcher = TranslationBatcher::new(EchoClient, BatchConfig::default()).unwrap();

        let translation = batcher.translate(vec![1, 2, 3]).await.unwrap();

        assert_eq!(translation.tokens, vec![3, 2, 1]);
        assert_eq!(batcher.stats().requests_completed, 1);
        batcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_requests_batched_after_max_wait() {
        let client = Arc::new(RecordingClient::default());
        let config = BatchConfig::default()
            .with_max_batch_size(4)
            .with_max_wait_ms(50);
        let mut batcher = TranslationBatcher::new(client.clone(), config).unwrap();
        let start = time::Instant::now();

        let a = batcher.submit(vec![1, 2, 3]).unwrap();
        time::sleep(Duration::from_millis(4)).await;
        let b = batcher.submit(vec![4]).unwrap();
        time::sleep(Duration::from_millis(4)).await;
        let c = batcher.submit(vec![5, 6, 7, 8, 9]).unwrap();

        let (a, b, c) = (a.await.unwrap(), b.await.unwrap(), c.await.unwrap());

        assert_eq!(client.batch_sizes(), vec![3]);
        let waited = client.dispatch_times()[0].duration_since(start);
        assert!(waited >= Duration::from_millis(50), "dispatched after {:?}", waited);
        assert!(waited < Duration::from_millis(60), "dispatched after {:?}", waited);
        assert_eq!(a.tokens, vec![3, 2, 1]);
        assert_eq!(b.tokens, vec![4]);
        assert_eq!(c.tokens, vec![9, 8, 7, 6, 5]);

        batcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_full_backpressure() {
        let client = Arc::new(GatedClient::default());
        let config = BatchConfig::default()
            .with_max_batch_size(1)
            .with_max_wait_ms(0)
            .with_queue_high_water_mark(2);
        let mut batcher = TranslationBatcher::new(client.clone(), config).unwrap();

        // Occupies the scheduler so nothing else drains
        let in_flight = batcher.submit(vec![1]).unwrap();
        client.wait_until_called().await;

        let queued = [batcher.submit(vec![2]).unwrap(), batcher.submit(vec![3]).unwrap()];
        assert_eq!(batcher.pending(), 2);
        assert!(matches!(
            batcher.submit(vec![4]),
            Err(BatchError::QueueFull { capacity: 2 })
        ));
        assert_eq!(batcher.stats().requests_rejected, 1);

        for _ in 0..3 {
            client.release();
        }
        assert!(in_flight.await.is_ok());
        for destination in queued {
            assert!(destination.await.is_ok());
        }

        // Below the mark again
        client.release();
        assert!(batcher.translate(vec![5]).await.is_ok());
        batcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_limit() {
        let mut batcher = TranslationBatcher::new(
            EchoClient,
            BatchConfig::default().with_max_input_tokens(4),
        )
        .unwrap();

        assert!(matches!(
            batcher.submit(vec![0; 5]),
            Err(BatchError::InputTooLong { len: 5, limit: 4 })
        ));
        assert!(batcher.translate(vec![0; 4]).await.is_ok());
        batcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_inference_failure_reaches_every_caller() {
        let mut batcher = TranslationBatcher::new(
            FailingClient,
            BatchConfig::default().with_max_batch_size(3),
        )
        .unwrap();

        let destinations: Vec<_> = (0..3).map(|i| batcher.submit(vec![i]).unwrap()).collect();
        for destination in destinations {
            assert!(matches!(destination.await, Err(BatchError::InferenceFailed(_))));
        }
        assert_eq!(batcher.stats().batches_failed, 1);
        batcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_model_does_not_strand_callers() {
        let config = BatchConfig::default()
            .with_max_batch_size(1)
            .with_max_wait_ms(0);
        let mut batcher = TranslationBatcher::new(PanickingClient, config).unwrap();

        let in_flight = batcher.submit(vec![1]).unwrap();
        let queued = batcher.submit(vec![2]).unwrap();

        assert!(matches!(in_flight.await, Err(BatchError::InferenceFailed(_))));
        assert!(matches!(queued.await, Err(BatchError::InferenceFailed(_))));

        // The scheduler survived and still serves new work
        assert!(batcher.is_running());
        assert!(matches!(
            batcher.translate(vec![3]).await,
            Err(BatchError::InferenceFailed(_))
        ));
        batcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_languages_are_batched_apart() {
        let client = Arc::new(RecordingClient::default());
        let mut batcher = TranslationBatcher::new(client.clone(), BatchConfig::default()).unwrap();

        let fr = batcher
            .submit_request(TranslationRequest::new(vec![1, 2]).with_target_lang("fra_Latn"))
            .unwrap();
        let de = batcher
            .translate_request(TranslationRequest::new(vec![3]).with_target_lang("deu_Latn"))
            .await
            .unwrap();

        assert_eq!(de.tokens, vec![3]);
        assert_eq!(fr.await.unwrap().tokens, vec![2, 1]);
        assert_eq!(client.batch_sizes(), vec![1, 1]);
        batcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_fails_queued_requests() {
        let client = Arc::new(GatedClient::default());
        let config = BatchConfig::default()
            .with_max_batch_size(1)
            .with_max_wait_ms(0);
        let mut batcher = TranslationBatcher::new(client.clone(), config).unwrap();

        let in_flight = batcher.submit(vec![1, 2]).unwrap();
        client.wait_until_called().await;
        let queued = [batcher.submit(vec![3]).unwrap(), batcher.submit(vec![4]).unwrap()];

        batcher.signal_shutdown();
        assert!(!batcher.is_running());
        assert!(matches!(batcher.submit(vec![5]), Err(BatchError::Closed)));

        client.release();
        assert_eq!(in_flight.await.unwrap().tokens, vec![2, 1]);
        for destination in queued {
            assert!(matches!(destination.await, Err(BatchError::ShuttingDown)));
        }

        batcher.shutdown().await;
        assert_eq!(client.batch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_fails_queued_requests() {
        let client = Arc::new(GatedClient::default());
        let config = BatchConfig::default()
            .with_max_batch_size(1)
            .with_max_wait_ms(0);
        let batcher = TranslationBatcher::new(client.clone(), config).unwrap();

        let in_flight = batcher.submit(vec![1]).unwrap();
        client.wait_until_called().await;
        let queued = batcher.submit(vec![2]).unwrap();

        drop(batcher);
        client.release();

        assert!(in_flight.await.is_ok());
        assert!(matches!(queued.await, Err(BatchError::ShuttingDown)));
    }
}
