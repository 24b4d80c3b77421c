//! Error types surfaced by the batching pipeline.

use std::any::Any;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// The error type an [`InferenceClient`](crate::InferenceClient) reports when a batch
/// could not be computed.
pub type InferenceError = Box<dyn Error + Send + Sync>;

/// Everything that can happen to a translation request between `submit` and delivery.
///
/// `BatchError` is `Clone` because a batch-wide failure ([`BatchError::InferenceFailed`],
/// [`BatchError::ShapeMismatch`]) is handed to every request of that batch.
#[derive(Debug, Clone, Error)]
pub enum BatchError {
    /// The queue no longer accepts work.
    #[error("request queue is closed")]
    Closed,

    /// The queue reached its high-water mark; the caller should retry or drop the request.
    #[error("request queue is full ({capacity} requests pending)")]
    QueueFull {
        capacity: usize,
    },

    /// A batch was requested from zero requests. Internal misuse, never delivered to callers.
    #[error("cannot build a batch from zero requests")]
    EmptyBatch,

    /// A batch was requested from requests with different target languages. Internal
    /// misuse like `EmptyBatch`; the queue never drains such a set.
    #[error("cannot batch requests with different target languages")]
    MixedTargetLanguages,

    /// The inference collaborator returned a different number of outputs than it was given rows.
    #[error("inference returned {actual} outputs for a batch of {expected} requests")]
    ShapeMismatch {
        expected: usize,
        actual: usize,
    },

    /// The inference collaborator reported a failure for the whole batch.
    #[error("inference failed: {0}")]
    InferenceFailed(#[source] Arc<dyn Error + Send + Sync>),

    /// The scheduler shut down before the request was served.
    #[error("batcher shut down before the request was served")]
    ShuttingDown,

    /// The input exceeds the configured `max_input_tokens`.
    #[error("input of {len} tokens exceeds the limit of {limit}")]
    InputTooLong {
        len: usize,
        limit: usize,
    },
}

impl BatchError {
    /// Wraps a collaborator failure so it can be shared across every request of a batch.
    pub fn inference_failed(cause: InferenceError) -> Self {
        BatchError::InferenceFailed(Arc::from(cause))
    }

    /// Whether this error affected a whole batch rather than one request.
    pub fn is_batch_wide(&self) -> bool {
        matches!(self, BatchError::InferenceFailed(_) | BatchError::ShapeMismatch { .. })
    }
}

/// An [`InferenceClient`](crate::InferenceClient) panicked while computing a batch.
///
/// The panic is caught by the scheduler and reported to every request of the batch as
/// [`BatchError::InferenceFailed`].
#[derive(Debug, Error)]
#[error("inference panicked: {message}")]
pub struct InferencePanic {
    message: String,
}

impl InferencePanic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map_or_else(|| "opaque panic payload".to_string(), |s| s.to_string()),
        };
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Rejections raised by [`BatchConfig::validate`](crate::BatchConfig::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("queue_high_water_mark must be greater than zero")]
    ZeroHighWaterMark,

    #[error("idle_poll_interval must be greater than zero")]
    ZeroIdlePoll,

    #[error("max_input_tokens must be greater than zero when set")]
    ZeroInputLimit,
}
