use std::sync::Arc;
use async_trait::async_trait;
use crate::batch::{Batch, BatchResult};
use crate::error::InferenceError;

/// Defines the sequence-to-sequence model the scheduler dispatches batches to.
///
/// The client receives one padded [`Batch`] and must return one output sequence per
/// row, in row order. It is the only suspension point of the scheduler: while `infer`
/// is outstanding no new batch is collected.
///
/// # Implementation Notes
///
/// Implementations should:
/// * Treat dimension `0` of `padded_ids`/`attention_mask` as the batch dimension
/// * Return exactly `batch.len()` outputs; anything else fails the whole batch with
///   [`BatchError::ShapeMismatch`](crate::BatchError::ShapeMismatch)
/// * Report failures through `Err` rather than panicking; an error fails every request
///   of the batch and is never retried
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use teppan::{Batch, BatchResult, InferenceClient, InferenceError};
///
/// struct Echo;
///
/// #[async_trait]
/// impl InferenceClient for Echo {
///     async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
///         let outputs = batch.requests().iter().map(|r| r.tokens().to_vec()).collect();
///         Ok(BatchResult::new(outputs))
///     }
/// }
/// ```
#[async_trait]
pub trait InferenceClient: Send + Sync + 'static {
    /// Runs the model on `batch`.
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError>;
}

#[async_trait]
impl<C> InferenceClient for Arc<C>
where
    C: InferenceClient + ?Sized,
{
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
        (**self).infer(batch).await
    }
}

#[async_trait]
impl<C> InferenceClient for Box<C>
where
    C: InferenceClient + ?Sized,
{
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
        (**self).infer(batch).await
    }
}
