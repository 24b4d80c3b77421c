//! # Teppan
//!
//! Dynamic request batching for sequence-to-sequence model inference.
//!
//! ## Overview
//!
//! Many concurrent callers each submit one tokenized sentence. Teppan collects those
//! requests into batches, pads them to a common length, runs a single inference call
//! per batch and routes each output row back to the caller that submitted it.
//!
//! A batch is dispatched as soon as it is full (`max_batch_size`) or the oldest request
//! in it has waited `max_wait`, whichever comes first. Under light load requests pay at
//! most `max_wait` of extra latency; under heavy load every call is a full batch.
//!
//! Key components include:
//!
//! - A bounded [`RequestQueue`] with a high-water mark for backpressure
//! - A [`PaddedBatchBuilder`] producing padded ids plus an attention mask
//! - A single [`BatchScheduler`] control loop driving an [`InferenceClient`]
//! - A [`ResultDemux`] mapping output rows back to request ids
//!
//! ## Architecture
//!
//! ### Assumptions
//! Regardless of backend used, teppan lays out batches with two reserved dimensions:
//!  - The `0th` dimension is the batch dimension
//!  - The `1st` dimension is the sequence dimension
//!
//! ### Inference Seam
//!
//! The [`InferenceClient`] trait is the only thing a model has to implement. It
//! receives a padded [`Batch`] and returns one output row per request, in batch order.
//!
//! ```
//! use async_trait::async_trait;
//! use teppan::{Batch, BatchConfig, BatchResult, InferenceClient, InferenceError, TranslationBatcher};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl InferenceClient for Echo {
//!     async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
//!         Ok(BatchResult::new(batch.requests().iter().map(|r| r.tokens().to_vec()).collect()))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut batcher = TranslationBatcher::new(Echo, BatchConfig::default()).unwrap();
//! let translation = batcher.translate(vec![17, 4, 2]).await.unwrap();
//! assert_eq!(translation.tokens, vec![17, 4, 2]);
//! batcher.shutdown().await;
//! # }
//! ```
//!
//! ## Features
//!
//! - **candle** - Enables the candle model adapter
//! - **burn** - Enables the burn model adapter
//!
//! ## Implementation Details
//!
//! Failures are batch-wide: if inference fails, or returns the wrong number of rows,
//! every request in that batch receives the same error and the scheduler moves on.
//! On shutdown the queue stops accepting work, a batch already in flight completes
//! and everything still queued receives [`BatchError::ShuttingDown`].
//!

mod batch;
mod batcher;
mod communication;
mod config;
mod error;
mod pool;
mod request;
mod stats;
mod tensor;

pub mod backend;
pub mod core;

/// Constants for client reference
pub use tensor::constant;

/// Vocabulary index of a single token
pub type TokenId = u32;

pub use batch::{Batch, BatchResult, PaddedBatchBuilder, ResultDemux};
pub use batcher::TranslationBatcher;
pub use communication::{Outcome, QueueItem, ResultDestination};
pub use config::BatchConfig;
pub use self::core::client::InferenceClient;
pub use self::core::queue::RequestQueue;
pub use self::core::scheduler::{BatchScheduler, SchedulerState};
pub use error::{BatchError, ConfigError, InferenceError, InferencePanic};
pub use pool::translate_all;
pub use request::{RequestId, Translation, TranslationRequest};
pub use stats::{SchedulerStats, StatsSnapshot};
pub use tensor::Matrix;
