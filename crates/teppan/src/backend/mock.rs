use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;
use crate::batch::{Batch, BatchResult};
use crate::core::client::InferenceClient;
use crate::error::InferenceError;

#[derive(Debug, Error)]
#[error("device out of memory")]
pub struct OutOfMemory;

// Reverses the unpadded part of every row so outputs are distinguishable from inputs
fn reverse_rows(batch: &Batch) -> BatchResult {
    let outputs = batch
        .padded_ids()
        .iter_rows()
        .zip(batch.attention_mask().row_sums())
        .map(|(row, len)| row[..len].iter().rev().copied().collect())
        .collect();
    BatchResult::new(outputs)
}

pub struct EchoClient;

#[async_trait]
impl InferenceClient for EchoClient {
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
        Ok(reverse_rows(batch))
    }
}

pub struct FailingClient;

#[async_trait]
impl InferenceClient for FailingClient {
    async fn infer(&self, _batch: &Batch) -> Result<BatchResult, InferenceError> {
        Err(Box::new(OutOfMemory))
    }
}

pub struct PanickingClient;

#[async_trait]
impl InferenceClient for PanickingClient {
    async fn infer(&self, _batch: &Batch) -> Result<BatchResult, InferenceError> {
        panic!("model crashed")
    }
}

/// Fails the first `failures` calls, then echoes.
pub struct FlakyClient {
    remaining_failures: AtomicUsize,
}

impl FlakyClient {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl InferenceClient for FlakyClient {
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Box::new(OutOfMemory));
        }
        Ok(reverse_rows(batch))
    }
}

/// Returns one output fewer than it was given.
pub struct ShortClient;

#[async_trait]
impl InferenceClient for ShortClient {
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
        let mut result = reverse_rows(batch);
        result.outputs.pop();
        Ok(result)
    }
}

struct RecordedCall {
    size: usize,
    at: Instant,
    target_lang: Option<String>,
}

/// Echoes, recording every batch's size, dispatch time and target language.
#[derive(Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingClient {
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|call| call.size).collect()
    }

    pub fn dispatch_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|call| call.at).collect()
    }

    pub fn target_langs(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().iter().map(|call| call.target_lang.clone()).collect()
    }
}

#[async_trait]
impl InferenceClient for RecordingClient {
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
        self.calls.lock().unwrap().push(RecordedCall {
            size: batch.len(),
            at: Instant::now(),
            target_lang: batch.target_lang().map(str::to_owned),
        });
        Ok(reverse_rows(batch))
    }
}

/// Echoes, but holds every call until [`GatedClient::release`] is called.
pub struct GatedClient {
    called: Notify,
    gate: Semaphore,
    batches: AtomicUsize,
}

impl Default for GatedClient {
    fn default() -> Self {
        Self {
            called: Notify::new(),
            gate: Semaphore::new(0),
            batches: AtomicUsize::new(0),
        }
    }
}

impl GatedClient {
    /// Resolves once a call is waiting at the gate.
    pub async fn wait_until_called(&self) {
        self.called.notified().await;
    }

    /// Lets one waiting call through.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for GatedClient {
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.called.notify_one();
        self.gate.acquire().await?.forget();
        Ok(reverse_rows(batch))
    }
}
