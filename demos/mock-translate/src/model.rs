use std::time::Duration;
use async_trait::async_trait;
use rand::Rng;
use teppan::{Batch, BatchResult, InferenceClient, InferenceError, TokenId};

pub const EOS_TOKEN: TokenId = 2;
const PAD_TOKEN: TokenId = 0;

/// Stands in for a seq2seq model. A call costs a fixed launch overhead plus a small
/// per-position cost, so larger batches amortize the overhead.
pub struct MockTranslator {
    launch: Duration,
    per_position: Duration,
}

impl MockTranslator {
    pub fn new(launch: Duration, per_position: Duration) -> Self {
        Self { launch, per_position }
    }

    fn cost(&self, batch: &Batch) -> Duration {
        let jitter = rand::thread_rng().gen_range(0..=2);
        self.launch + self.per_position * batch.max_len() as u32 + Duration::from_millis(jitter)
    }
}

#[async_trait]
impl InferenceClient for MockTranslator {
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
        tokio::time::sleep(self.cost(batch)).await;

        // The whole batch decodes towards one language, as with a forced BOS token
        let offset = match batch.target_lang() {
            Some("deu_Latn") => 2000,
            _ => 1000,
        };

        // Output rows come back padded to a common width, like a real generate call
        let width = batch.max_len() + 1;
        let rows = batch.requests().iter().map(|request| {
            let mut row: Vec<TokenId> = request.tokens().iter().rev().map(|t| t + offset).collect();
            row.push(EOS_TOKEN);
            row.resize(width, PAD_TOKEN);
            row
        });
        Ok(BatchResult::from_padded_rows(rows, Some(PAD_TOKEN)))
    }
}
