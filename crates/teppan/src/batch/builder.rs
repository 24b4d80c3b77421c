use crate::error::BatchError;
use crate::request::{RequestId, TranslationRequest};
use crate::tensor::Matrix;
use crate::tensor::constant::DEFAULT_PAD_TOKEN;
use crate::TokenId;

/// # Batch
///
/// A rectangular group of right-padded requests, ready for the inference collaborator.
///
/// Row `i` of `padded_ids` and `attention_mask` belongs to `requests()[i]`. That
/// positional correspondence is the only link between a row and its request, since
/// no per-row id travels through the model.
#[derive(Debug, Clone)]
pub struct Batch {
    requests: Vec<TranslationRequest>,
    padded_ids: Matrix<TokenId>,
    attention_mask: Matrix<u8>,
}

impl Batch {
    /// Requests in row order.
    pub fn requests(&self) -> &[TranslationRequest] {
        &self.requests
    }

    /// `[batch_size, max_len]` input ids, right-padded.
    pub fn padded_ids(&self) -> &Matrix<TokenId> {
        &self.padded_ids
    }

    /// `[batch_size, max_len]` mask, `1` over real tokens and `0` over padding.
    pub fn attention_mask(&self) -> &Matrix<u8> {
        &self.attention_mask
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Length of the longest request, i.e. the padded row width.
    pub fn max_len(&self) -> usize {
        self.padded_ids.cols()
    }

    /// Ids in row order.
    pub fn ids(&self) -> impl Iterator<Item = RequestId> + '_ {
        self.requests.iter().map(TranslationRequest::id)
    }

    /// Number of padding positions in the batch.
    pub fn padding_tokens(&self) -> usize {
        self.len() * self.max_len() - self.requests.iter().map(TranslationRequest::len).sum::<usize>()
    }

    /// Target language shared by every request in the batch.
    pub fn target_lang(&self) -> Option<&str> {
        self.requests.first().and_then(TranslationRequest::target_lang)
    }
}

/// Builds [`Batch`]es from variable-length requests using right-padding.
#[derive(Debug, Clone, Copy)]
pub struct PaddedBatchBuilder {
    pad_token: TokenId,
}

impl Default for PaddedBatchBuilder {
    fn default() -> Self {
        Self {
            pad_token: DEFAULT_PAD_TOKEN,
        }
    }
}

impl PaddedBatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `pad_token` instead of `0` for padded id positions.
    /// The attention mask does not depend on the pad value.
    pub fn with_pad_token(pad_token: TokenId) -> Self {
        Self { pad_token }
    }

    /// Packs `requests` into one padded batch, preserving their order.
    ///
    /// # Errors
    ///
    /// * [`BatchError::EmptyBatch`] if `requests` is empty
    /// * [`BatchError::MixedTargetLanguages`] if the requests disagree on their target language
    pub fn build(&self, requests: Vec<TranslationRequest>) -> Result<Batch, BatchError> {
        let Some(first) = requests.first() else {
            return Err(BatchError::EmptyBatch);
        };
        if requests.iter().any(|r| r.target_lang() != first.target_lang()) {
            return Err(BatchError::MixedTargetLanguages);
        }

        let max_len = requests
            .iter()
            .map(TranslationRequest::len)
            .max()
            .unwrap_or_default();

        let mut padded_ids = Matrix::filled(requests.len(), max_len, self.pad_token);
        let mut attention_mask = Matrix::filled(requests.len(), max_len, 0u8);

        for (row, request) in requests.iter().enumerate() {
            let len = request.len();
            padded_ids.row_mut(row)[..len].copy_from_slice(request.tokens());
            attention_mask.row_mut(row)[..len].fill(1);
        }

        Ok(Batch {
            requests,
            padded_ids,
            attention_mask,
        })
    }
}
