//! The burn implementation for backend provision.
//! Burn tensors carry their rank in a const generic; batches are always rank 2
//! `(batch, sequence)` integer tensors.
use std::marker::PhantomData;
use async_trait::async_trait;
use burn::tensor::{Int, Tensor, TensorData, backend::Backend as BurnBackend};
use thiserror::Error;
use crate::batch::{Batch, BatchResult};
use crate::core::client::InferenceClient;
use crate::error::InferenceError;
use crate::TokenId;

/// A generated id that does not fit a [`TokenId`].
#[derive(Debug, Error)]
#[error("model produced invalid token id {0}")]
pub struct InvalidTokenId(pub i64);

/// Converts a batch into `(input_ids, attention_mask)` integer tensors on `device`.
pub fn batch_to_tensors<B>(batch: &Batch, device: &B::Device) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>)
where
    B: BurnBackend,
{
    let shape = [batch.len(), batch.max_len()];
    let ids: Vec<i64> = batch.padded_ids().as_slice().iter().map(|&t| i64::from(t)).collect();
    let mask: Vec<i64> = batch.attention_mask().as_slice().iter().map(|&m| i64::from(m)).collect();

    let input_ids = Tensor::from_data(TensorData::new(ids, shape).convert::<B::IntElem>(), device);
    let attention_mask = Tensor::from_data(TensorData::new(mask, shape).convert::<B::IntElem>(), device);
    (input_ids, attention_mask)
}

/// Reads a `(batch, out_len)` tensor of generated ids back into a [`BatchResult`],
/// stripping trailing `pad_token`s from every row when given.
pub fn tensor_to_result<B>(output: Tensor<B, 2, Int>, pad_token: Option<TokenId>) -> Result<BatchResult, InvalidTokenId>
where
    B: BurnBackend,
{
    let [rows, cols] = output.dims();
    let data = output.into_data();
    let values = data
        .iter::<i64>()
        .map(|v| TokenId::try_from(v).map_err(|_| InvalidTokenId(v)))
        .collect::<Result<Vec<_>, _>>()?;

    let rows = (0..rows).map(|r| values[r * cols..(r + 1) * cols].to_vec());
    Ok(BatchResult::from_padded_rows(rows, pad_token))
}

/// A sequence-to-sequence model running on burn.
#[async_trait]
pub trait BurnSeq2Seq<B>: Send + Sync + 'static
where
    B: BurnBackend,
{
    /// Generates `(batch, out_len)` ids from padded `(batch, max_len)` ids and mask,
    /// decoding every row towards `target_lang`.
    async fn generate(
        &self,
        input_ids: Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        target_lang: Option<&str>,
    ) -> Tensor<B, 2, Int>;
}

/// Adapts a [`BurnSeq2Seq`] model into an [`InferenceClient`].
pub struct BurnInference<M, B>
where
    B: BurnBackend,
{
    model: M,
    device: B::Device,
    output_pad_token: Option<TokenId>,
    _marker: PhantomData<B>,
}

impl<M, B> BurnInference<M, B>
where
    M: BurnSeq2Seq<B>,
    B: BurnBackend,
{
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            output_pad_token: None,
            _marker: PhantomData,
        }
    }

    /// Strips this token from the end of every generated row.
    pub fn with_output_pad_token(mut self, pad_token: TokenId) -> Self {
        self.output_pad_token = Some(pad_token);
        self
    }
}

#[async_trait]
impl<M, B> InferenceClient for BurnInference<M, B>
where
    M: BurnSeq2Seq<B>,
    B: BurnBackend,
{
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
        let (input_ids, attention_mask) = batch_to_tensors::<B>(batch, &self.device);
        let output = self.model.generate(input_ids, attention_mask, batch.target_lang()).await;
        Ok(tensor_to_result(output, self.output_pad_token)?)
    }
}
