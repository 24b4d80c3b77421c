use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use crate::batch::{Batch, BatchResult};
use crate::core::client::InferenceClient;
use crate::error::InferenceError;
use crate::TokenId;

/// Converts a batch into `(input_ids, attention_mask)` tensors on `device`.
///
/// Both tensors have shape `(batch, max_len)`; ids are `u32`, the mask is `u8`.
pub fn batch_to_tensors(batch: &Batch, device: &Device) -> candle_core::Result<(Tensor, Tensor)> {
    let shape = (batch.len(), batch.max_len());
    let input_ids = Tensor::from_slice(batch.padded_ids().as_slice(), shape, device)?;
    let attention_mask = Tensor::from_slice(batch.attention_mask().as_slice(), shape, device)?;
    Ok((input_ids, attention_mask))
}

/// Reads a `(batch, out_len)` tensor of generated ids back into a [`BatchResult`],
/// stripping trailing `pad_token`s from every row when given.
pub fn tensor_to_result(output: &Tensor, pad_token: Option<TokenId>) -> candle_core::Result<BatchResult> {
    let rows = output.to_dtype(DType::U32)?.to_vec2::<u32>()?;
    Ok(BatchResult::from_padded_rows(rows, pad_token))
}

/// A sequence-to-sequence model running on candle.
///
/// `generate` receives the padded `(batch, max_len)` ids and mask, plus the target
/// language shared by every row, and returns the generated ids as a
/// `(batch, out_len)` tensor.
#[async_trait]
pub trait CandleSeq2Seq: Send + Sync + 'static {
    async fn generate(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        target_lang: Option<&str>,
    ) -> candle_core::Result<Tensor>;
}

/// Adapts a [`CandleSeq2Seq`] model into an [`InferenceClient`].
pub struct CandleInference<M> {
    model: M,
    device: Device,
    output_pad_token: Option<TokenId>,
}

impl<M> CandleInference<M>
where
    M: CandleSeq2Seq,
{
    pub fn new(model: M, device: Device) -> Self {
        Self {
            model,
            device,
            output_pad_token: None,
        }
    }

    /// Strips this token from the end of every generated row.
    pub fn with_output_pad_token(mut self, pad_token: TokenId) -> Self {
        self.output_pad_token = Some(pad_token);
        self
    }
}

#[async_trait]
impl<M> InferenceClient for CandleInference<M>
where
    M: CandleSeq2Seq,
{
    async fn infer(&self, batch: &Batch) -> Result<BatchResult, InferenceError> {
        let (input_ids, attention_mask) = batch_to_tensors(batch, &self.device)?;
        let output = self.model.generate(&input_ids, &attention_mask, batch.target_lang()).await?;
        Ok(tensor_to_result(&output, self.output_pad_token)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{PaddedBatchBuilder, ResultDemux};
    use crate::request::TranslationRequest;

    struct Doubler;

    #[async_trait]
    impl CandleSeq2Seq for Doubler {
        async fn generate(
            &self,
            input_ids: &Tensor,
            attention_mask: &Tensor,
            target_lang: Option<&str>,
        ) -> candle_core::Result<Tensor> {
            // Masked positions stay 0 so the output keeps the input's padding
            let mask = attention_mask.to_dtype(DType::U32)?;
            let doubled = input_ids.add(input_ids)?;
            match target_lang {
                // A language-specific offset of one, applied to real tokens only
                Some(_) => doubled.add(&mask)?.mul(&mask),
                None => doubled.mul(&mask),
            }
        }
    }

    fn batch() -> Batch {
        PaddedBatchBuilder::new()
            .build(vec![
                TranslationRequest::new(vec![1, 2, 3]),
                TranslationRequest::new(vec![4]),
            ])
            .unwrap()
    }

    #[test]
    fn test_batch_to_tensors() {
        let (ids, mask) = batch_to_tensors(&batch(), &Device::Cpu).unwrap();

        assert_eq!(ids.dims(), &[2, 3]);
        assert_eq!(ids.dtype(), DType::U32);
        assert_eq!(ids.to_vec2::<u32>().unwrap(), vec![vec![1, 2, 3], vec![4, 0, 0]]);
        assert_eq!(mask.dtype(), DType::U8);
        assert_eq!(mask.to_vec2::<u8>().unwrap(), vec![vec![1, 1, 1], vec![1, 0, 0]]);
    }

    #[test]
    fn test_tensor_to_result_strips_padding() {
        let output = Tensor::new(&[[5u32, 6, 0], [7, 0, 0]], &Device::Cpu).unwrap();

        let result = tensor_to_result(&output, Some(0)).unwrap();

        assert_eq!(result.outputs, vec![vec![5, 6], vec![7]]);
    }

    #[tokio::test]
    async fn test_target_lang_reaches_model() {
        let client = CandleInference::new(Doubler, Device::Cpu).with_output_pad_token(0);
        let batch = PaddedBatchBuilder::new()
            .build(vec![TranslationRequest::new(vec![1, 2]).with_target_lang("fra_Latn")])
            .unwrap();

        let result = client.infer(&batch).await.unwrap();

        assert_eq!(result.outputs, vec![vec![3, 5]]);
    }

    #[tokio::test]
    async fn test_candle_inference_client() {
        let client = CandleInference::new(Doubler, Device::Cpu).with_output_pad_token(0);
        let batch = batch();

        let result = client.infer(&batch).await.unwrap();
        let split = ResultDemux::split(&batch, result).unwrap();

        assert_eq!(split[0], (batch.requests()[0].id(), vec![2, 4, 6]));
        assert_eq!(split[1], (batch.requests()[1].id(), vec![8]));
    }
}
