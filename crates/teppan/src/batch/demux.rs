use crate::error::BatchError;
use crate::request::RequestId;
use crate::TokenId;
use super::builder::Batch;

/// Per-request outputs of one inference call, in the batch's row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub outputs: Vec<Vec<TokenId>>,
}

impl BatchResult {
    pub fn new(outputs: Vec<Vec<TokenId>>) -> Self {
        Self { outputs }
    }

    /// Builds a result from rectangular model output, dropping trailing `pad_token`s
    /// from each row. Generated sequences come back padded to the longest one.
    pub fn from_padded_rows<R>(rows: R, pad_token: Option<TokenId>) -> Self
    where
        R: IntoIterator<Item = Vec<TokenId>>,
    {
        let outputs = rows
            .into_iter()
            .map(|mut row| {
                if let Some(pad) = pad_token {
                    let keep = row.iter().rposition(|&t| t != pad).map_or(0, |i| i + 1);
                    row.truncate(keep);
                }
                row
            })
            .collect();
        Self { outputs }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Splits a batch's output back into per-request sequences.
pub struct ResultDemux;

impl ResultDemux {
    /// Pairs each output with the id of the request in the same row.
    ///
    /// # Errors
    ///
    /// [`BatchError::ShapeMismatch`] when the number of outputs differs from the number
    /// of requests. The result is never truncated or padded to fit.
    pub fn split(
        batch: &Batch,
        result: BatchResult,
    ) -> Result<Vec<(RequestId, Vec<TokenId>)>, BatchError> {
        if result.len() != batch.len() {
            return Err(BatchError::ShapeMismatch {
                expected: batch.len(),
                actual: result.len(),
            });
        }

        Ok(batch.ids().zip(result.outputs).collect())
    }
}
