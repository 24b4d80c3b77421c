//! # Model Backends
//!
//! Adapters from tensor libraries to the [`InferenceClient`](crate::InferenceClient)
//! seam. Each adapter turns a padded [`Batch`](crate::Batch) into `(batch, max_len)`
//! id and mask tensors, hands them to a user model and reads the generated ids back
//! into a [`BatchResult`](crate::BatchResult).
//!
//! ## Feature Flags
//!
//! - `candle`: Enables the Candle adapter
//! - `burn`: Enables the Burn adapter
//!
//! Neither is required: any type implementing `InferenceClient` can drive a
//! [`TranslationBatcher`](crate::TranslationBatcher).

#[cfg_attr(docsrs, doc(cfg(feature = "candle")))]
#[cfg(feature = "candle")]
/// Candle model adapter.
///
/// This module is only available when the `candle` feature flag is enabled.
/// Ids are passed as `u32` tensors and the mask as `u8`.
pub mod candle;

#[cfg_attr(docsrs, doc(cfg(feature = "burn")))]
#[cfg(feature = "burn")]
/// Burn model adapter.
///
/// This module is only available when the `burn` feature flag is enabled.
/// Ids and mask are both rank 2 `Int` tensors.
pub mod burn;

#[cfg(test)]
/// Mock inference clients.
///
/// Operate on plain token vectors
pub(crate) mod mock;
