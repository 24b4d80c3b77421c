//! # Batch Construction
//!
//! Turning requests into a rectangular model input and turning the model's output
//! back into per-request results.
//!
//! * [`PaddedBatchBuilder`] right-pads a set of token sequences into a [`Batch`]
//!   with a matching attention mask.
//! * [`ResultDemux`] pairs each row of a [`BatchResult`] with the request that
//!   occupied the same row of the batch.
//!
//! Both are pure. Row order fixed at build time is the only thing that ties an output
//! back to its request.

mod builder;
mod demux;

pub use builder::{Batch, PaddedBatchBuilder};
pub use demux::{BatchResult, ResultDemux};
