//! Bounded fan-in of many inputs into one [`TranslationBatcher`].

use futures::stream::{self, StreamExt};
use crate::batcher::TranslationBatcher;
use crate::error::BatchError;
use crate::request::{Translation, TranslationRequest};

/// Translates every input through `batcher`, keeping at most `concurrency` requests
/// outstanding at a time.
///
/// Inputs are token vectors or prepared [`TranslationRequest`]s. Results come back in
/// input order: element `i` is the outcome of input `i`. A `concurrency` of `0` is
/// treated as `1`. Keep `concurrency` at or below the queue's
/// high-water mark, otherwise some inputs may be rejected with
/// [`BatchError::QueueFull`].
///
/// ```no_run
/// # use teppan::{TokenId, TranslationBatcher, translate_all};
/// # async fn run(batcher: &TranslationBatcher) {
/// let sentences: Vec<Vec<TokenId>> = vec![vec![17, 4, 2], vec![99, 2]];
/// for outcome in translate_all(batcher, sentences, 16).await {
///     match outcome {
///         Ok(translation) => println!("{:?} in {:?}", translation.tokens, translation.latency()),
///         Err(err) => eprintln!("failed: {err}"),
///     }
/// }
/// # }
/// ```
pub async fn translate_all<I>(
    batcher: &TranslationBatcher,
    inputs: I,
    concurrency: usize,
) -> Vec<Result<Translation, BatchError>>
where
    I: IntoIterator,
    I::Item: Into<TranslationRequest>,
{
    stream::iter(inputs)
        .map(|input| batcher.translate_request(input.into()))
        .buffered(concurrency.max(1))
        .collect()
        .await
}
