mod model;

use std::time::{Duration, Instant};
use rand::Rng;
use teppan::{translate_all, BatchConfig, TokenId, TranslationBatcher, TranslationRequest};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use crate::model::{MockTranslator, EOS_TOKEN};

const SENTENCES: usize = 500;
const CONCURRENCY: usize = 64;
const TARGET_LANGS: [&str; 2] = ["fra_Latn", "deu_Latn"];

fn random_request() -> TranslationRequest {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(3..40);
    let tokens: Vec<TokenId> = (0..len).map(|_| rng.gen_range(4..32_000)).collect();
    let target_lang = TARGET_LANGS[rng.gen_range(0..TARGET_LANGS.len())];
    TranslationRequest::new(tokens).with_target_lang(target_lang)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let model = MockTranslator::new(Duration::from_millis(20), Duration::from_micros(200));
    let config = BatchConfig::default()
        .with_max_batch_size(16)
        .with_max_wait_ms(10)
        .with_queue_high_water_mark(256)
        .with_max_input_tokens(128);
    let mut batcher = TranslationBatcher::new(model, config).expect("valid config");

    let requests: Vec<TranslationRequest> = (0..SENTENCES).map(|_| random_request()).collect();
    let start = Instant::now();
    let results = translate_all(&batcher, requests, CONCURRENCY).await;
    let elapsed = start.elapsed();

    let mut latencies = Vec::with_capacity(results.len());
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(translation) => {
                debug_assert_eq!(translation.tokens.last(), Some(&EOS_TOKEN));
                latencies.push(translation.latency());
            }
            Err(err) => warn!(index, %err, "translation failed"),
        }
    }
    latencies.sort();

    let percentile = |p: f64| {
        latencies
            .get(((latencies.len() as f64 * p) as usize).min(latencies.len().saturating_sub(1)))
            .copied()
            .unwrap_or_default()
    };
    let stats = batcher.stats();
    info!(
        completed = latencies.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        throughput = latencies.len() as f64 / elapsed.as_secs_f64(),
        p50_ms = percentile(0.5).as_millis() as u64,
        p99_ms = percentile(0.99).as_millis() as u64,
        "run finished"
    );
    info!(
        batches = stats.batches_dispatched,
        mean_batch_size = stats.mean_batch_size(),
        padding_tokens = stats.padding_tokens,
        "batching summary"
    );

    batcher.shutdown().await;
}
