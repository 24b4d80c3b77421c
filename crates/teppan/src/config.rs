use std::time::Duration;
use crate::error::ConfigError;
use crate::tensor::constant::DEFAULT_PAD_TOKEN;
use crate::TokenId;

/// # BatchConfig
///
/// Tuning knobs for the batching policy.
///
/// The two settings that shape the latency/throughput trade-off are
/// `max_batch_size`, which bounds compute and memory per batch, and `max_wait`, which
/// bounds how long a request may sit in the queue waiting for peers.
///
/// ```
/// use std::time::Duration;
/// use teppan::BatchConfig;
///
/// let config = BatchConfig::default()
///     .with_max_batch_size(16)
///     .with_max_wait(Duration::from_millis(20))
///     .with_queue_high_water_mark(256);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of requests in a single batch
    pub max_batch_size: usize,

    /// Longest time the oldest pending request waits for more peers before dispatch
    pub max_wait: Duration,

    /// Pending-request count at which `submit` starts failing with `QueueFull`
    pub queue_high_water_mark: usize,

    /// How long an idle scheduler sleeps before re-checking for shutdown
    pub idle_poll_interval: Duration,

    /// Optional upper bound on input length, checked at submission
    pub max_input_tokens: Option<usize>,

    /// Token written into padded positions of `padded_ids`
    pub pad_token: TokenId,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 8,
            max_wait: Duration::from_millis(50),
            queue_high_water_mark: 1024,
            idle_poll_interval: Duration::from_millis(100),
            max_input_tokens: None,
            pad_token: DEFAULT_PAD_TOKEN,
        }
    }
}

impl BatchConfig {
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Same as [`with_max_wait`](Self::with_max_wait), in milliseconds.
    pub fn with_max_wait_ms(self, max_wait_ms: u64) -> Self {
        self.with_max_wait(Duration::from_millis(max_wait_ms))
    }

    pub fn with_queue_high_water_mark(mut self, queue_high_water_mark: usize) -> Self {
        self.queue_high_water_mark = queue_high_water_mark;
        self
    }

    pub fn with_idle_poll_interval(mut self, idle_poll_interval: Duration) -> Self {
        self.idle_poll_interval = idle_poll_interval;
        self
    }

    pub fn with_max_input_tokens(mut self, max_input_tokens: usize) -> Self {
        self.max_input_tokens = Some(max_input_tokens);
        self
    }

    pub fn with_pad_token(mut self, pad_token: TokenId) -> Self {
        self.pad_token = pad_token;
        self
    }

    /// Checks every bound the scheduler relies on.
    ///
    /// `max_wait` may be zero, in which case every drain dispatches whatever is
    /// pending immediately.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.queue_high_water_mark == 0 {
            return Err(ConfigError::ZeroHighWaterMark);
        }
        if self.idle_poll_interval.is_zero() {
            return Err(ConfigError::ZeroIdlePoll);
        }
        if self.max_input_tokens == Some(0) {
            return Err(ConfigError::ZeroInputLimit);
        }
        Ok(())
    }
}
