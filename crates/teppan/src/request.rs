use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;
use crate::TokenId;

/// Opaque unique identifier bound to a request for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// # TranslationRequest
///
/// A single tokenized input waiting to be translated.
///
/// It is owned by the caller until enqueued, then by the queue, then by the in-flight
/// batch. `enqueue_time` is restamped by [`RequestQueue::enqueue`](crate::RequestQueue::enqueue)
/// and is the reference point for both the `max_wait` deadline and the `queued`
/// latency reported in [`Translation`].
///
/// The optional target language is a batch key: the model decodes a whole batch
/// towards one language, so requests with different keys never share a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    id: RequestId,
    tokens: Vec<TokenId>,
    target_lang: Option<String>,
    enqueue_time: Instant,
}

impl TranslationRequest {
    pub fn new(tokens: Vec<TokenId>) -> Self {
        Self {
            id: RequestId::new(),
            tokens,
            target_lang: None,
            enqueue_time: Instant::now(),
        }
    }

    /// Tags the request with the language code the model should decode into,
    /// e.g. `"fra_Latn"`.
    pub fn with_target_lang(mut self, target_lang: impl Into<String>) -> Self {
        self.target_lang = Some(target_lang.into());
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens
    }

    /// Number of input tokens, i.e. the unpadded row length.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn target_lang(&self) -> Option<&str> {
        self.target_lang.as_deref()
    }

    pub fn enqueue_time(&self) -> Instant {
        self.enqueue_time
    }

    pub(crate) fn stamp_enqueued(&mut self) {
        self.enqueue_time = Instant::now();
    }
}

impl From<Vec<TokenId>> for TranslationRequest {
    fn from(tokens: Vec<TokenId>) -> Self {
        Self::new(tokens)
    }
}

/// The successful outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Id of the request this output belongs to
    pub id: RequestId,

    /// Output token ids produced by the model for this request
    pub tokens: Vec<TokenId>,

    /// Time spent in the queue, from enqueue until its batch was dispatched
    pub queued: Duration,

    /// Time the batch spent inside the inference collaborator
    pub inference: Duration,
}

impl Translation {
    /// End-to-end latency as seen by the caller.
    pub fn latency(&self) -> Duration {
        self.queued + self.inference
    }
}
