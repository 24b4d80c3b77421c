//! The pending-request buffer shared between callers and the scheduler.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use tokio::time::{Instant, timeout_at};
use tracing::trace;
use crate::communication::{QueueItem, ResultDestination};
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::request::TranslationRequest;

#[derive(Default)]
struct QueueState {
    items: VecDeque<QueueItem>,
    closed: bool,
}

/// # RequestQueue
///
/// A FIFO of pending requests with many producers and a single drainer.
///
/// `enqueue` never blocks: it takes a short lock, appends, and wakes the drainer.
/// `drain` is reserved for the scheduler and waits until a batch is worth
/// dispatching. The buffer lock is never held across an await.
pub struct RequestQueue {
    state: Mutex<QueueState>,
    notifier: Notify,
    high_water_mark: usize,
    idle_wait: Duration,
}

impl RequestQueue {
    /// Creates a queue that refuses new work once `high_water_mark` requests are pending.
    ///
    /// `idle_wait` bounds how long `drain` waits on an empty queue before returning an
    /// empty set, so the scheduler can re-check for shutdown.
    pub fn new(high_water_mark: usize, idle_wait: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notifier: Notify::new(),
            high_water_mark,
            idle_wait,
        }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.queue_high_water_mark, config.idle_poll_interval)
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // The state is a plain buffer, a panicking holder cannot leave it half-written
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `request` and returns the destination its outcome will be delivered to.
    ///
    /// The request's `enqueue_time` is reset here, so the `max_wait` clock starts when
    /// the request enters the queue rather than when it was built.
    ///
    /// # Errors
    ///
    /// * [`BatchError::Closed`] once the queue has been closed
    /// * [`BatchError::QueueFull`] when `high_water_mark` requests are already pending
    pub fn enqueue(&self, mut request: TranslationRequest) -> Result<ResultDestination, BatchError> {
        let id = request.id();
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.lock();
            if state.closed {
                return Err(BatchError::Closed);
            }
            if state.items.len() >= self.high_water_mark {
                return Err(BatchError::QueueFull {
                    capacity: self.high_water_mark,
                });
            }
            request.stamp_enqueued();
            state.items.push_back(QueueItem::new(request, tx));
        }
        trace!(request_id = %id, "enqueued request");
        self.notifier.notify_one();
        Ok(ResultDestination::new(id, rx))
    }

    /// Waits for a batch's worth of requests and removes them in FIFO order.
    ///
    /// A batch only holds requests sharing the target language of the oldest pending
    /// request; requests for other languages keep their place in the queue. Returns as
    /// soon as `max_count` such requests are pending, or once `max_wait` has elapsed
    /// since the oldest pending request was enqueued, whichever comes first. A request
    /// that already waited longer than `max_wait` (for example behind a long inference
    /// call) is dispatched without further delay.
    ///
    /// # Returns
    ///
    /// Between `1` and `max_count` items, or an empty vector if the queue stayed empty
    /// for the whole idle wait or has been closed.
    pub async fn drain(&self, max_count: usize, max_wait: Duration) -> Vec<QueueItem> {
        let max_count = max_count.max(1);
        let idle_deadline = Instant::now() + self.idle_wait;

        loop {
            // Registered before inspecting the state so an enqueue in between is not missed
            let notified = self.notifier.notified();

            let deadline = {
                let mut state = self.lock();
                if state.closed {
                    return Vec::new();
                }
                let oldest = state.items.front().map(|item| {
                    let request = item.request();
                    (request.enqueue_time(), request.target_lang().map(str::to_owned))
                });
                match oldest {
                    None => idle_deadline,
                    Some((enqueued, target_lang)) => {
                        let deadline = enqueued + max_wait;
                        let ready = state
                            .items
                            .iter()
                            .filter(|item| item.request().target_lang() == target_lang.as_deref())
                            .count();
                        if ready >= max_count || Instant::now() >= deadline {
                            return take_matching(&mut state.items, target_lang.as_deref(), max_count);
                        }
                        deadline
                    }
                }
            };

            if timeout_at(deadline, notified).await.is_err() && self.is_empty() {
                // Idle wait elapsed with nothing to do
                return Vec::new();
            }
        }
    }

    /// Stops accepting requests and wakes the drainer. Pending requests stay queued.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notifier.notify_one();
    }

    /// Closes the queue and removes every pending request.
    pub fn close_and_take_all(&self) -> Vec<QueueItem> {
        let items = {
            let mut state = self.lock();
            state.closed = true;
            state.items.drain(..).collect()
        };
        self.notifier.notify_one();
        items
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }
}

// Removes up to `max_count` items for `target_lang`, keeping the order of both the
// taken and the remaining items.
fn take_matching(items: &mut VecDeque<QueueItem>, target_lang: Option<&str>, max_count: usize) -> Vec<QueueItem> {
    let mut taken = Vec::with_capacity(max_count.min(items.len()));
    let mut rest = VecDeque::with_capacity(items.len());
    for item in items.drain(..) {
        if taken.len() < max_count && item.request().target_lang() == target_lang {
            taken.push(item);
        } else {
            rest.push_back(item);
        }
    }
    *items = rest;
    taken
}
