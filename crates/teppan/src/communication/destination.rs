use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use crate::error::BatchError;
use crate::request::{RequestId, Translation};
use super::queue_item::Outcome;

/// # ResultDestination
///
/// The caller's half of a request: a single-use future resolving to the request's
/// outcome.
///
/// Awaiting it yields the [`Translation`] or the [`BatchError`] that ended the
/// request. Dropping it abandons the request; if the request is already part of a
/// dispatched batch its output is still computed and then discarded.
#[derive(Debug)]
pub struct ResultDestination {
    /// Id of the request this destination is bound to
    id: RequestId,

    /// The underlying channel receiver
    receiver: oneshot::Receiver<Outcome>,
}

impl ResultDestination {
    pub(crate) fn new(id: RequestId, receiver: oneshot::Receiver<Outcome>) -> Self {
        Self {
            id,
            receiver,
        }
    }

    /// Id of the request whose outcome this destination will receive.
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Future for ResultDestination {
    type Output = Result<Translation, BatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // The sending half only disappears unfulfilled if the scheduler task died
            Poll::Ready(Err(_)) => Poll::Ready(Err(BatchError::ShuttingDown)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_with_sent_outcome() {
        let (tx, rx) = oneshot::channel();
        let id = RequestId::new();
        let destination = ResultDestination::new(id, rx);
        assert_eq!(destination.id(), id);

        let translation = Translation {
            id,
            tokens: vec![9, 8],
            queued: Duration::from_millis(1),
            inference: Duration::from_millis(2),
        };
        tx.send(Ok(translation.clone())).unwrap();

        assert_eq!(destination.await.unwrap(), translation);
    }

    #[tokio::test]
    async fn test_dropped_sender_maps_to_shutting_down() {
        let (tx, rx) = oneshot::channel::<Outcome>();
        let destination = ResultDestination::new(RequestId::new(), rx);
        drop(tx);

        assert!(matches!(destination.await, Err(BatchError::ShuttingDown)));
    }
}
