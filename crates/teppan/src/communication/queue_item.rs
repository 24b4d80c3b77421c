use tokio::sync::oneshot::Sender;
use crate::error::BatchError;
use crate::request::{RequestId, Translation, TranslationRequest};

/// The value delivered through a request's destination.
pub type Outcome = Result<Translation, BatchError>;

/// # QueueItem
///
/// A pending request paired with the channel its outcome must be sent on.
///
/// The sender is consumed on delivery, so each item can be fulfilled at most once.
/// A `QueueItem` lives in the [`RequestQueue`](crate::core::queue::RequestQueue)
/// until drained, then is split by the scheduler into the request (which goes into
/// the batch) and the sender (which waits for the batch's outcome).
#[derive(Debug)]
pub struct QueueItem {
    /// The request to be translated
    request: TranslationRequest,

    /// Channel for sending the outcome back to the requester
    sender: Sender<Outcome>,
}

impl QueueItem {
    pub fn new(request: TranslationRequest, sender: Sender<Outcome>) -> Self {
        Self {
            request,
            sender,
        }
    }

    pub fn id(&self) -> RequestId {
        self.request.id()
    }

    pub fn request(&self) -> &TranslationRequest {
        &self.request
    }

    /// Splits the item into its request and its sender.
    pub fn into_parts(self) -> (TranslationRequest, Sender<Outcome>) {
        (self.request, self.sender)
    }

    /// Delivers `outcome` to the requester.
    ///
    /// # Returns
    ///
    /// `false` if the requester dropped its destination and the outcome was discarded.
    pub fn fulfill(self, outcome: Outcome) -> bool {
        self.sender.send(outcome).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot::channel;
    use tokio::test;

    #[test]
    async fn test_queue_item_fulfill() {
        let (tx, rx) = channel();
        let request = TranslationRequest::new(vec![1, 2, 3]);
        let id = request.id();

        let item = QueueItem::new(request, tx);
        assert_eq!(item.id(), id);
        assert_eq!(item.request().tokens(), &[1, 2, 3]);

        assert!(item.fulfill(Err(BatchError::ShuttingDown)));
        assert!(matches!(rx.await, Ok(Err(BatchError::ShuttingDown))));
    }

    #[test]
    async fn test_fulfill_after_receiver_dropped() {
        let (tx, rx) = channel();
        let item = QueueItem::new(TranslationRequest::new(vec![1]), tx);
        drop(rx);

        assert!(!item.fulfill(Err(BatchError::ShuttingDown)));
    }

    #[test]
    async fn test_into_parts() {
        let (tx, rx) = channel();
        let request = TranslationRequest::new(vec![4]);
        let id = request.id();

        let (request, sender) = QueueItem::new(request, tx).into_parts();
        assert_eq!(request.id(), id);

        sender.send(Err(BatchError::Closed)).unwrap();
        assert!(matches!(rx.await, Ok(Err(BatchError::Closed))));
    }
}
