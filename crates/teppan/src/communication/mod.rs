mod destination;
mod queue_item;

pub use destination::ResultDestination;
pub use queue_item::{Outcome, QueueItem};
