//! Progress transport.

use futures_util::stream::Stream;
use std::pin::Pin;
use storyloom_core::ProgressEvent;

/// Stream of events delivered to one subscriber.
pub type EventStream = Pin<Box<dyn Stream<Item = ProgressEvent> + Send>>;

/// Topic-scoped publish/subscribe.
///
/// Delivery is best effort: subscribers only see events published while they
/// are subscribed, and a slow subscriber may miss events.
pub trait EventBus: Send + Sync {
    /// Publish an event, returning how many subscribers received it.
    fn publish(&self, topic: &str, event: ProgressEvent) -> usize;

    /// Subscribe to a topic.
    fn subscribe(&self, topic: &str) -> EventStream;
}
