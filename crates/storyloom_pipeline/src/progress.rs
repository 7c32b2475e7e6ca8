//! Progress Channel: per-item event topics plus on-demand status snapshots.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use storyloom_core::{ItemId, ProgressEvent, StageKind, StatusSnapshot};
use storyloom_error::RepositoryError;
use storyloom_interface::{ContentItemStore, EventBus, EventStream, SegmentStore};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, trace, warn};

const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// In-process [`EventBus`] with one broadcast channel per topic.
///
/// Delivery is at-most-once. Events published while nobody listens are
/// dropped, and a subscriber that falls more than the topic capacity behind
/// skips the overflow.
#[derive(Debug)]
pub struct BroadcastEventBus {
    topics: Mutex<HashMap<String, broadcast::Sender<ProgressEvent>>>,
    capacity: usize,
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastEventBus {
    /// Bus with the default per-topic buffer.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    /// Bus buffering up to `capacity` events per topic.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Topics with a live channel.
    pub fn topic_count(&self) -> usize {
        self.topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl EventBus for BroadcastEventBus {
    fn publish(&self, topic: &str, event: ProgressEvent) -> usize {
        let mut topics = self
            .topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(sender) = topics.get(topic) else {
            trace!(topic, "No subscribers, event dropped");
            return 0;
        };
        match sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(topic, "Last subscriber left, closing topic");
                topics.remove(topic);
                0
            }
        }
    }

    fn subscribe(&self, topic: &str) -> EventStream {
        let receiver = {
            let mut topics = self
                .topics
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            topics
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };
        let topic = topic.to_string();
        Box::pin(
            BroadcastStream::new(receiver).filter_map(move |received| match received {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(topic = %topic, skipped, "Subscriber lagged, events skipped");
                    None
                }
            }),
        )
    }
}

/// Publishes item events and answers status queries.
///
/// Snapshots are recomputed from the segment store on every call, so a
/// late subscriber can catch up without replay.
#[derive(Clone)]
pub struct ProgressChannel {
    bus: Arc<dyn EventBus>,
    items: Arc<dyn ContentItemStore>,
    segments: Arc<dyn SegmentStore>,
}

impl ProgressChannel {
    /// Channel over the given transport and stores.
    pub fn new(
        bus: Arc<dyn EventBus>,
        items: Arc<dyn ContentItemStore>,
        segments: Arc<dyn SegmentStore>,
    ) -> Self {
        Self {
            bus,
            items,
            segments,
        }
    }

    /// Topic name for an item.
    pub fn topic(item_id: ItemId) -> String {
        item_id.to_string()
    }

    /// Publish on the event's item topic. Returns the number of receivers.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        let topic = Self::topic(event.item_id());
        if event.is_error() {
            debug!(topic = %topic, ?event, "Publishing error event");
        } else {
            trace!(topic = %topic, ?event, "Publishing event");
        }
        self.bus.publish(&topic, event)
    }

    /// Stream of future events for one item.
    pub fn subscribe(&self, item_id: ItemId) -> EventStream {
        self.bus.subscribe(&Self::topic(item_id))
    }

    /// Current aggregate counts for an item.
    ///
    /// An unknown item yields a snapshot with no stage and zero counts.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn snapshot(&self, item_id: ItemId) -> Result<StatusSnapshot, RepositoryError> {
        let stage = self.items.get(item_id).await?.map(|item| item.stage);
        let images = self
            .segments
            .count_by_status(item_id, StageKind::Image)
            .await?;
        let audio = self
            .segments
            .count_by_status(item_id, StageKind::Audio)
            .await?;
        Ok(StatusSnapshot::new(item_id, stage, images, audio))
    }
}

impl std::fmt::Debug for ProgressChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressChannel").finish_non_exhaustive()
    }
}
