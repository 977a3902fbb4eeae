use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use screensage_core::{BroadcastEvent, SageError};
use screensage_history::HistoryStore;

pub type SubscriberId = Uuid;

/// Bounded queue depth per subscriber. A viewer that falls this far behind
/// is dropped rather than stalling delivery (drop the subscriber, never
/// the event).
pub const SUBSCRIBER_QUEUE_SIZE: usize = 64;

/// Thread-safe set of live notification channels, one per connected viewer.
///
/// The inner mutex is the single serialization point for the subscriber
/// set: attach, detach, and delivery iteration all take it, so an attach
/// (with its history replay) can never interleave with a broadcast — a new
/// subscriber misses nothing and sees nothing twice.
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<BroadcastEvent>>>,
    store: Arc<dyn HistoryStore>,
    replay_limit: usize,
}

impl SubscriberRegistry {
    pub fn new(store: Arc<dyn HistoryStore>, replay_limit: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            store,
            replay_limit,
        }
    }

    /// Register a new subscriber and queue its `history_snapshot` replay.
    /// Both happen under the registry lock, atomically with respect to any
    /// concurrent `broadcast`.
    pub async fn attach(
        &self,
    ) -> Result<(SubscriberId, mpsc::Receiver<BroadcastEvent>), SageError> {
        let mut subscribers = self.subscribers.lock().await;
        let records = self.store.recent(self.replay_limit).await?;

        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_SIZE);
        // capacity is always available on a fresh channel
        let _ = tx.try_send(BroadcastEvent::HistorySnapshot { records });

        let id = Uuid::new_v4();
        subscribers.insert(id, tx);
        debug!(subscriber = %id, total = subscribers.len(), "viewer attached");
        Ok((id, rx))
    }

    /// Remove a subscriber explicitly (viewer disconnect).
    pub async fn detach(&self, id: &SubscriberId) {
        let mut subscribers = self.subscribers.lock().await;
        if subscribers.remove(id).is_some() {
            debug!(subscriber = %id, total = subscribers.len(), "viewer detached");
        }
    }

    /// Deliver one event to every live subscriber. A subscriber whose queue
    /// is closed or full is removed immediately; delivery to the rest
    /// continues. Returns the number of subscribers still attached.
    pub async fn broadcast(&self, event: &BroadcastEvent) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        let mut dead = Vec::new();
        for (id, tx) in subscribers.iter() {
            if tx.try_send(event.clone()).is_err() {
                dead.push(*id);
            }
        }
        for id in &dead {
            subscribers.remove(id);
            warn!(subscriber = %id, "dropping unresponsive viewer");
        }
        subscribers.len()
    }

    pub async fn len(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}
