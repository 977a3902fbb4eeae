use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use screensage_core::BroadcastEvent;

use crate::registry::SubscriberRegistry;

/// Buffer between publishers and the delivery task.
const HUB_QUEUE_SIZE: usize = 256;

/// Single-writer fan-out: publishers hand events to a bounded queue; one
/// dedicated delivery task drains it in publish order and fans each event
/// out through the subscriber registry.
///
/// Events published as `E1, E2` reach every subscriber live at publish
/// time in that relative order; a subscriber attaching between them may
/// see only `E2`. The delivery task exits once every hub handle is gone.
#[derive(Clone)]
pub struct BroadcastHub {
    tx: mpsc::Sender<BroadcastEvent>,
}

impl BroadcastHub {
    /// Spawn the delivery task and return the publish handle.
    pub fn start(registry: Arc<SubscriberRegistry>) -> Self {
        let (tx, mut rx) = mpsc::channel::<BroadcastEvent>(HUB_QUEUE_SIZE);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let remaining = registry.broadcast(&event).await;
                debug!(kind = event.kind(), subscribers = remaining, "event delivered");
            }
            debug!("broadcast hub drained, delivery task exiting");
        });
        Self { tx }
    }

    /// Buffered handoff to the delivery task; the caller never waits on a
    /// slow subscriber.
    pub async fn publish(&self, event: BroadcastEvent) {
        if self.tx.send(event).await.is_err() {
            warn!("delivery task is gone, dropping event");
        }
    }
}
