//! In-process notification hub backing the WebSocket endpoint.
//!
//! One `tokio::sync::broadcast` channel per topic (`user:<uuid>`,
//! `admins`). A WebSocket session holds a [`Subscription`] for the channels
//! its account may see; services publish through the [`Notifier`] trait.
//!
//! ```text
//! Service ──publish──> NotificationHub ──broadcast──> Subscription ──> socket
//!                          │
//!                          └── no receiver on topic: event dropped
//! ```

use futures::stream::{self, BoxStream, SelectAll, StreamExt};
use rental_market_core::notify::{ChannelKey, Notification, Notifier};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Per-topic buffer. A session lagging further behind loses the oldest events.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

type Channels = Arc<RwLock<HashMap<String, broadcast::Sender<Notification>>>>;

/// Topic-keyed broadcast hub.
///
/// Clone-cheap; every clone shares the same channels.
#[derive(Clone, Debug)]
pub struct NotificationHub {
    channels: Channels,
    capacity: usize,
}

impl NotificationHub {
    /// Hub with [`DEFAULT_CHANNEL_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Hub whose per-topic buffers hold `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to every channel in `keys`.
    ///
    /// Channels are created on demand and removed again once the last
    /// subscription to them is dropped.
    #[must_use]
    pub fn subscribe(&self, keys: &[ChannelKey]) -> Subscription {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let streams = keys.iter().map(|key| {
            let rx = channels
                .entry(key.topic())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe();
            receiver_stream(key.topic(), rx)
        });

        Subscription {
            hub: self.clone(),
            keys: keys.to_vec(),
            events: stream::select_all(streams),
        }
    }

    /// Number of live subscriptions on `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &ChannelKey) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key.topic())
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of topics with at least one channel allocated.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn release(&self, keys: &[ChannelKey]) {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            let topic = key.topic();
            if channels
                .get(&topic)
                .is_some_and(|tx| tx.receiver_count() == 0)
            {
                channels.remove(&topic);
            }
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationHub {
    fn publish(&self, channel: &ChannelKey, notification: Notification) {
        let topic = channel.topic();
        let event = notification.event;

        let delivered = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .is_some_and(|tx| tx.send(notification).is_ok());

        if delivered {
            debug!(%topic, %event, "Notification published");
        } else {
            debug!(%topic, %event, "No live subscriber, notification dropped");
        }
        metrics::counter!(
            "marketplace_notifications_total",
            "delivered" => if delivered { "true" } else { "false" }
        )
        .increment(1);
    }
}

/// Live feed of the notifications on a set of channels.
pub struct Subscription {
    hub: NotificationHub,
    keys: Vec<ChannelKey>,
    events: SelectAll<BoxStream<'static, Notification>>,
}

impl Subscription {
    /// Next notification on any subscribed channel.
    ///
    /// Returns `None` once every channel has closed.
    pub async fn next(&mut self) -> Option<Notification> {
        self.events.next().await
    }

    /// Channels this subscription listens on.
    #[must_use]
    pub fn keys(&self) -> &[ChannelKey] {
        &self.keys
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Receivers must be gone before the hub can see the channel as empty.
        drop(std::mem::replace(&mut self.events, stream::select_all(Vec::new())));
        self.hub.release(&self.keys);
    }
}

fn receiver_stream(
    topic: String,
    rx: broadcast::Receiver<Notification>,
) -> BoxStream<'static, Notification> {
    stream::unfold((topic, rx), |(topic, mut rx)| async move {
        loop {
            match rx.recv().await {
                Ok(notification) => return Some((notification, (topic, rx))),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%topic, skipped, "Subscriber lagging, skipped notifications");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}
