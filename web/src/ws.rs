//! WebSocket session serving for [`NotificationHub`] subscriptions.
//!
//! Authentication happens before the upgrade; once a socket is open this
//! module only forwards notifications and keeps the connection alive.
//!
//! # Frames
//!
//! **Server → Client (event):**
//! ```json
//! { "event": "new_booking_request_owner", "payload": { ... } }
//! ```
//!
//! **Client → Server:** `ping` (plain text) or `{"type": "ping"}`, answered
//! with `{"event": "pong"}`. Anything else is ignored.
//!
//! [`NotificationHub`]: crate::notifications::NotificationHub

use crate::notifications::Subscription;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Interval between server keep-alive pings.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Default ceiling on concurrently open sockets.
pub const MAX_CONNECTIONS: usize = 1000;

const PONG_FRAME: &str = r#"{"event":"pong"}"#;

/// Counts open sockets and refuses new ones past a ceiling.
#[derive(Clone, Debug)]
pub struct ConnectionLimiter {
    active: Arc<AtomicUsize>,
    max: usize,
}

impl ConnectionLimiter {
    /// Limiter allowing `max` concurrent sessions.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            max,
        }
    }

    /// Reserve a slot, or `None` when the ceiling is reached.
    #[must_use]
    pub fn try_acquire(&self) -> Option<ConnectionPermit> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max).then_some(n + 1)
            })
            .ok()
            .map(|_| ConnectionPermit {
                active: Arc::clone(&self.active),
            })
    }

    /// Sessions currently holding a permit.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

impl Default for ConnectionLimiter {
    fn default() -> Self {
        Self::new(MAX_CONNECTIONS)
    }
}

/// A reserved connection slot, released on drop.
#[derive(Debug)]
pub struct ConnectionPermit {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientFrame {
    Ping,
}

fn is_client_ping(text: &str) -> bool {
    let text = text.trim();
    text.eq_ignore_ascii_case("ping")
        || matches!(serde_json::from_str::<ClientFrame>(text), Ok(ClientFrame::Ping))
}

/// Pump `subscription` into `socket` until either side goes away.
pub async fn serve_session(socket: WebSocket, mut subscription: Subscription, _permit: ConnectionPermit) {
    let (mut sender, mut receiver) = socket.split();
    let mut keepalive = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately.
    keepalive.tick().await;

    info!(channels = ?subscription.keys(), "WebSocket session started");

    loop {
        tokio::select! {
            notification = subscription.next() => {
                let Some(notification) = notification else {
                    debug!("Notification channels closed");
                    break;
                };
                match serde_json::to_string(&notification) {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to encode notification"),
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if is_client_ping(&text)
                            && sender.send(Message::Text(PONG_FRAME.to_string())).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
            _ = keepalive.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    debug!("Client unreachable on keep-alive");
                    break;
                }
            }
        }
    }

    info!(channels = ?subscription.keys(), "WebSocket session closed");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_refuses_past_ceiling() {
        let limiter = ConnectionLimiter::new(2);
        let a = limiter.try_acquire().unwrap();
        let _b = limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.active(), 2);

        drop(a);
        assert_eq!(limiter.active(), 1);
        assert!(limiter.try_acquire().is_some());
    }

    #[test]
    fn test_client_ping_forms() {
        assert!(is_client_ping("ping"));
        assert!(is_client_ping(" PING\n"));
        assert!(is_client_ping(r#"{"type":"ping"}"#));
        assert!(!is_client_ping(r#"{"type":"subscribe"}"#));
        assert!(!is_client_ping("hello"));
    }
}
