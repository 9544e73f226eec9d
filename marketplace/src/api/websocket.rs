//! WebSocket endpoint for live notifications.
//!
//! # Connection
//!
//! ```text
//! ws://localhost:8080/api/ws?token=<jwt>
//! ```
//!
//! The token may also be sent as `Authorization: Bearer <jwt>` by clients
//! that can set handshake headers. Every session receives the caller's own
//! events; admin sessions additionally receive moderation events.
//!
//! ## Message Format
//!
//! **Server → Client:**
//! ```json
//! {
//!   "event": "new_booking_request_owner",
//!   "payload": { "booking": { ... }, "listing_id": "550e8400-...", "listing_title": "..." }
//! }
//! ```
//!
//! **Client → Server:** `ping` or `{"type": "ping"}`, answered with
//! `{"event": "pong"}`.
//!
//! ## Connection Limits
//!
//! - Concurrent sessions are capped (`WS_MAX_CONNECTIONS`); past the cap the
//!   handshake is refused with 503
//! - Ping keep-alive every 30 seconds

use crate::auth::AuthUser;
use crate::metrics;
use crate::server::state::AppState;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use rental_market_core::notify::ChannelKey;
use rental_market_web::ws::serve_session;
use rental_market_web::{AppError, WebResult};
use tracing::warn;

/// Upgrade to a notification session for the authenticated caller.
///
/// The subscription is registered before the upgrade completes, so nothing
/// published after a 101 response is missed.
pub async fn connect(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> WebResult<Response> {
    let Some(permit) = state.connections.try_acquire() else {
        warn!(user_id = %actor.id, "WebSocket connection limit reached");
        metrics::record_ws_rejected();
        return Err(AppError::unavailable("Too many open connections"));
    };

    let mut channels = vec![ChannelKey::User(actor.id)];
    if actor.is_admin() {
        channels.push(ChannelKey::Admins);
    }
    let subscription = state.hub.subscribe(&channels);

    Ok(ws.on_upgrade(move |socket| serve_session(socket, subscription, permit)))
}
