//! Messaging API endpoints.
//!
//! - POST /api/messages - Send a message about a listing
//! - GET /api/messages/conversations - Derived conversations, newest activity first
//! - GET /api/messages/:listing_id/:user_id - Thread with one counterparty
//! - PUT /api/messages/:listing_id/:user_id/read - Mark the thread read

use super::{UpdatedResponse, failure};
use crate::auth::AuthUser;
use crate::metrics;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use rental_market_core::types::{Conversation, ListingId, Message, UserId};
use rental_market_web::WebResult;
use rental_market_web::extractors::{JsonBody, PathParams};
use serde::Deserialize;

/// Request to send a message.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Listing the message is about
    pub listing_id: ListingId,
    /// Recipient
    pub receiver_id: UserId,
    /// Message body, 1 to 2000 characters
    pub content: String,
}

/// Send a message; the receiver is notified live.
pub async fn send_message(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SendMessageRequest>,
) -> WebResult<(StatusCode, Json<Message>)> {
    let message = state
        .messaging
        .send(actor.id, request.listing_id, request.receiver_id, &request.content)
        .await
        .map_err(failure(&state, "send_message", Some(actor.id)))?;

    metrics::record_message_sent();
    Ok((StatusCode::CREATED, Json(message)))
}

/// The caller's conversations.
pub async fn conversations(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<Conversation>>> {
    let conversations = state
        .messaging
        .conversations(actor.id)
        .await
        .map_err(failure(&state, "conversations", Some(actor.id)))?;
    Ok(Json(conversations))
}

/// Messages between the caller and `user_id` about a listing, oldest first.
pub async fn thread(
    PathParams((listing_id, counterparty_id)): PathParams<(ListingId, UserId)>,
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<Message>>> {
    let messages = state
        .messaging
        .thread(actor.id, listing_id, counterparty_id)
        .await
        .map_err(failure(&state, "thread", Some(actor.id)))?;
    Ok(Json(messages))
}

/// Mark what `user_id` sent the caller about a listing as read.
pub async fn mark_read(
    PathParams((listing_id, counterparty_id)): PathParams<(ListingId, UserId)>,
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<UpdatedResponse>> {
    let updated = state
        .messaging
        .mark_read(actor.id, listing_id, counterparty_id)
        .await
        .map_err(failure(&state, "mark_read", Some(actor.id)))?;
    Ok(Json(UpdatedResponse { updated }))
}
