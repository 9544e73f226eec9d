//! API endpoints for the marketplace.
//!
//! This module contains all HTTP API handlers organized by domain:
//! - Accounts: registration, login and the caller's profile
//! - Listings: lifecycle, public search and owner statistics
//! - Bookings: requests, owner decisions and availability
//! - Messages: conversations between tenants and owners
//! - Favorites: bookmarks
//! - Counters: unread/pending badges
//! - Admin: listing moderation
//! - WebSocket: live notifications

pub mod accounts;
pub mod admin;
pub mod bookings;
pub mod counters;
pub mod favorites;
pub mod listings;
pub mod messages;
pub mod websocket;

use crate::server::state::AppState;
use rental_market_core::MarketError;
use rental_market_core::types::UserId;
use rental_market_web::AppError;
use serde::Serialize;

/// Number of rows an acknowledge-style operation touched.
#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    /// Rows updated
    pub updated: u64,
}

/// Map a service error for the HTTP boundary, logging system failures with
/// the operation and the acting user first.
///
/// Internal detail reaches the client only when `state` was built with
/// `expose_internal_errors`.
pub(crate) fn failure(
    state: &AppState,
    operation: &'static str,
    actor_id: Option<UserId>,
) -> impl FnOnce(MarketError) -> AppError {
    let expose_internal = state.expose_internal_errors;
    move |err| {
        if matches!(err, MarketError::Storage(_) | MarketError::Internal(_)) {
            tracing::error!(operation, actor_id = ?actor_id, error = %err, "Operation failed");
        }
        AppError::from_market(err, expose_internal)
    }
}
