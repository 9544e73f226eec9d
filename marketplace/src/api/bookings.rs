//! Booking API endpoints.
//!
//! - POST /api/bookings - Request a stay (tenant)
//! - GET /api/bookings/owner - Bookings on the caller's listings, pending first
//! - GET /api/bookings/my-bookings - The caller's own bookings
//! - POST /api/bookings/my-bookings/seen - Acknowledge status changes
//! - GET /api/bookings/:id - One booking (tenant or listing owner)
//! - PUT /api/bookings/:id/status - Confirm or reject (listing owner)

use super::{UpdatedResponse, failure};
use crate::auth::AuthUser;
use crate::metrics;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::NaiveDate;
use rental_market_core::booking::{BookingRequest, Decision, OwnerBooking};
use rental_market_core::types::{Booking, BookingId, ListingId};
use rental_market_web::WebResult;
use rental_market_web::extractors::{JsonBody, PathParams};
use serde::Deserialize;
use std::str::FromStr;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to book a listing.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Listing to book
    pub listing_id: ListingId,
    /// First night (`YYYY-MM-DD`)
    pub start_date: NaiveDate,
    /// Departure day, exclusive (`YYYY-MM-DD`)
    pub end_date: NaiveDate,
}

/// Owner decision on a pending booking.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// `confirmed` or `rejected`
    pub status: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Request a stay.
///
/// # Status Codes
///
/// - 201 Created: booking is `pending`
/// - 403 Forbidden: the caller owns the listing
/// - 404 Not Found: listing missing or not active
/// - 409 Conflict: dates overlap a blocking booking
/// - 422 Unprocessable Entity: `start_date` is not before `end_date`
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/bookings \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"listing_id": "550e8400-...", "start_date": "2024-01-01", "end_date": "2024-01-05"}'
/// ```
pub async fn create_booking(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateBookingRequest>,
) -> WebResult<(StatusCode, Json<Booking>)> {
    let booking = state
        .bookings
        .request_booking(BookingRequest {
            listing_id: request.listing_id,
            tenant_id: actor.id,
            start_date: request.start_date,
            end_date: request.end_date,
        })
        .await
        .map_err(failure(&state, "request_booking", Some(actor.id)))?;

    metrics::record_booking(booking.status);
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Confirm or reject a pending booking.
///
/// # Status Codes
///
/// - 200 OK: booking decided
/// - 400 Bad Request: booking was already decided
/// - 403 Forbidden: the caller does not own the listing
/// - 409 Conflict: confirming would overlap a confirmed booking
/// - 422 Unprocessable Entity: status is neither `confirmed` nor `rejected`
pub async fn update_status(
    PathParams(booking_id): PathParams<BookingId>,
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UpdateStatusRequest>,
) -> WebResult<Json<Booking>> {
    let decision = Decision::from_str(&request.status)?;
    let booking = state
        .bookings
        .decide_booking(booking_id, actor.id, decision)
        .await
        .map_err(failure(&state, "decide_booking", Some(actor.id)))?;

    metrics::record_booking(booking.status);
    Ok(Json(booking))
}

/// Bookings on the caller's listings.
pub async fn owner_bookings(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<OwnerBooking>>> {
    let bookings = state
        .bookings
        .owner_bookings(actor.id)
        .await
        .map_err(failure(&state, "owner_bookings", Some(actor.id)))?;
    Ok(Json(bookings))
}

/// The caller's own bookings, newest first.
pub async fn my_bookings(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<Booking>>> {
    let bookings = state
        .bookings
        .tenant_bookings(actor.id)
        .await
        .map_err(failure(&state, "tenant_bookings", Some(actor.id)))?;
    Ok(Json(bookings))
}

/// Acknowledge every status change of the caller's bookings.
pub async fn mark_seen(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<UpdatedResponse>> {
    let updated = state
        .bookings
        .mark_status_updates_seen(actor.id)
        .await
        .map_err(failure(&state, "mark_status_updates_seen", Some(actor.id)))?;
    Ok(Json(UpdatedResponse { updated }))
}

/// One booking, visible to its tenant and the listing owner.
pub async fn get_booking(
    PathParams(booking_id): PathParams<BookingId>,
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Booking>> {
    let booking = state
        .bookings
        .get_booking(booking_id, actor.id)
        .await
        .map_err(failure(&state, "get_booking", Some(actor.id)))?;
    Ok(Json(booking))
}
