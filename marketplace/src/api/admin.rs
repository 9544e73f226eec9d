//! Moderation API endpoints (admin only).
//!
//! - GET /api/admin/listings/pending - Listings awaiting moderation, oldest first
//! - PUT /api/admin/listings/:id/status - Approve (`active`) or reject (`rejected`)

use super::failure;
use crate::auth::RequireAdmin;
use crate::metrics;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use rental_market_core::types::{Listing, ListingId, ListingStatus};
use rental_market_web::WebResult;
use rental_market_web::extractors::{JsonBody, PathParams};
use serde::Deserialize;
use std::str::FromStr;

/// Moderation decision.
#[derive(Debug, Deserialize)]
pub struct ModerateRequest {
    /// `active` or `rejected`
    pub status: String,
}

/// Listings awaiting moderation.
pub async fn pending_listings(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<Listing>>> {
    let listings = state
        .listings
        .pending(admin)
        .await
        .map_err(failure(&state, "pending_listings", Some(admin.id)))?;
    Ok(Json(listings))
}

/// Approve or reject a pending listing; the owner is notified.
pub async fn moderate_listing(
    PathParams(listing_id): PathParams<ListingId>,
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ModerateRequest>,
) -> WebResult<Json<Listing>> {
    let status = ListingStatus::from_str(&request.status)?;
    let listing = state
        .listings
        .moderate(listing_id, admin, status)
        .await
        .map_err(failure(&state, "moderate_listing", Some(admin.id)))?;

    metrics::record_listing(listing.status);
    Ok(Json(listing))
}
