//! Favorite API endpoints.
//!
//! - GET /api/favorites - Bookmarked active listings, newest first
//! - POST /api/favorites/:listing_id - Bookmark a listing
//! - DELETE /api/favorites/:listing_id - Remove a bookmark

use super::failure;
use crate::auth::AuthUser;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use rental_market_core::types::{Favorite, Listing, ListingId};
use rental_market_web::WebResult;
use rental_market_web::extractors::PathParams;

/// The caller's bookmarked listings.
pub async fn list_favorites(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<Listing>>> {
    let listings = state
        .favorites
        .list(actor.id)
        .await
        .map_err(failure(&state, "list_favorites", Some(actor.id)))?;
    Ok(Json(listings))
}

/// Bookmark an active listing.
pub async fn add_favorite(
    PathParams(listing_id): PathParams<ListingId>,
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<(StatusCode, Json<Favorite>)> {
    let favorite = state
        .favorites
        .add(actor.id, listing_id)
        .await
        .map_err(failure(&state, "add_favorite", Some(actor.id)))?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

/// Remove a bookmark.
pub async fn remove_favorite(
    PathParams(listing_id): PathParams<ListingId>,
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<StatusCode> {
    state
        .favorites
        .remove(actor.id, listing_id)
        .await
        .map_err(failure(&state, "remove_favorite", Some(actor.id)))?;
    Ok(StatusCode::NO_CONTENT)
}
