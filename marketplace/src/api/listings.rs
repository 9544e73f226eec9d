//! Listing API endpoints.
//!
//! - GET /api/listings - Search active listings (public, cached)
//! - GET /api/listings/:id - Listing details (public for active listings)
//! - GET /api/listings/:id/availability - Confirmed date ranges (public, cached)
//! - POST /api/listings - Submit a listing for moderation (requires auth)
//! - PUT /api/listings/:id - Edit a listing (requires ownership)
//! - DELETE /api/listings/:id - Delete a listing (requires ownership)
//! - POST /api/listings/:id/archive, /unarchive - Hide or republish (requires ownership)
//! - GET /api/listings/mine - The caller's listings, any status
//! - GET /api/listings/stats - Views and booking counts per listing

use super::failure;
use crate::auth::{AuthUser, OptionalAuth};
use crate::metrics;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use rental_market_core::listings::ListingDraft;
use rental_market_core::types::{
    DateRange, Listing, ListingId, ListingQuery, ListingStats, ListingStatus, ListingType, Page,
};
use rental_market_web::WebResult;
use rental_market_web::extractors::{JsonBody, PathParams, QueryParams};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Listing fields supplied on create and edit.
#[derive(Debug, Deserialize)]
pub struct ListingRequest {
    /// Headline
    pub title: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Price in minor units
    pub price: i64,
    /// `monthly-rental` or `daily-rental`
    #[serde(rename = "type")]
    pub listing_type: String,
    /// Street address
    #[serde(default)]
    pub address: String,
    /// Latitude, given together with longitude
    pub latitude: Option<f64>,
    /// Longitude, given together with latitude
    pub longitude: Option<f64>,
    /// Photo filenames in display order
    #[serde(default)]
    pub photos: Vec<String>,
}

impl ListingRequest {
    fn into_draft(self) -> rental_market_core::Result<ListingDraft> {
        Ok(ListingDraft {
            listing_type: ListingType::from_str(&self.listing_type)?,
            title: self.title,
            description: self.description,
            price: self.price,
            address: self.address,
            latitude: self.latitude,
            longitude: self.longitude,
            photos: self.photos,
        })
    }
}

/// Query parameters for the public search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Restrict to a rental type
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    /// Minimum price (inclusive)
    pub min_price: Option<i64>,
    /// Maximum price (inclusive)
    pub max_price: Option<i64>,
    /// Text matched against title and address
    pub q: Option<String>,
    /// 1-based page (default: 1)
    pub page: Option<u32>,
    /// Page size (default: 20, max: 100)
    pub per_page: Option<u32>,
}

impl SearchParams {
    fn into_query(self) -> rental_market_core::Result<ListingQuery> {
        Ok(ListingQuery {
            listing_type: self
                .listing_type
                .as_deref()
                .map(ListingType::from_str)
                .transpose()?,
            min_price: self.min_price,
            max_price: self.max_price,
            text: self.q,
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(ListingQuery::DEFAULT_PER_PAGE),
        })
    }
}

/// Booked date ranges of a listing.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// Listing id
    pub listing_id: ListingId,
    /// Confirmed stays, by start date
    pub booked: Vec<DateRange>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Search active listings, newest first.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/api/listings?type=daily-rental&max_price=15000&q=harbour&page=1"
/// ```
pub async fn search(
    QueryParams(params): QueryParams<SearchParams>,
    State(state): State<AppState>,
) -> WebResult<Json<Page<Listing>>> {
    let page = state
        .listings
        .search(params.into_query()?)
        .await
        .map_err(failure(&state, "search_listings", None))?;
    Ok(Json(page))
}

/// Listing details.
///
/// Active listings are public; owners and admins also see the others.
pub async fn get_listing(
    PathParams(listing_id): PathParams<ListingId>,
    OptionalAuth(viewer): OptionalAuth,
    State(state): State<AppState>,
) -> WebResult<Json<Listing>> {
    let viewer_id = viewer.map(|v| v.id);
    let listing = state
        .listings
        .get(listing_id, viewer)
        .await
        .map_err(failure(&state, "get_listing", viewer_id))?;
    Ok(Json(listing))
}

/// Confirmed date ranges of an active listing.
pub async fn availability(
    PathParams(listing_id): PathParams<ListingId>,
    State(state): State<AppState>,
) -> WebResult<Json<AvailabilityResponse>> {
    let booked = state
        .bookings
        .listing_availability(listing_id)
        .await
        .map_err(failure(&state, "listing_availability", None))?;
    Ok(Json(AvailabilityResponse { listing_id, booked }))
}

/// Submit a listing; it stays `pending` until an admin approves it.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/listings \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Harbour view studio", "price": 12000, "type": "daily-rental",
///        "address": "12 Quay Street", "photos": ["studio.jpg"]}'
/// ```
pub async fn create_listing(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ListingRequest>,
) -> WebResult<(StatusCode, Json<Listing>)> {
    let listing = state
        .listings
        .create(actor.id, request.into_draft()?)
        .await
        .map_err(failure(&state, "create_listing", Some(actor.id)))?;

    metrics::record_listing(listing.status);
    Ok((StatusCode::CREATED, Json(listing)))
}

/// Replace the editable fields of a listing.
pub async fn update_listing(
    PathParams(listing_id): PathParams<ListingId>,
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ListingRequest>,
) -> WebResult<Json<Listing>> {
    let listing = state
        .listings
        .update(listing_id, actor.id, request.into_draft()?)
        .await
        .map_err(failure(&state, "update_listing", Some(actor.id)))?;

    if listing.status == ListingStatus::Pending {
        metrics::record_listing(listing.status);
    }
    Ok(Json(listing))
}

/// Delete a listing with its bookings, messages and favorites.
pub async fn delete_listing(
    PathParams(listing_id): PathParams<ListingId>,
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<StatusCode> {
    state
        .listings
        .delete(listing_id, actor.id)
        .await
        .map_err(failure(&state, "delete_listing", Some(actor.id)))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Hide an active listing.
pub async fn archive_listing(
    PathParams(listing_id): PathParams<ListingId>,
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Listing>> {
    let listing = state
        .listings
        .archive(listing_id, actor.id)
        .await
        .map_err(failure(&state, "archive_listing", Some(actor.id)))?;
    Ok(Json(listing))
}

/// Republish an archived listing.
pub async fn unarchive_listing(
    PathParams(listing_id): PathParams<ListingId>,
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Listing>> {
    let listing = state
        .listings
        .unarchive(listing_id, actor.id)
        .await
        .map_err(failure(&state, "unarchive_listing", Some(actor.id)))?;
    Ok(Json(listing))
}

/// The caller's listings, any status, newest first.
pub async fn my_listings(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<Listing>>> {
    let listings = state
        .listings
        .mine(actor.id)
        .await
        .map_err(failure(&state, "my_listings", Some(actor.id)))?;
    Ok(Json(listings))
}

/// Views and booking counts for each of the caller's listings.
pub async fn listing_stats(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<ListingStats>>> {
    let stats = state
        .analytics
        .owner_stats(actor.id)
        .await
        .map_err(failure(&state, "listing_stats", Some(actor.id)))?;
    Ok(Json(stats))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rental_market_core::MarketError;

    #[test]
    fn test_search_params_defaults() {
        let query = SearchParams::default().into_query().unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, ListingQuery::DEFAULT_PER_PAGE);
        assert!(query.listing_type.is_none());
    }

    #[test]
    fn test_unknown_type_is_validation_error() {
        let params = SearchParams {
            listing_type: Some("hourly".to_string()),
            ..SearchParams::default()
        };
        assert!(matches!(
            params.into_query(),
            Err(MarketError::Validation(fields)) if fields[0].field == "type"
        ));
    }
}
