//! Router configuration for the marketplace.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::readiness_check;
use super::state::AppState;
use crate::api::{accounts, admin, bookings, counters, favorites, listings, messages, websocket};
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use rental_market_web::handlers::health::health_check;
use rental_market_web::{cache_responses, correlation_id_layer};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Configures all routes including:
/// - Health checks
/// - Account endpoints
/// - Listing, booking, messaging and favorite endpoints
/// - Moderation endpoints
/// - The notification WebSocket
///
/// Public listing reads (search and availability) go through the response
/// cache; every request is traced and tagged with a correlation ID.
pub fn build_router(state: AppState) -> Router {
    let cached = || from_fn_with_state(state.cache.clone(), cache_responses);

    let api_routes = Router::new()
        // Accounts
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        .route("/auth/me", get(accounts::me))
        // Listings
        .route(
            "/listings",
            get(listings::search)
                .layer(cached())
                .post(listings::create_listing),
        )
        .route("/listings/mine", get(listings::my_listings))
        .route("/listings/stats", get(listings::listing_stats))
        .route(
            "/listings/:id",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route(
            "/listings/:id/availability",
            get(listings::availability).layer(cached()),
        )
        .route("/listings/:id/archive", post(listings::archive_listing))
        .route("/listings/:id/unarchive", post(listings::unarchive_listing))
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/owner", get(bookings::owner_bookings))
        .route("/bookings/my-bookings", get(bookings::my_bookings))
        .route("/bookings/my-bookings/seen", post(bookings::mark_seen))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/status", put(bookings::update_status))
        // Messages
        .route("/messages", post(messages::send_message))
        .route("/messages/conversations", get(messages::conversations))
        .route("/messages/:listing_id/:user_id", get(messages::thread))
        .route("/messages/:listing_id/:user_id/read", put(messages::mark_read))
        // Favorites
        .route("/favorites", get(favorites::list_favorites))
        .route(
            "/favorites/:listing_id",
            post(favorites::add_favorite).delete(favorites::remove_favorite),
        )
        // Counters
        .route("/counters", get(counters::get_counters))
        // Moderation
        .route("/admin/listings/pending", get(admin::pending_listings))
        .route("/admin/listings/:id/status", put(admin::moderate_listing))
        // Live notifications
        .route("/ws", get(websocket::connect));

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
