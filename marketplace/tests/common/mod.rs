//! Shared wiring for the marketplace HTTP and WebSocket tests.

#![allow(dead_code, clippy::expect_used, clippy::missing_panics_doc)]

use marketplace::auth::JwtKeys;
use marketplace::server::health::InProcess;
use marketplace::server::{AppState, StateOptions};
use rental_market_core::accounts::Registration;
use rental_market_core::booking::BookingPolicy;
use rental_market_core::environment::MarketEnvironment;
use rental_market_core::listings::ListingDraft;
use rental_market_core::types::{Actor, Listing, ListingStatus, ListingType, User};
use rental_market_testing::{InMemoryStore, test_clock};
use rental_market_web::{NotificationHub, ResponseCache};
use std::sync::Arc;
use std::time::Duration;

/// Lowest cost bcrypt accepts; keeps tests fast.
pub const TEST_HASH_COST: u32 = 4;

pub const TEST_PASSWORD: &str = "correct horse battery";

/// State over a fresh in-memory store, publishing into a live hub.
pub fn test_state(policy: BookingPolicy) -> AppState {
    test_state_over(InMemoryStore::new(), policy, false)
}

/// State over `store`, for tests that need to reach into it.
pub fn test_state_over(
    store: InMemoryStore,
    policy: BookingPolicy,
    expose_internal_errors: bool,
) -> AppState {
    let hub = NotificationHub::new();
    let env = MarketEnvironment::with_store(
        Arc::new(store),
        Arc::new(test_clock()),
        Arc::new(hub.clone()),
    );
    AppState::new(
        &env,
        hub,
        JwtKeys::new(b"test-secret", 3600),
        Arc::new(InProcess),
        StateOptions {
            policy,
            cache: ResponseCache::new(64, Duration::from_secs(60)),
            max_connections: 8,
            hash_cost: TEST_HASH_COST,
            expose_internal_errors,
        },
    )
}

/// Register a regular account and mint its token.
pub async fn user_with_token(state: &AppState, email: &str) -> (User, String) {
    let user = state
        .accounts
        .register(Registration {
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await
        .expect("registration succeeds");
    let token = state.jwt.issue(&user).expect("token issues");
    (user, token)
}

/// Provision an admin account and mint its token.
pub async fn admin_with_token(state: &AppState) -> (User, String) {
    let admin = state
        .accounts
        .ensure_admin(Registration {
            name: "Moderator".to_string(),
            email: "admin@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await
        .expect("admin provisioned");
    let token = state.jwt.issue(&admin).expect("token issues");
    (admin, token)
}

pub fn draft(title: &str, price: i64) -> ListingDraft {
    ListingDraft {
        title: title.to_string(),
        description: "Bright studio by the water".to_string(),
        price,
        listing_type: ListingType::DailyRental,
        address: "12 Quay Street".to_string(),
        latitude: None,
        longitude: None,
        photos: vec!["studio.jpg".to_string()],
    }
}

/// Submit a listing for `owner` and have `admin` approve it.
pub async fn active_listing(state: &AppState, owner: &User, admin: &User, title: &str) -> Listing {
    let listing = state
        .listings
        .create(owner.id, draft(title, 12_000))
        .await
        .expect("listing submitted");
    state
        .listings
        .moderate(listing.id, Actor::from(admin), ListingStatus::Active)
        .await
        .expect("listing approved")
}
