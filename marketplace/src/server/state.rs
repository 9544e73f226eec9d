//! Application state for the marketplace HTTP server.
//!
//! Contains all shared resources needed by HTTP handlers:
//! - Domain services (over one [`MarketEnvironment`])
//! - Notification hub (WebSocket fan-out)
//! - Response cache and connection limiter
//! - Token keys and readiness probe

use crate::auth::JwtKeys;
use axum::extract::FromRef;
use rental_market_core::accounts::{AccountService, DEFAULT_HASH_COST};
use rental_market_core::analytics::AnalyticsService;
use rental_market_core::booking::{BookingEngine, BookingPolicy};
use rental_market_core::counters::CounterService;
use rental_market_core::environment::MarketEnvironment;
use rental_market_core::favorites::FavoriteService;
use rental_market_core::listings::ListingService;
use rental_market_core::messaging::MessagingService;
use rental_market_web::handlers::health::ReadinessProbe;
use rental_market_web::ws::{ConnectionLimiter, MAX_CONNECTIONS};
use rental_market_web::{NotificationHub, ResponseCache};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply, every field is reference counted) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Registration and login
    pub accounts: AccountService,
    /// Listing lifecycle and search
    pub listings: ListingService,
    /// Booking availability engine
    pub bookings: BookingEngine,
    /// Messages and conversations
    pub messaging: MessagingService,
    /// Bookmarks
    pub favorites: FavoriteService,
    /// Owner statistics
    pub analytics: AnalyticsService,
    /// Badge counters
    pub counters: CounterService,
    /// Live notification transport
    pub hub: NotificationHub,
    /// Cache for public listing reads
    pub cache: ResponseCache,
    /// WebSocket session ceiling
    pub connections: ConnectionLimiter,
    /// Token signing keys
    pub jwt: JwtKeys,
    /// Dependency checked by `/health/ready`
    pub readiness: Arc<dyn ReadinessProbe>,
    /// Whether 5xx bodies carry the underlying error text
    pub expose_internal_errors: bool,
}

/// Tunables of [`AppState`].
#[derive(Clone, Debug)]
pub struct StateOptions {
    /// Which existing bookings block a new request
    pub policy: BookingPolicy,
    /// Cache for public listing reads
    pub cache: ResponseCache,
    /// WebSocket session ceiling
    pub max_connections: usize,
    /// bcrypt work factor for new passwords
    pub hash_cost: u32,
    /// Whether 5xx bodies carry the underlying error text
    pub expose_internal_errors: bool,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            policy: BookingPolicy::default(),
            cache: ResponseCache::new(512, Duration::from_secs(60)),
            max_connections: MAX_CONNECTIONS,
            hash_cost: DEFAULT_HASH_COST,
            expose_internal_errors: false,
        }
    }
}

impl AppState {
    /// Create the application state.
    ///
    /// `env.notifier` should publish into `hub` for WebSocket clients to see
    /// anything.
    #[must_use]
    pub fn new(
        env: &MarketEnvironment,
        hub: NotificationHub,
        jwt: JwtKeys,
        readiness: Arc<dyn ReadinessProbe>,
        options: StateOptions,
    ) -> Self {
        Self {
            accounts: AccountService::with_hash_cost(env.clone(), options.hash_cost),
            listings: ListingService::new(env.clone()),
            bookings: BookingEngine::new(env.clone(), options.policy),
            messaging: MessagingService::new(env.clone()),
            favorites: FavoriteService::new(env.clone()),
            analytics: AnalyticsService::new(env.clone()),
            counters: CounterService::new(env.clone()),
            hub,
            cache: options.cache,
            connections: ConnectionLimiter::new(options.max_connections),
            jwt,
            readiness,
            expose_internal_errors: options.expose_internal_errors,
        }
    }
}

// Implement FromRef to allow the auth extractors to get the keys from AppState
impl FromRef<AppState> for JwtKeys {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.jwt.clone()
    }
}

impl FromRef<AppState> for ResponseCache {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.cache.clone()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("policy", &self.bookings.policy())
            .field("connections", &self.connections)
            .field("expose_internal_errors", &self.expose_internal_errors)
            .finish_non_exhaustive()
    }
}
