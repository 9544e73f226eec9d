//! Builders for a ready-to-use marketplace over the in-memory store.
//!
//! Fixture helpers panic on setup failures: they only run inside tests.
#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use crate::mocks::{FixedClock, RecordingNotifier, test_clock};
use crate::store::InMemoryStore;
use chrono::NaiveDate;
use rental_market_core::booking::{BookingEngine, BookingPolicy};
use rental_market_core::environment::{Clock, MarketEnvironment};
use rental_market_core::providers::{ListingRepository, UserRepository};
use rental_market_core::types::{
    Listing, ListingId, ListingStatus, ListingType, Role, User, UserId,
};
use std::sync::Arc;

/// Parse a `YYYY-MM-DD` date.
#[must_use]
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("fixture dates are well formed")
}

/// A marketplace wired over in-memory tables, a fixed clock and a recording
/// notifier.
#[derive(Debug, Clone)]
pub struct TestMarket {
    /// Shared tables
    pub store: InMemoryStore,
    /// Manually advanced time
    pub clock: FixedClock,
    /// Captured notifications
    pub notifier: RecordingNotifier,
    /// Environment handed to services
    pub env: MarketEnvironment,
}

impl Default for TestMarket {
    fn default() -> Self {
        Self::new()
    }
}

impl TestMarket {
    /// Fresh, empty marketplace.
    #[must_use]
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let clock = test_clock();
        let notifier = RecordingNotifier::new();
        let env = MarketEnvironment::with_store(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            Arc::new(notifier.clone()),
        );
        Self {
            store,
            clock,
            notifier,
            env,
        }
    }

    /// Booking engine with the given request policy.
    #[must_use]
    pub fn engine(&self, policy: BookingPolicy) -> BookingEngine {
        BookingEngine::new(self.env.clone(), policy)
    }

    /// Insert a regular user with an unusable password hash.
    pub async fn user(&self, email: &str) -> User {
        self.insert_user(email, Role::User).await
    }

    /// Insert an admin with an unusable password hash.
    pub async fn admin(&self, email: &str) -> User {
        self.insert_user(email, Role::Admin).await
    }

    /// Insert an `active` daily listing owned by `owner_id`.
    pub async fn active_listing(&self, owner_id: UserId) -> Listing {
        self.listing(owner_id, ListingStatus::Active).await
    }

    /// Insert a daily listing with an arbitrary status.
    pub async fn listing(&self, owner_id: UserId, status: ListingStatus) -> Listing {
        let now = self.clock.now();
        let listing = Listing {
            id: ListingId::new(),
            owner_id,
            title: "Harbour view studio".to_string(),
            description: "Bright studio by the water".to_string(),
            price: 12_000,
            listing_type: ListingType::DailyRental,
            status,
            address: "12 Quay Street".to_string(),
            location: None,
            photos: vec!["studio.jpg".to_string()],
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert_listing(&listing)
            .await
            .expect("in-memory insert succeeds")
    }

    async fn insert_user(&self, email: &str, role: Role) -> User {
        let user = User {
            id: UserId::new(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_lowercase(),
            password_hash: "!".to_string(),
            role,
            created_at: self.clock.now(),
        };
        self.store
            .create_user(&user)
            .await
            .expect("fixture emails are unique")
    }
}
