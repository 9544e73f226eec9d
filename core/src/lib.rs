//! # Rental Market Core
//!
//! Domain model and business services for the rental marketplace.
//!
//! The crate is free of I/O: persistence is reached through the repository
//! traits in [`providers`], live pushes through the [`notify::Notifier`]
//! trait, and time through [`environment::Clock`]. Concrete implementations
//! are injected via [`environment::MarketEnvironment`].
//!
//! ## Services
//!
//! - [`booking::BookingEngine`]: availability checks, booking requests and
//!   owner decisions
//! - [`listings::ListingService`]: listing lifecycle and moderation
//! - [`messaging::MessagingService`]: messages and derived conversations
//! - [`favorites::FavoriteService`]: bookmarks
//! - [`analytics::AnalyticsService`]: view counters and owner statistics
//! - [`counters::CounterService`]: unread/pending aggregates
//! - [`accounts::AccountService`]: registration and password login
//!
//! ## Example
//!
//! ```ignore
//! use rental_market_core::booking::{BookingEngine, BookingPolicy, BookingRequest};
//!
//! let engine = BookingEngine::new(env.clone(), BookingPolicy::default());
//! let booking = engine
//!     .request_booking(BookingRequest { listing_id, tenant_id, start_date, end_date })
//!     .await?;
//! ```

pub mod accounts;
pub mod analytics;
pub mod booking;
pub mod counters;
pub mod error;
pub mod favorites;
pub mod listings;
pub mod messaging;
pub mod notify;
pub mod providers;
pub mod types;

pub use error::{MarketError, Result};

/// Environment traits and the dependency bundle handed to every service.
pub mod environment {
    use crate::notify::Notifier;
    use crate::providers::{
        AnalyticsRepository, BookingRepository, FavoriteRepository, ListingRepository,
        MessageRepository, UserRepository,
    };
    use chrono::{DateTime, Utc};
    use std::sync::Arc;

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock = SystemClock;
    ///
    /// // Test - fixed time for deterministic tests
    /// let clock = rental_market_testing::test_clock();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Everything a service needs from the outside world.
    ///
    /// Cloning is cheap: every field is reference counted.
    #[derive(Clone)]
    pub struct MarketEnvironment {
        /// Time source
        pub clock: Arc<dyn Clock>,
        /// Account storage
        pub users: Arc<dyn UserRepository>,
        /// Listing storage
        pub listings: Arc<dyn ListingRepository>,
        /// Booking storage
        pub bookings: Arc<dyn BookingRepository>,
        /// Message storage
        pub messages: Arc<dyn MessageRepository>,
        /// Favorite storage
        pub favorites: Arc<dyn FavoriteRepository>,
        /// View counters
        pub analytics: Arc<dyn AnalyticsRepository>,
        /// Live push transport
        pub notifier: Arc<dyn Notifier>,
    }

    impl MarketEnvironment {
        /// Build an environment whose repositories are all served by `store`.
        #[must_use]
        pub fn with_store<S>(store: Arc<S>, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self
        where
            S: UserRepository
                + ListingRepository
                + BookingRepository
                + MessageRepository
                + FavoriteRepository
                + AnalyticsRepository
                + 'static,
        {
            Self {
                clock,
                users: store.clone(),
                listings: store.clone(),
                bookings: store.clone(),
                messages: store.clone(),
                favorites: store.clone(),
                analytics: store,
                notifier,
            }
        }
    }

    impl std::fmt::Debug for MarketEnvironment {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MarketEnvironment").finish_non_exhaustive()
        }
    }
}
