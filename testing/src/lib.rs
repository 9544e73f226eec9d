//! # Rental Market Testing
//!
//! Testing utilities for the rental marketplace.
//!
//! This crate provides:
//! - [`InMemoryStore`]: every repository trait over shared in-memory tables
//! - [`mocks::FixedClock`]: deterministic, manually advanced time
//! - [`mocks::RecordingNotifier`]: captures published notifications
//! - [`fixtures`]: builders for users, listings and a ready environment
//!
//! ## Example
//!
//! ```ignore
//! use rental_market_testing::fixtures::TestMarket;
//!
//! #[tokio::test]
//! async fn test_booking_flow() {
//!     let market = TestMarket::new();
//!     let owner = market.user("owner@example.com").await;
//!     let listing = market.active_listing(owner.id).await;
//!     // ...
//! }
//! ```

pub mod fixtures;
mod store;

pub use store::InMemoryStore;

/// Mock implementations of environment traits.
pub mod mocks {
    use chrono::{DateTime, Duration, Utc};
    use rental_market_core::environment::Clock;
    use rental_market_core::notify::{ChannelKey, Notification, NotificationEvent, Notifier};
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until explicitly advanced.
    ///
    /// # Example
    ///
    /// ```
    /// use rental_market_testing::mocks::FixedClock;
    /// use rental_market_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// assert_eq!(time1, clock.now());
    /// clock.advance(Duration::minutes(5));
    /// assert_eq!(clock.now() - time1, Duration::minutes(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move time forward for every handle of this clock.
        pub fn advance(&self, by: Duration) {
            if let Ok(mut time) = self.time.lock() {
                *time += by;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .lock()
                .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Create a default fixed clock for tests (2024-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Notifier that records every publish.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingNotifier {
        published: Arc<Mutex<Vec<(ChannelKey, Notification)>>>,
    }

    impl RecordingNotifier {
        /// Empty recorder.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Everything published so far, in order.
        #[must_use]
        pub fn published(&self) -> Vec<(ChannelKey, Notification)> {
            self.published
                .lock()
                .map(|p| p.clone())
                .unwrap_or_default()
        }

        /// Events published to `channel`, in order.
        #[must_use]
        pub fn events_for(&self, channel: &ChannelKey) -> Vec<NotificationEvent> {
            self.published()
                .into_iter()
                .filter(|(c, _)| c == channel)
                .map(|(_, n)| n.event)
                .collect()
        }

        /// Forget everything recorded.
        pub fn clear(&self) {
            if let Ok(mut published) = self.published.lock() {
                published.clear();
            }
        }
    }

    impl Notifier for RecordingNotifier {
        fn publish(&self, channel: &ChannelKey, notification: Notification) {
            if let Ok(mut published) = self.published.lock() {
                published.push((*channel, notification));
            }
        }
    }
}

pub use mocks::{FixedClock, RecordingNotifier, test_clock};
