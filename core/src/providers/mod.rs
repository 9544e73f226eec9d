//! Repository traits over the relational store.
//!
//! Every service in this crate talks to persistence only through these traits.
//! Production implementations live in `rental-market-postgres`; in-memory ones
//! for tests live in `rental-market-testing`.
//!
//! Methods return boxed futures so the traits stay object-safe and can be
//! shared as `Arc<dyn …>` inside the HTTP application state.

use crate::error::Result;
use std::future::Future;
use std::pin::Pin;

mod analytics;
mod bookings;
mod favorites;
mod listings;
mod messages;
mod users;

pub use analytics::AnalyticsRepository;
pub use bookings::{BookingRepository, DecideOutcome, ReserveOutcome};
pub use favorites::FavoriteRepository;
pub use listings::{DeleteOutcome, ListingRepository};
pub use messages::MessageRepository;
pub use users::UserRepository;

/// Future returned by repository methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;
