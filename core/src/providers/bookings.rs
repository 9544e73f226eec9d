//! Booking repository trait.
//!
//! `reserve` and `decide` are the two check-then-write sequences of the
//! availability engine. Implementations must run each one atomically per
//! listing: the overlap check and the write it guards may not interleave with
//! another `reserve`/`decide` on the same listing.

use super::StoreFuture;
use crate::types::{Booking, BookingId, BookingStatus, ListingId, UserId};
use chrono::{DateTime, Utc};

/// Result of [`BookingRepository::reserve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// The booking was inserted.
    Reserved(Booking),
    /// Overlapping bookings exist; nothing was written.
    Conflict(Vec<BookingId>),
}

/// Result of [`BookingRepository::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecideOutcome {
    /// The booking moved to the requested status.
    Decided(Booking),
    /// Confirming would overlap these confirmed bookings; nothing was written.
    Conflict(Vec<BookingId>),
    /// The booking already left `pending`.
    AlreadyDecided(BookingStatus),
    /// The booking does not exist.
    Missing,
}

/// Booking storage.
pub trait BookingRepository: Send + Sync {
    /// Insert `booking` unless a booking of the same listing whose status is in
    /// `blocking` overlaps its date range.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn reserve<'a>(
        &'a self,
        booking: &'a Booking,
        blocking: &'a [BookingStatus],
    ) -> StoreFuture<'a, ReserveOutcome>;

    /// Move a `pending` booking to `status`, clearing the tenant's seen flag.
    ///
    /// When `status` is `Confirmed`, other confirmed bookings of the listing
    /// overlapping this one block the transition.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn decide(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, DecideOutcome>;

    /// Get a booking by id.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn get_booking(&self, booking_id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Bookings across all listings of `owner_id`, pending first then newest.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn list_for_owner(&self, owner_id: UserId) -> StoreFuture<'_, Vec<Booking>>;

    /// Bookings made by `tenant_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn list_for_tenant(&self, tenant_id: UserId) -> StoreFuture<'_, Vec<Booking>>;

    /// Bookings of a listing with a status in `statuses`, by start date.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn list_for_listing<'a>(
        &'a self,
        listing_id: ListingId,
        statuses: &'a [BookingStatus],
    ) -> StoreFuture<'a, Vec<Booking>>;

    /// Pending bookings on listings owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn count_pending_for_owner(&self, owner_id: UserId) -> StoreFuture<'_, u64>;

    /// Decided bookings of `tenant_id` whose status change was not seen.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn count_unseen_for_tenant(&self, tenant_id: UserId) -> StoreFuture<'_, u64>;

    /// Acknowledge every status change of `tenant_id`; returns rows touched.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn mark_seen_for_tenant(&self, tenant_id: UserId) -> StoreFuture<'_, u64>;
}
