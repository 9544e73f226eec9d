//! Listing repository trait.

use super::StoreFuture;
use crate::types::{BookingId, Listing, ListingId, ListingQuery, ListingStatus, Page, UserId};

/// Result of [`ListingRepository::delete_listing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The listing and everything attached to it are gone.
    Deleted,
    /// These confirmed bookings hold the listing; nothing was deleted.
    Booked(Vec<BookingId>),
    /// The listing does not exist.
    Missing,
}

/// Listing storage.
pub trait ListingRepository: Send + Sync {
    /// Insert a new listing.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn insert_listing<'a>(&'a self, listing: &'a Listing) -> StoreFuture<'a, Listing>;

    /// Get a listing by id, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn get_listing(&self, listing_id: ListingId) -> StoreFuture<'_, Option<Listing>>;

    /// Overwrite a listing.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - Listing not found → `MarketError::NotFound`
    fn update_listing<'a>(&'a self, listing: &'a Listing) -> StoreFuture<'a, Listing>;

    /// Delete a listing together with its bookings, messages and favorites,
    /// unless a confirmed booking holds it.
    ///
    /// Runs under the same per-listing lock as
    /// [`BookingRepository::decide`](super::BookingRepository::decide), so a
    /// confirmation cannot slip in between the check and the delete.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn delete_listing(&self, listing_id: ListingId) -> StoreFuture<'_, DeleteOutcome>;

    /// Active listings matching `query`, newest first, one page.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn search_active<'a>(&'a self, query: &'a ListingQuery) -> StoreFuture<'a, Page<Listing>>;

    /// Every listing of `owner_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn list_by_owner(&self, owner_id: UserId) -> StoreFuture<'_, Vec<Listing>>;

    /// Listings with `status`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn list_by_status(&self, status: ListingStatus) -> StoreFuture<'_, Vec<Listing>>;

    /// Number of listings with `status`.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn count_by_status(&self, status: ListingStatus) -> StoreFuture<'_, u64>;
}
