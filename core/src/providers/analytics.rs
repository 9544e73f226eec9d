//! Analytics repository trait.

use super::StoreFuture;
use crate::types::ListingId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Listing view counters.
pub trait AnalyticsRepository: Send + Sync {
    /// Increment the view counter of a listing.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn record_view(&self, listing_id: ListingId, at: DateTime<Utc>) -> StoreFuture<'_, ()>;

    /// View counts of the given listings; missing entries mean zero views.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn views_for<'a>(
        &'a self,
        listing_ids: &'a [ListingId],
    ) -> StoreFuture<'a, HashMap<ListingId, u64>>;
}
