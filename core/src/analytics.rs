//! Listing view counters and owner statistics.

use crate::environment::MarketEnvironment;
use crate::error::Result;
use crate::types::{BookingStatus, ListingId, ListingStats, UserId};
use tracing::warn;

/// View counting and per listing figures for owners.
#[derive(Clone, Debug)]
pub struct AnalyticsService {
    env: MarketEnvironment,
}

impl AnalyticsService {
    /// Service over `env`.
    #[must_use]
    pub const fn new(env: MarketEnvironment) -> Self {
        Self { env }
    }

    /// Count one view of a listing. Failures are logged and swallowed.
    pub async fn record_view(&self, listing_id: ListingId) {
        if let Err(e) = self
            .env
            .analytics
            .record_view(listing_id, self.env.clock.now())
            .await
        {
            warn!(%listing_id, error = %e, "Failed to record listing view");
        }
    }

    /// Views and booking counts for every listing of `owner_id`, newest
    /// listing first.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn owner_stats(&self, owner_id: UserId) -> Result<Vec<ListingStats>> {
        let listings = self.env.listings.list_by_owner(owner_id).await?;
        let ids: Vec<ListingId> = listings.iter().map(|l| l.id).collect();
        let views = self.env.analytics.views_for(&ids).await?;
        let bookings = self.env.bookings.list_for_owner(owner_id).await?;

        Ok(listings
            .into_iter()
            .map(|listing| {
                let count = |status: BookingStatus| {
                    bookings
                        .iter()
                        .filter(|b| b.listing_id == listing.id && b.status == status)
                        .count() as u64
                };
                ListingStats {
                    listing_id: listing.id,
                    views: views.get(&listing.id).copied().unwrap_or(0),
                    pending_bookings: count(BookingStatus::Pending),
                    confirmed_bookings: count(BookingStatus::Confirmed),
                    title: listing.title,
                    status: listing.status,
                }
            })
            .collect())
    }
}
