//! Unread/pending aggregates, recomputed on every call.

use crate::environment::MarketEnvironment;
use crate::error::Result;
use crate::types::{Actor, Counters, ListingStatus};

/// Aggregate counters for the caller's badges.
#[derive(Clone, Debug)]
pub struct CounterService {
    env: MarketEnvironment,
}

impl CounterService {
    /// Service over `env`.
    #[must_use]
    pub const fn new(env: MarketEnvironment) -> Self {
        Self { env }
    }

    /// Every counter applicable to `actor`; `pending_listings` only for admins.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn for_actor(&self, actor: Actor) -> Result<Counters> {
        let unread_messages = self.env.messages.count_unread(actor.id).await?;
        let pending_bookings = self.env.bookings.count_pending_for_owner(actor.id).await?;
        let unseen_booking_updates = self.env.bookings.count_unseen_for_tenant(actor.id).await?;
        let pending_listings = if actor.is_admin() {
            Some(
                self.env
                    .listings
                    .count_by_status(ListingStatus::Pending)
                    .await?,
            )
        } else {
            None
        };

        Ok(Counters {
            unread_messages,
            pending_bookings,
            unseen_booking_updates,
            pending_listings,
        })
    }
}
