//! Bookmarked listings.

use crate::environment::MarketEnvironment;
use crate::error::{MarketError, Result};
use crate::types::{Favorite, Listing, ListingId, UserId};

/// Favorite operations.
#[derive(Clone, Debug)]
pub struct FavoriteService {
    env: MarketEnvironment,
}

impl FavoriteService {
    /// Service over `env`.
    #[must_use]
    pub const fn new(env: MarketEnvironment) -> Self {
        Self { env }
    }

    /// Bookmark an active listing.
    ///
    /// # Errors
    ///
    /// `NotFound` unless the listing is active; `Conflict` when already saved.
    pub async fn add(&self, user_id: UserId, listing_id: ListingId) -> Result<Favorite> {
        let active = self
            .env
            .listings
            .get_listing(listing_id)
            .await?
            .is_some_and(|l| l.is_active());
        if !active {
            return Err(MarketError::not_found("Listing", listing_id));
        }

        let favorite = Favorite {
            user_id,
            listing_id,
            created_at: self.env.clock.now(),
        };
        self.env.favorites.add_favorite(&favorite).await
    }

    /// Remove a bookmark.
    ///
    /// # Errors
    ///
    /// `NotFound` when the listing was not bookmarked.
    pub async fn remove(&self, user_id: UserId, listing_id: ListingId) -> Result<()> {
        if self
            .env
            .favorites
            .remove_favorite(user_id, listing_id)
            .await?
        {
            Ok(())
        } else {
            Err(MarketError::not_found("Favorite", listing_id))
        }
    }

    /// Active bookmarked listings, most recently saved first.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Listing>> {
        self.env.favorites.favorite_listings(user_id).await
    }
}
