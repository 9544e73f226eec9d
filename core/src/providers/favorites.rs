//! Favorite repository trait.

use super::StoreFuture;
use crate::types::{Favorite, Listing, ListingId, UserId};

/// Favorite storage.
pub trait FavoriteRepository: Send + Sync {
    /// Insert a `(user, listing)` pair.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - Pair already exists → `MarketError::Conflict`
    fn add_favorite<'a>(&'a self, favorite: &'a Favorite) -> StoreFuture<'a, Favorite>;

    /// Remove a pair; `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn remove_favorite(&self, user_id: UserId, listing_id: ListingId) -> StoreFuture<'_, bool>;

    /// Active listings favorited by `user_id`, most recent favorite first.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn favorite_listings(&self, user_id: UserId) -> StoreFuture<'_, Vec<Listing>>;
}
