//! `FavoriteRepository` over the `favorites` table.

use crate::rows::{ListingRow, convert_all};
use crate::{PostgresStore, db_error};
use rental_market_core::MarketError;
use rental_market_core::providers::{FavoriteRepository, StoreFuture};
use rental_market_core::types::{Favorite, Listing, ListingId, UserId};

/// Listing columns qualified for the favorites join.
const LISTING_COLUMNS: &str = "l.id, l.owner_id, l.title, l.description, l.price, l.listing_type, \
     l.status, l.address, l.latitude, l.longitude, l.photos, l.created_at, l.updated_at";

impl FavoriteRepository for PostgresStore {
    fn add_favorite<'a>(&'a self, favorite: &'a Favorite) -> StoreFuture<'a, Favorite> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                INSERT INTO favorites (user_id, listing_id, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, listing_id) DO NOTHING
                ",
            )
            .bind(favorite.user_id.as_uuid())
            .bind(favorite.listing_id.as_uuid())
            .bind(favorite.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error("add favorite"))?;

            if result.rows_affected() == 0 {
                return Err(MarketError::Conflict("Listing already in favorites".to_string()));
            }
            Ok(favorite.clone())
        })
    }

    fn remove_favorite(&self, user_id: UserId, listing_id: ListingId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND listing_id = $2")
                .bind(user_id.as_uuid())
                .bind(listing_id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(db_error("remove favorite"))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn favorite_listings(&self, user_id: UserId) -> StoreFuture<'_, Vec<Listing>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, ListingRow>(&format!(
                r"
                SELECT {LISTING_COLUMNS}
                FROM favorites f
                JOIN listings l ON l.id = f.listing_id
                WHERE f.user_id = $1 AND l.status = 'active'
                ORDER BY f.created_at DESC
                "
            ))
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list favorites"))?;
            convert_all(rows)
        })
    }
}
