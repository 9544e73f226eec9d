//! `ListingRepository` over the `listings` table.

use crate::bookings::lock_listing;
use crate::rows::{ListingRow, convert_all};
use crate::{PostgresStore, count, db_error};
use rental_market_core::MarketError;
use rental_market_core::providers::{DeleteOutcome, ListingRepository, StoreFuture};
use rental_market_core::types::{
    BookingId, Listing, ListingId, ListingQuery, ListingStatus, Page, UserId,
};
use uuid::Uuid;

const LISTING_COLUMNS: &str = "id, owner_id, title, description, price, listing_type, \
     status, address, latitude, longitude, photos, created_at, updated_at";

/// Shared `WHERE` clause of the public search; binds `$1..=$4`.
const SEARCH_FILTER: &str = r"
    status = 'active'
    AND ($1::text IS NULL OR listing_type = $1)
    AND ($2::bigint IS NULL OR price >= $2)
    AND ($3::bigint IS NULL OR price <= $3)
    AND ($4::text IS NULL
         OR lower(title) LIKE '%' || $4 || '%' ESCAPE '\'
         OR lower(address) LIKE '%' || $4 || '%' ESCAPE '\')
";

/// Escape `LIKE` metacharacters so user text matches literally.
fn like_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl ListingRepository for PostgresStore {
    fn insert_listing<'a>(&'a self, listing: &'a Listing) -> StoreFuture<'a, Listing> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO listings (
                    id, owner_id, title, description, price, listing_type, status,
                    address, latitude, longitude, photos, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ",
            )
            .bind(listing.id.as_uuid())
            .bind(listing.owner_id.as_uuid())
            .bind(&listing.title)
            .bind(&listing.description)
            .bind(listing.price)
            .bind(listing.listing_type.as_str())
            .bind(listing.status.as_str())
            .bind(&listing.address)
            .bind(listing.location.map(|p| p.latitude))
            .bind(listing.location.map(|p| p.longitude))
            .bind(&listing.photos)
            .bind(listing.created_at)
            .bind(listing.updated_at)
            .execute(&self.pool)
            .await
            .map_err(db_error("insert listing"))?;

            Ok(listing.clone())
        })
    }

    fn get_listing(&self, listing_id: ListingId) -> StoreFuture<'_, Option<Listing>> {
        Box::pin(async move {
            sqlx::query_as::<_, ListingRow>(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"
            ))
            .bind(listing_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get listing"))?
            .map(Listing::try_from)
            .transpose()
        })
    }

    fn update_listing<'a>(&'a self, listing: &'a Listing) -> StoreFuture<'a, Listing> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE listings
                SET title = $2,
                    description = $3,
                    price = $4,
                    listing_type = $5,
                    status = $6,
                    address = $7,
                    latitude = $8,
                    longitude = $9,
                    photos = $10,
                    updated_at = $11
                WHERE id = $1
                ",
            )
            .bind(listing.id.as_uuid())
            .bind(&listing.title)
            .bind(&listing.description)
            .bind(listing.price)
            .bind(listing.listing_type.as_str())
            .bind(listing.status.as_str())
            .bind(&listing.address)
            .bind(listing.location.map(|p| p.latitude))
            .bind(listing.location.map(|p| p.longitude))
            .bind(&listing.photos)
            .bind(listing.updated_at)
            .execute(&self.pool)
            .await
            .map_err(db_error("update listing"))?;

            if result.rows_affected() == 0 {
                return Err(MarketError::not_found("Listing", listing.id));
            }
            Ok(listing.clone())
        })
    }

    fn delete_listing(&self, listing_id: ListingId) -> StoreFuture<'_, DeleteOutcome> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

            if !lock_listing(&mut tx, *listing_id.as_uuid()).await? {
                return Ok(DeleteOutcome::Missing);
            }

            let confirmed: Vec<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM bookings WHERE listing_id = $1 AND status = 'confirmed'",
            )
            .bind(listing_id.as_uuid())
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("check confirmed bookings"))?;
            if !confirmed.is_empty() {
                return Ok(DeleteOutcome::Booked(
                    confirmed.into_iter().map(|(id,)| BookingId::from_uuid(id)).collect(),
                ));
            }

            // Bookings, messages, favorites and counters cascade.
            sqlx::query("DELETE FROM listings WHERE id = $1")
                .bind(listing_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db_error("delete listing"))?;

            tx.commit().await.map_err(db_error("commit listing delete"))?;
            Ok(DeleteOutcome::Deleted)
        })
    }

    fn search_active<'a>(&'a self, query: &'a ListingQuery) -> StoreFuture<'a, Page<Listing>> {
        Box::pin(async move {
            let listing_type = query.listing_type.map(|t| t.as_str());
            let text = query.text.as_deref().map(like_literal);

            let (total,): (i64,) =
                sqlx::query_as(&format!("SELECT COUNT(*) FROM listings WHERE {SEARCH_FILTER}"))
                    .bind(listing_type)
                    .bind(query.min_price)
                    .bind(query.max_price)
                    .bind(text.as_deref())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_error("count listings"))?;

            let rows = sqlx::query_as::<_, ListingRow>(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings WHERE {SEARCH_FILTER} \
                 ORDER BY created_at DESC, id LIMIT $5 OFFSET $6"
            ))
            .bind(listing_type)
            .bind(query.min_price)
            .bind(query.max_price)
            .bind(text.as_deref())
            .bind(i64::from(query.per_page))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("search listings"))?;

            Ok(Page {
                items: convert_all(rows)?,
                page: query.page,
                per_page: query.per_page,
                total: count(total),
            })
        })
    }

    fn list_by_owner(&self, owner_id: UserId) -> StoreFuture<'_, Vec<Listing>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, ListingRow>(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings WHERE owner_id = $1 ORDER BY created_at DESC"
            ))
            .bind(owner_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list owner listings"))?;
            convert_all(rows)
        })
    }

    fn list_by_status(&self, status: ListingStatus) -> StoreFuture<'_, Vec<Listing>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, ListingRow>(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings WHERE status = $1 ORDER BY created_at ASC"
            ))
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list listings by status"))?;
            convert_all(rows)
        })
    }

    fn count_by_status(&self, status: ListingStatus) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM listings WHERE status = $1")
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("count listings"))?;
            Ok(count(n))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::like_literal;

    #[test]
    fn test_like_literal_escapes_wildcards() {
        assert_eq!(like_literal("50%_off"), r"50\%\_off");
        assert_eq!(like_literal("plain"), "plain");
    }
}
