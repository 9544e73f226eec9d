//! `BookingRepository` over the `bookings` table.

use crate::rows::{BookingRow, convert_all};
use crate::{PostgresStore, count, db_error};
use chrono::{DateTime, Utc};
use rental_market_core::MarketError;
use rental_market_core::error::Result;
use rental_market_core::providers::{BookingRepository, DecideOutcome, ReserveOutcome, StoreFuture};
use rental_market_core::types::{Booking, BookingId, BookingStatus, ListingId, UserId};
use sqlx::{Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

const BOOKING_COLUMNS: &str =
    "id, listing_id, tenant_id, start_date, end_date, status, tenant_seen, created_at, updated_at";

fn status_names(statuses: &[BookingStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

/// Take the per-listing write lock. `false` when the listing is gone.
pub(crate) async fn lock_listing(tx: &mut Transaction<'_, Postgres>, listing_id: Uuid) -> Result<bool> {
    let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM listings WHERE id = $1 FOR UPDATE")
        .bind(listing_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("lock listing"))?;
    Ok(locked.is_some())
}

/// Bookings of `booking`'s listing, other than itself, with a status in
/// `statuses` and a half-open range overlapping it.
async fn overlapping(
    tx: &mut Transaction<'_, Postgres>,
    booking: &Booking,
    statuses: &[BookingStatus],
) -> Result<Vec<BookingId>> {
    let ids: Vec<(Uuid,)> = sqlx::query_as(
        r"
        SELECT id FROM bookings
        WHERE listing_id = $1
          AND id <> $2
          AND status = ANY($3)
          AND start_date < $5
          AND end_date > $4
        ORDER BY start_date
        ",
    )
    .bind(booking.listing_id.as_uuid())
    .bind(booking.id.as_uuid())
    .bind(status_names(statuses))
    .bind(booking.start_date)
    .bind(booking.end_date)
    .fetch_all(&mut **tx)
    .await
    .map_err(db_error("check overlaps"))?;

    Ok(ids.into_iter().map(|(id,)| BookingId::from_uuid(id)).collect())
}

impl BookingRepository for PostgresStore {
    fn reserve<'a>(
        &'a self,
        booking: &'a Booking,
        blocking: &'a [BookingStatus],
    ) -> StoreFuture<'a, ReserveOutcome> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

            if !lock_listing(&mut tx, *booking.listing_id.as_uuid()).await? {
                return Err(MarketError::not_found("Listing", booking.listing_id));
            }

            if !blocking.is_empty() {
                let conflicts = overlapping(&mut tx, booking, blocking).await?;
                if !conflicts.is_empty() {
                    debug!(listing_id = %booking.listing_id, ?conflicts, "Reservation blocked");
                    return Ok(ReserveOutcome::Conflict(conflicts));
                }
            }

            sqlx::query(
                r"
                INSERT INTO bookings (
                    id, listing_id, tenant_id, start_date, end_date,
                    status, tenant_seen, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(booking.id.as_uuid())
            .bind(booking.listing_id.as_uuid())
            .bind(booking.tenant_id.as_uuid())
            .bind(booking.start_date)
            .bind(booking.end_date)
            .bind(booking.status.as_str())
            .bind(booking.tenant_seen)
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("insert booking"))?;

            tx.commit().await.map_err(db_error("commit reservation"))?;
            Ok(ReserveOutcome::Reserved(booking.clone()))
        })
    }

    fn decide(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, DecideOutcome> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

            let listing: Option<(Uuid,)> =
                sqlx::query_as("SELECT listing_id FROM bookings WHERE id = $1")
                    .bind(booking_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error("get booking"))?;
            let Some((listing_id,)) = listing else {
                return Ok(DecideOutcome::Missing);
            };

            // Listing first, then booking: the same order `reserve` locks in.
            if !lock_listing(&mut tx, listing_id).await? {
                return Ok(DecideOutcome::Missing);
            }

            let row: Option<BookingRow> = sqlx::query_as(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
            ))
            .bind(booking_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("lock booking"))?;
            let Some(current) = row.map(Booking::try_from).transpose()? else {
                return Ok(DecideOutcome::Missing);
            };

            if current.status != BookingStatus::Pending {
                return Ok(DecideOutcome::AlreadyDecided(current.status));
            }

            if status == BookingStatus::Confirmed {
                let conflicts = overlapping(&mut tx, &current, &[BookingStatus::Confirmed]).await?;
                if !conflicts.is_empty() {
                    debug!(%booking_id, ?conflicts, "Confirmation blocked");
                    return Ok(DecideOutcome::Conflict(conflicts));
                }
            }

            let row: BookingRow = sqlx::query_as(&format!(
                r"
                UPDATE bookings
                SET status = $2, tenant_seen = FALSE, updated_at = $3
                WHERE id = $1
                RETURNING {BOOKING_COLUMNS}
                "
            ))
            .bind(booking_id.as_uuid())
            .bind(status.as_str())
            .bind(at)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("update booking"))?;

            tx.commit().await.map_err(db_error("commit decision"))?;
            Ok(DecideOutcome::Decided(Booking::try_from(row)?))
        })
    }

    fn get_booking(&self, booking_id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            sqlx::query_as::<_, BookingRow>(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
            ))
            .bind(booking_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get booking"))?
            .map(Booking::try_from)
            .transpose()
        })
    }

    fn list_for_owner(&self, owner_id: UserId) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, BookingRow>(
                r"
                SELECT b.id, b.listing_id, b.tenant_id, b.start_date, b.end_date,
                       b.status, b.tenant_seen, b.created_at, b.updated_at
                FROM bookings b
                JOIN listings l ON l.id = b.listing_id
                WHERE l.owner_id = $1
                ORDER BY (b.status = 'pending') DESC, b.created_at DESC
                ",
            )
            .bind(owner_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list owner bookings"))?;
            convert_all(rows)
        })
    }

    fn list_for_tenant(&self, tenant_id: UserId) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, BookingRow>(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE tenant_id = $1 ORDER BY created_at DESC"
            ))
            .bind(tenant_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list tenant bookings"))?;
            convert_all(rows)
        })
    }

    fn list_for_listing<'a>(
        &'a self,
        listing_id: ListingId,
        statuses: &'a [BookingStatus],
    ) -> StoreFuture<'a, Vec<Booking>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, BookingRow>(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings \
                 WHERE listing_id = $1 AND status = ANY($2) ORDER BY start_date"
            ))
            .bind(listing_id.as_uuid())
            .bind(status_names(statuses))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list listing bookings"))?;
            convert_all(rows)
        })
    }

    fn count_pending_for_owner(&self, owner_id: UserId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let (n,): (i64,) = sqlx::query_as(
                r"
                SELECT COUNT(*) FROM bookings b
                JOIN listings l ON l.id = b.listing_id
                WHERE l.owner_id = $1 AND b.status = 'pending'
                ",
            )
            .bind(owner_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count pending bookings"))?;
            Ok(count(n))
        })
    }

    fn count_unseen_for_tenant(&self, tenant_id: UserId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let (n,): (i64,) = sqlx::query_as(
                r"
                SELECT COUNT(*) FROM bookings
                WHERE tenant_id = $1 AND status <> 'pending' AND NOT tenant_seen
                ",
            )
            .bind(tenant_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count unseen bookings"))?;
            Ok(count(n))
        })
    }

    fn mark_seen_for_tenant(&self, tenant_id: UserId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let result =
                sqlx::query("UPDATE bookings SET tenant_seen = TRUE WHERE tenant_id = $1 AND NOT tenant_seen")
                    .bind(tenant_id.as_uuid())
                    .execute(&self.pool)
                    .await
                    .map_err(db_error("mark bookings seen"))?;
            Ok(result.rows_affected())
        })
    }
}
