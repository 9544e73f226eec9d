//! `AnalyticsRepository` over the `analytics` table.

use crate::{PostgresStore, count, db_error};
use chrono::{DateTime, Utc};
use rental_market_core::providers::{AnalyticsRepository, StoreFuture};
use rental_market_core::types::ListingId;
use std::collections::HashMap;
use uuid::Uuid;

impl AnalyticsRepository for PostgresStore {
    fn record_view(&self, listing_id: ListingId, at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO analytics (listing_id, views, last_viewed_at)
                VALUES ($1, 1, $2)
                ON CONFLICT (listing_id) DO UPDATE
                SET views = analytics.views + 1,
                    last_viewed_at = EXCLUDED.last_viewed_at
                ",
            )
            .bind(listing_id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(db_error("record view"))?;
            Ok(())
        })
    }

    fn views_for<'a>(
        &'a self,
        listing_ids: &'a [ListingId],
    ) -> StoreFuture<'a, HashMap<ListingId, u64>> {
        Box::pin(async move {
            let ids: Vec<Uuid> = listing_ids.iter().map(|id| *id.as_uuid()).collect();
            let rows: Vec<(Uuid, i64)> =
                sqlx::query_as("SELECT listing_id, views FROM analytics WHERE listing_id = ANY($1)")
                    .bind(ids)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db_error("load views"))?;
            Ok(rows
                .into_iter()
                .map(|(id, views)| (ListingId::from_uuid(id), count(views)))
                .collect())
        })
    }
}
