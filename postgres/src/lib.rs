//! `PostgreSQL` persistence for the rental marketplace.
//!
//! [`PostgresStore`] implements every repository trait of
//! `rental-market-core` over one connection pool. Queries are built at
//! runtime with `sqlx::query_as` and mapped through the row structs in
//! [`rows`].
//!
//! # Atomic booking writes
//!
//! `reserve` and `decide` each run in a transaction that first locks the
//! listing row (`SELECT ... FOR UPDATE`). Every check-then-write on the same
//! listing therefore serializes, and no two confirmed bookings of a listing
//! can overlap even under concurrent confirmations.
//!
//! # Example
//!
//! ```ignore
//! use rental_market_postgres::PostgresStore;
//!
//! let store = PostgresStore::connect(&url, 10, 2, Duration::from_secs(5)).await?;
//! store.migrate().await?;
//! let env = MarketEnvironment::with_store(Arc::new(store), clock, notifier);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analytics;
mod bookings;
mod favorites;
mod listings;
mod messages;
pub mod rows;
mod users;

use rental_market_core::error::{MarketError, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// `PostgreSQL` implementation of every marketplace repository.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    /// PostgreSQL connection pool.
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Storage`] if the database is unreachable.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(db_error("connect"))?;
        Ok(Self { pool })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| MarketError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Round-trip a trivial query.
    ///
    /// # Errors
    ///
    /// Returns error if the database does not answer.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error("ping"))?;
        Ok(())
    }
}

/// Map a driver error into the domain taxonomy, tagging it with `context`.
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> MarketError {
    move |e| MarketError::Storage(format!("Failed to {context}: {e}"))
}

/// Like [`db_error`], but a unique-constraint violation becomes a conflict.
pub(crate) fn unique_or_db_error(
    context: &'static str,
    conflict: &'static str,
) -> impl Fn(sqlx::Error) -> MarketError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return MarketError::Conflict(conflict.to_string());
            }
        }
        MarketError::Storage(format!("Failed to {context}: {e}"))
    }
}

/// Row counts come back as `BIGINT`.
pub(crate) fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}
