//! Health check endpoints for the marketplace.
//!
//! `/health` is a liveness check that touches nothing; `/health/ready`
//! runs the configured [`ReadinessProbe`].

use super::state::AppState;
use async_trait::async_trait;
use axum::{Json, extract::State, http::StatusCode};
use rental_market_postgres::PostgresStore;
use rental_market_web::handlers::health::{HealthReport, ReadinessProbe, readiness};

/// Readiness gated on a database round trip.
#[derive(Debug, Clone)]
pub struct DatabaseProbe {
    store: PostgresStore,
}

impl DatabaseProbe {
    /// Probe pinging `store`.
    #[must_use]
    pub const fn new(store: PostgresStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReadinessProbe for DatabaseProbe {
    fn component(&self) -> &'static str {
        "database"
    }

    async fn check(&self) -> Result<(), String> {
        self.store.ping().await.map_err(|e| e.to_string())
    }
}

/// Readiness for a process with no external dependency (in-memory store).
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcess;

#[async_trait]
impl ReadinessProbe for InProcess {
    fn component(&self) -> &'static str {
        "store"
    }

    async fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Readiness check endpoint.
///
/// Returns 200 when the probe passes, 503 otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health/ready
/// # {"component":"database","status":"healthy"}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    readiness(state.readiness.as_ref()).await
}
