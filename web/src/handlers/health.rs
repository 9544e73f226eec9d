//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use async_trait::async_trait;
use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check dependencies (database, etc.).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// A dependency whose availability gates readiness.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Name reported in the health body.
    fn component(&self) -> &'static str;

    /// `Err` carries a short reason when the dependency is unreachable.
    async fn check(&self) -> Result<(), String>;
}

/// Component health as reported by `/health/ready`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Fully operational
    Healthy,
    /// Not operational
    Unhealthy,
}

/// Readiness body.
#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    /// Name of the component being checked
    pub component: &'static str,
    /// Current health status
    pub status: HealthStatus,
    /// Failure reason, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Run `probe` and turn the outcome into a readiness response.
///
/// # Status Codes
///
/// - 200 OK: Healthy
/// - 503 Service Unavailable: Unhealthy
pub async fn readiness(probe: &dyn ReadinessProbe) -> (StatusCode, Json<HealthReport>) {
    match probe.check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthReport {
                component: probe.component(),
                status: HealthStatus::Healthy,
                message: None,
            }),
        ),
        Err(reason) => {
            tracing::warn!(component = probe.component(), %reason, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport {
                    component: probe.component(),
                    status: HealthStatus::Unhealthy,
                    message: Some(reason),
                }),
            )
        }
    }
}
