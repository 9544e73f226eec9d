//! Axum middleware for request tracking and observability.
//!
//! # Flow
//!
//! 1. **Extract** correlation ID from `X-Correlation-ID` header (or generate new UUID)
//! 2. **Store** in request extensions for handler access
//! 3. **Run** the request inside an `http_request` span
//! 4. **Log** status and latency once the response is ready
//! 5. **Inject** correlation ID into response `X-Correlation-ID` header
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use rental_market_web::middleware::correlation_id_layer;
//!
//! let app = Router::new()
//!     .route("/api/listings", get(search_listings))
//!     .layer(correlation_id_layer());
//! ```

use axum::{extract::Request, http::HeaderValue, response::Response};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let started = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let mut response = fut.await?;

                let status = response.status();
                let latency_ms = started.elapsed().as_millis();
                if status.is_server_error() {
                    tracing::warn!(status = status.as_u16(), latency_ms, "Request failed");
                } else {
                    tracing::debug!(status = status.as_u16(), latency_ms, "Request completed");
                }

                if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                    response
                        .headers_mut()
                        .insert(CORRELATION_ID_HEADER, header_value);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Extension trait for reading the correlation ID stored by the middleware.
pub trait CorrelationIdExt {
    /// The correlation ID, if [`correlation_id_layer`] ran for this request.
    fn correlation_id(&self) -> Option<Uuid>;
}

impl CorrelationIdExt for axum::http::Extensions {
    fn correlation_id(&self) -> Option<Uuid> {
        self.get::<Uuid>().copied()
    }
}

impl CorrelationIdExt for Request {
    fn correlation_id(&self) -> Option<Uuid> {
        self.extensions().correlation_id()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::extractors::CorrelationId;
    use axum::{Router, body::Body, http::Request as HttpRequest, http::StatusCode, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/api/listings",
                get(|CorrelationId(id): CorrelationId| async move { id.to_string() }),
            )
            .route("/api/fail", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .layer(correlation_id_layer())
    }

    async fn call(uri: &str, header: Option<&str>) -> (StatusCode, String, String) {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(value) = header {
            builder = builder.header(CORRELATION_ID_HEADER, value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let echoed = response.headers()[CORRELATION_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, echoed, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_client_id_reaches_handler_and_response() {
        let sent = Uuid::new_v4().to_string();
        let (_, echoed, seen_by_handler) = call("/api/listings", Some(&sent)).await;
        assert_eq!(echoed, sent);
        assert_eq!(seen_by_handler, sent);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_id_is_replaced() {
        let (_, generated, seen_by_handler) = call("/api/listings", None).await;
        assert_eq!(generated, seen_by_handler);

        let (_, replaced, _) = call("/api/listings", Some("booking-42")).await;
        assert!(Uuid::parse_str(&replaced).is_ok());
    }

    #[tokio::test]
    async fn test_failed_responses_are_tagged_too() {
        let (status, echoed, _) = call("/api/fail", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(Uuid::parse_str(&echoed).is_ok());
    }
}
