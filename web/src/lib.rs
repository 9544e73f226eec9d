//! Axum integration for the rental marketplace.
//!
//! Generic HTTP plumbing shared by the application crate:
//!
//! - [`AppError`]: `MarketError` → HTTP status and JSON body
//! - [`extractors`]: correlation ID, bearer credential, and JSON/path/query
//!   extractors whose rejections are `AppError` bodies
//! - [`middleware`]: correlation ID propagation and request logging
//! - [`handlers::health`]: liveness and readiness
//! - [`notifications::NotificationHub`]: per-topic broadcast implementing
//!   the core `Notifier` contract
//! - [`ws`]: WebSocket session pump and connection limiting
//! - [`cache::ResponseCache`]: LRU + TTL cache layer for public reads
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, WebSocket
//! │  - Request parsing                      │  ← Correlation, caching
//! │  - Response serialization               │  ← Logging, metrics
//! ├─────────────────────────────────────────┤
//! │         rental-market-core              │
//! │  - Booking engine and services          │  ← Repository traits
//! │  - Notifier contract                    │  ← Clock
//! └─────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod notifications;
pub mod ws;

// Re-export key types for convenience
pub use cache::{ResponseCache, cache_responses};
pub use error::AppError;
pub use extractors::{BearerToken, CorrelationId, JsonBody, PathParams, QueryParams};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationIdExt, correlation_id_layer};
pub use notifications::{NotificationHub, Subscription};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
