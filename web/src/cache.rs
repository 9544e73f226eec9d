//! Response caching for public read routes.
//!
//! LRU cache of successful `GET` responses keyed by path and query, with a
//! fixed time-to-live. Mutations never invalidate entries: a read may be up
//! to one TTL stale.
//!
//! ## Features
//!
//! - **LRU Eviction**: least-recently-used entry goes first when full
//! - **TTL Support**: expired entries are never served
//! - **Bounded Size**: maximum entry count enforced
//!
//! # Example
//!
//! ```ignore
//! let cache = ResponseCache::new(512, Duration::from_secs(60));
//! let public = Router::new()
//!     .route("/api/listings", get(search))
//!     .layer(axum::middleware::from_fn_with_state(cache.clone(), cache_responses));
//! ```

use crate::error::AppError;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Response header telling whether the body came from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Largest body the cache will buffer.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

#[derive(Clone, Debug)]
struct CachedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    cached_at: Instant,
    last_accessed: Instant,
}

impl CachedResponse {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }

    fn to_response(&self) -> Response {
        let mut response = (self.status, self.body.clone()).into_response();
        for (name, value) in &self.headers {
            response.headers_mut().insert(name, value.clone());
        }
        response
            .headers_mut()
            .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("hit"));
        response
    }
}

/// Shared LRU + TTL response cache.
///
/// Clone-cheap; every clone sees the same entries.
#[derive(Clone, Debug)]
pub struct ResponseCache {
    entries: Arc<Mutex<HashMap<String, CachedResponse>>>,
    capacity: usize,
    ttl: Duration,
}

impl ResponseCache {
    /// Cache holding at most `capacity` responses for `ttl` each.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedResponse>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, key: &str) -> Option<Response> {
        let mut entries = self.lock();
        if entries.get(key).is_some_and(|e| e.is_expired(self.ttl)) {
            entries.remove(key);
            return None;
        }
        let entry = entries.get_mut(key)?;
        entry.last_accessed = Instant::now();
        Some(entry.to_response())
    }

    fn insert(&self, key: String, status: StatusCode, headers: HeaderMap, body: Bytes) {
        let mut entries = self.lock();
        entries.retain(|_, e| !e.is_expired(self.ttl));

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(lru) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&lru);
            }
        }

        let now = Instant::now();
        entries.insert(
            key,
            CachedResponse {
                status,
                headers,
                body,
                cached_at: now,
                last_accessed: now,
            },
        );
    }
}

/// Middleware serving cached `GET` responses and storing fresh 2xx ones.
///
/// # Errors
///
/// Returns 500 if a fresh response body cannot be buffered.
pub async fn cache_responses(
    State(cache): State<ResponseCache>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if request.method() != Method::GET {
        return Ok(next.run(request).await);
    }

    let key = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), ToString::to_string);

    if let Some(hit) = cache.get(&key) {
        debug!(%key, "Response cache hit");
        return Ok(hit);
    }

    let response = next.run(request).await;
    if !response.status().is_success() {
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::internal("Failed to buffer response").with_source(anyhow::anyhow!(e)))?;

    cache.insert(key, parts.status, parts.headers.clone(), bytes.clone());
    parts
        .headers
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("miss"));

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, middleware::from_fn_with_state, routing::get};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn app(cache: &ResponseCache, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/items",
                get(move || {
                    let hits = Arc::clone(&hits);
                    async move { hits.fetch_add(1, Ordering::SeqCst).to_string() }
                })
                .post(|| async { StatusCode::CREATED }),
            )
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .layer(from_fn_with_state(cache.clone(), cache_responses))
    }

    async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Option<String>, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cache = response
            .headers()
            .get(CACHE_STATUS_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, cache, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_second_get_is_served_from_cache() {
        let cache = ResponseCache::new(8, Duration::from_secs(60));
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(&cache, Arc::clone(&hits));

        let first = call(&app, Method::GET, "/items?page=1").await;
        let second = call(&app, Method::GET, "/items?page=1").await;

        assert_eq!(first.1.as_deref(), Some("miss"));
        assert_eq!(second.1.as_deref(), Some("hit"));
        assert_eq!(first.2, second.2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_is_part_of_key() {
        let cache = ResponseCache::new(8, Duration::from_secs(60));
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(&cache, Arc::clone(&hits));

        call(&app, Method::GET, "/items?page=1").await;
        call(&app, Method::GET, "/items?page=2").await;

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_errors_and_non_get_not_cached() {
        let cache = ResponseCache::new(8, Duration::from_secs(60));
        let app = app(&cache, Arc::new(AtomicUsize::new(0)));

        let (status, header, _) = call(&app, Method::GET, "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(header.is_none());

        call(&app, Method::POST, "/items").await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let cache = ResponseCache::new(8, Duration::ZERO);
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(&cache, Arc::clone(&hits));

        call(&app, Method::GET, "/items").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        call(&app, Method::GET, "/items").await;

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lru_eviction_and_clear() {
        let cache = ResponseCache::new(2, Duration::from_secs(60));
        let app = app(&cache, Arc::new(AtomicUsize::new(0)));

        call(&app, Method::GET, "/items?a").await;
        call(&app, Method::GET, "/items?b").await;
        call(&app, Method::GET, "/items?a").await;
        call(&app, Method::GET, "/items?c").await;

        assert_eq!(cache.len(), 2);
        assert!(cache.get("/items?a").is_some());
        assert!(cache.get("/items?b").is_none());

        cache.clear();
        assert!(cache.is_empty());
    }
}
