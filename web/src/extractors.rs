//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request correlation ID
//! - `BearerToken`: a raw credential from `Authorization: Bearer` or `?token=`
//! - `JsonBody`, `PathParams`, `QueryParams`: axum's `Json`, `Path` and
//!   `Query` with rejections rendered as [`AppError`] JSON bodies
//!
//! # Examples
//!
//! ```ignore
//! use rental_market_web::extractors::{BearerToken, CorrelationId};
//!
//! async fn handler(correlation_id: CorrelationId, token: BearerToken) -> Result<Json<Me>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, "Processing request");
//!     let claims = keys.verify(&token.0)?;
//!     Ok(Json(me))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::{CORRELATION_ID_HEADER, CorrelationIdExt};
use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header, request::Parts},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// JSON request body; malformed or mistyped bodies become `VALIDATION_ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Path parameters; unparsable segments become `BAD_REQUEST`.
#[derive(Debug, Clone, Copy)]
pub struct PathParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Query string; unparsable parameters become `BAD_REQUEST`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Correlation ID for request tracing.
///
/// Taken from the correlation middleware when installed, otherwise from the
/// `X-Correlation-ID` header, otherwise freshly generated.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .correlation_id()
            .or_else(|| {
                parts
                    .headers
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Credential from `Authorization: Bearer <token>`.
///
/// Browsers cannot set headers on a WebSocket handshake, so a `token` query
/// parameter is accepted as a fallback.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
            let value = value
                .to_str()
                .map_err(|_| AppError::unauthorized("Invalid authorization header"))?;

            let token = value.strip_prefix("Bearer ").ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?;

            if token.is_empty() {
                return Err(AppError::unauthorized("Empty bearer token"));
            }
            return Ok(Self(token.to_string()));
        }

        let token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        Ok(Self(token))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{Request as HttpRequest, StatusCode};

    async fn bearer(req: HttpRequest<()>) -> Result<BearerToken, AppError> {
        let (mut parts, ()) = req.into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = HttpRequest::builder()
            .header(CORRELATION_ID_HEADER, uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let mut req = HttpRequest::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .expect("Valid request");
        req.extensions_mut().insert(stored);

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, stored);
    }

    #[tokio::test]
    async fn test_bearer_from_header() {
        let req = HttpRequest::builder()
            .header("Authorization", "Bearer abc.def")
            .body(())
            .unwrap();
        assert_eq!(bearer(req).await.unwrap().0, "abc.def");
    }

    #[tokio::test]
    async fn test_bearer_from_query() {
        let req = HttpRequest::builder().uri("/api/ws?token=xyz").body(()).unwrap();
        assert_eq!(bearer(req).await.unwrap().0, "xyz");
    }

    #[tokio::test]
    async fn test_bearer_rejects_other_schemes() {
        let req = HttpRequest::builder()
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap();
        let err = bearer(req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[derive(Debug, Deserialize)]
    struct Stay {
        nights: u32,
    }

    async fn json_body(body: &'static str) -> Result<JsonBody<Stay>, AppError> {
        let req = HttpRequest::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap();
        JsonBody::<Stay>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn test_json_body_accepts_valid_input() {
        let JsonBody(stay) = json_body(r#"{"nights":3}"#).await.unwrap();
        assert_eq!(stay.nights, 3);
    }

    #[tokio::test]
    async fn test_json_body_names_mistyped_field() {
        let err = json_body(r#"{"nights":"three"}"#).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().starts_with("[VALIDATION_ERROR] nights: "));
    }

    #[tokio::test]
    async fn test_json_body_syntax_error_is_bad_request() {
        let err = json_body("{not json").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_bearer_missing() {
        let req = HttpRequest::builder().uri("/api/counters").body(()).unwrap();
        assert_eq!(bearer(req).await.unwrap_err().status(), StatusCode::UNAUTHORIZED);
    }
}
