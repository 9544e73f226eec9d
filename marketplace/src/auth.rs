//! Access tokens and the extractors that verify them.
//!
//! Tokens are HS256 JWTs carrying the account id and role. The same token
//! authenticates REST calls (`Authorization: Bearer`) and the WebSocket
//! handshake (`?token=`).
//!
//! # Usage
//!
//! ```rust,ignore
//! use marketplace::auth::{AuthUser, RequireAdmin};
//!
//! // Require authentication
//! async fn my_bookings(AuthUser(actor): AuthUser) -> WebResult<Json<Vec<Booking>>> { ... }
//!
//! // Require admin role
//! async fn pending(RequireAdmin(admin): RequireAdmin) -> WebResult<Json<Vec<Listing>>> { ... }
//! ```

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rental_market_core::types::{Actor, Role, User, UserId};
use rental_market_web::{AppError, BearerToken};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: Uuid,
    /// Account role at issue time
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

impl Claims {
    /// The caller these claims identify.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor {
            id: UserId::from_uuid(self.sub),
            role: self.role,
        }
    }
}

/// Signing and verification keys for access tokens.
///
/// Clone-cheap.
#[derive(Clone)]
pub struct JwtKeys {
    inner: Arc<KeysInner>,
}

struct KeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl JwtKeys {
    /// Keys derived from a shared `secret`; tokens live `ttl_secs`.
    #[must_use]
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            inner: Arc::new(KeysInner {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
            }),
        }
    }

    /// Sign a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns a 500 if signing fails.
    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: *user.id.as_uuid(),
            role: user.role,
            iat,
            exp: iat.saturating_add(self.inner.ttl_secs),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.inner.encoding).map_err(
            |e| AppError::internal("Failed to issue token").with_source(anyhow::anyhow!(e)),
        )
    }

    /// Check signature and expiry of `token`.
    ///
    /// # Errors
    ///
    /// Returns 401 for a malformed, forged or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        jsonwebtoken::decode::<Claims>(token, &self.inner.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                AppError::unauthorized("Invalid or expired token")
            })
    }
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys")
            .field("ttl_secs", &self.inner.ttl_secs)
            .finish_non_exhaustive()
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let claims = JwtKeys::from_ref(state).verify(&token)?;
        Ok(Self(claims.actor()))
    }
}

/// The caller if a credential was presented.
///
/// A missing credential yields `None`; a present but invalid one is still
/// rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct OptionalAuth(pub Option<Actor>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuth
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match BearerToken::from_request_parts(parts, state).await {
            Ok(BearerToken(token)) => {
                let claims = JwtKeys::from_ref(state).verify(&token)?;
                Ok(Self(Some(claims.actor())))
            }
            Err(_) => Ok(Self(None)),
        }
    }
}

/// An authenticated admin.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(actor) = AuthUser::from_request_parts(parts, state).await?;
        if actor.is_admin() {
            Ok(Self(actor))
        } else {
            Err(AppError::forbidden("Admin access required"))
        }
    }
}
