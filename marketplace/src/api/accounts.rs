//! Account API endpoints.
//!
//! - POST /api/auth/register - Create an account
//! - POST /api/auth/login - Exchange credentials for an access token
//! - GET /api/auth/me - The caller's profile (requires auth)

use super::failure;
use crate::auth::AuthUser;
use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use rental_market_core::accounts::Registration;
use rental_market_core::types::{Role, User, UserId};
use rental_market_web::WebResult;
use rental_market_web::extractors::JsonBody;
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create an account.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Plain-text password, at least 8 characters
    pub password: String,
}

/// Request to log in.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Plain-text password
    pub password: String,
}

/// Public view of an account.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// Account id
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Account role
    pub role: Role,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for REST and WebSocket
    pub token: String,
    /// The logged-in account
    pub user: UserResponse,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create an account.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/auth/register \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Ana", "email": "ana@example.com", "password": "correct horse"}'
/// ```
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> WebResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .accounts
        .register(Registration {
            name: request.name,
            email: request.email,
            password: request.password,
        })
        .await
        .map_err(failure(&state, "register", None))?;

    info!(user_id = %user.id, "Account registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Exchange credentials for an access token.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> WebResult<Json<LoginResponse>> {
    let user = state
        .accounts
        .login(&request.email, &request.password)
        .await
        .map_err(failure(&state, "login", None))?;
    let token = state.jwt.issue(&user)?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// The caller's profile.
pub async fn me(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<UserResponse>> {
    let user = state
        .accounts
        .get(actor.id)
        .await
        .map_err(failure(&state, "me", Some(actor.id)))?;
    Ok(Json(user.into()))
}
