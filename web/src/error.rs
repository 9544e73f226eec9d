//! Error types for web handlers.
//!
//! [`AppError`] bridges [`MarketError`] and HTTP responses. Every handler
//! returns `Result<_, AppError>`; the body is always
//! `{ "code": ..., "message": ... }`, plus `fields` for validation failures.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rental_market_core::MarketError;
use rental_market_core::error::FieldError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Listing>, AppError> {
///     let listing = state.listings.get(id, None).await?;
///     Ok(Json(listing))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Per-field problems, validation errors only
    fields: Vec<FieldError>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            fields: Vec::new(),
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            message.into(),
            "CONFLICT".to_string(),
        )
    }

    /// Create a 422 Unprocessable Entity error listing every bad field.
    #[must_use]
    pub fn validation(fields: Vec<FieldError>) -> Self {
        let message = fields
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            fields,
            ..Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                message,
                "VALIDATION_ERROR".to_string(),
            )
        }
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
    /// Offending fields of a validation failure.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            fields: self.fields,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                Self::validation(vec![body_field_error(&err.body_text())])
            }
            JsonRejection::MissingJsonContentType(err) => Self::new(
                err.status(),
                err.body_text(),
                "UNSUPPORTED_MEDIA_TYPE".to_string(),
            ),
            other => Self::bad_request(other.body_text()),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Split axum's `"<prefix>: <path>: <reason>"` deserialization text into the
/// offending field and reason. Root-level problems are reported on `body`.
fn body_field_error(text: &str) -> FieldError {
    let detail = text.split_once(": ").map_or(text, |(_, detail)| detail);
    let (field, message) = match detail.split_once(": ") {
        Some((path, reason)) if !path.contains(char::is_whitespace) => (path, reason),
        _ => ("body", detail),
    };
    FieldError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Map a domain error, hiding storage and internal detail.
impl From<MarketError> for AppError {
    fn from(err: MarketError) -> Self {
        Self::from_market(err, false)
    }
}

impl AppError {
    /// Map a domain error to its HTTP status and code.
    ///
    /// With `expose_internal` set, 5xx responses carry the underlying error
    /// text instead of a generic message. The source is kept for logging
    /// either way.
    #[must_use]
    pub fn from_market(err: MarketError, expose_internal: bool) -> Self {
        match err {
            MarketError::Validation(fields) => Self::validation(fields),
            MarketError::Unauthorized(message) => Self::unauthorized(message),
            MarketError::Forbidden(message) => Self::forbidden(message),
            MarketError::NotFound { resource, id } => Self::not_found(resource, id),
            MarketError::Conflict(message) => Self::conflict(message),
            already @ MarketError::AlreadyDecided { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                already.to_string(),
                "ALREADY_DECIDED".to_string(),
            ),
            internal @ (MarketError::Storage(_) | MarketError::Internal(_)) => {
                let message = if expose_internal {
                    internal.to_string()
                } else {
                    "An internal error occurred".to_string()
                };
                Self::internal(message).with_source(internal.into())
            }
        }
    }
}
