//! Error taxonomy for marketplace operations.

use crate::types::{BookingId, BookingStatus};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// A single invalid input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Offending field name, as it appears on the wire
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every way a marketplace operation can fail.
///
/// The HTTP boundary translates each variant into a status code; nothing
/// here is retried internally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarketError {
    // ═══════════════════════════════════════════════════════════
    // Caller errors
    // ═══════════════════════════════════════════════════════════

    /// Malformed or missing input.
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// Missing or invalid credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The actor lacks the relationship the operation requires.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced entity absent or not in the expected state.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Kind of entity
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Date overlap or duplicate state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The booking already left `pending`.
    #[error("Booking {booking_id} has already been {status}")]
    AlreadyDecided {
        /// Booking that was decided earlier
        booking_id: BookingId,
        /// Its terminal status
        status: BookingStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // System errors
    // ═══════════════════════════════════════════════════════════

    /// The persistent store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Anything else unexpected (hashing, serialization).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Single-field validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError {
            field: field.into(),
            message: message.into(),
        }])
    }

    /// Not-found error for `resource` with `id`.
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Whether this is a system failure rather than a caller mistake.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Internal(_))
    }
}

/// Accumulates field errors so a request reports all of them at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    /// Empty validator.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Record an error for `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(FieldError {
                field: field.to_string(),
                message: message.into(),
            });
        }
        self
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] with every recorded field.
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(MarketError::Validation(self.errors))
        }
    }
}
