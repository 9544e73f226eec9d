//! Registration and password login.
//!
//! Passwords are hashed with bcrypt on the blocking thread pool; token
//! issuance lives with the HTTP application.

use crate::environment::MarketEnvironment;
use crate::error::{MarketError, Result, Validator};
use crate::types::{Role, User, UserId};
use tracing::{info, instrument, warn};

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 8;
/// Longest accepted display name
pub const MAX_NAME_LEN: usize = 100;
/// bcrypt work factor used unless a service is built with another one
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// New account fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    /// Display name
    pub name: String,
    /// Email, matched case-insensitively
    pub email: String,
    /// Plain-text password
    pub password: String,
}

impl Registration {
    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] listing each offending field.
    pub fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        let mut v = Validator::new();
        v.check(!name.is_empty(), "name", "name is required")
            .check(
                name.chars().count() <= MAX_NAME_LEN,
                "name",
                format!("name must be at most {MAX_NAME_LEN} characters"),
            )
            .check(is_valid_email(&self.email), "email", "email is invalid")
            .check(
                self.password.chars().count() >= MIN_PASSWORD_LEN,
                "password",
                format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            );
        v.finish()
    }
}

fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Account operations.
#[derive(Clone, Debug)]
pub struct AccountService {
    env: MarketEnvironment,
    hash_cost: u32,
}

impl AccountService {
    /// Service over `env` hashing at bcrypt's default cost.
    #[must_use]
    pub const fn new(env: MarketEnvironment) -> Self {
        Self::with_hash_cost(env, DEFAULT_HASH_COST)
    }

    /// Service over `env` hashing at `hash_cost` (tests use the minimum, 4).
    #[must_use]
    pub const fn with_hash_cost(env: MarketEnvironment, hash_cost: u32) -> Self {
        Self { env, hash_cost }
    }

    /// Create a regular account.
    ///
    /// # Errors
    ///
    /// `Validation` for bad fields; `Conflict` when the email is taken.
    #[instrument(skip(self, registration))]
    pub async fn register(&self, registration: Registration) -> Result<User> {
        registration.validate()?;
        self.create(registration, Role::User).await
    }

    /// Check credentials and return the account.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for an unknown email or a wrong password.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let invalid = || MarketError::Unauthorized("Invalid email or password".to_string());

        let user = self
            .env
            .users
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;

        let hash = user.password_hash.clone();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| MarketError::Internal(format!("Password check aborted: {e}")))?
            .unwrap_or(false);

        if verified {
            Ok(user)
        } else {
            warn!(user_id = %user.id, "Failed login attempt");
            Err(invalid())
        }
    }

    /// A user by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when the account does not exist.
    pub async fn get(&self, user_id: UserId) -> Result<User> {
        self.env
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| MarketError::not_found("User", user_id))
    }

    /// Create the configured admin account unless the email already exists.
    ///
    /// # Errors
    ///
    /// `Validation` for bad fields; storage failures.
    pub async fn ensure_admin(&self, registration: Registration) -> Result<User> {
        registration.validate()?;
        if let Some(existing) = self
            .env
            .users
            .find_user_by_email(&normalize_email(&registration.email))
            .await?
        {
            return Ok(existing);
        }
        let admin = self.create(registration, Role::Admin).await?;
        info!(user_id = %admin.id, "Bootstrap admin account created");
        Ok(admin)
    }

    async fn create(&self, registration: Registration, role: Role) -> Result<User> {
        let cost = self.hash_cost;
        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| MarketError::Internal(format!("Password hashing aborted: {e}")))?
            .map_err(|e| MarketError::Internal(format!("Password hashing failed: {e}")))?;

        let user = User {
            id: UserId::new(),
            name: registration.name.trim().to_string(),
            email: normalize_email(&registration.email),
            password_hash,
            role,
            created_at: self.env.clock.now(),
        };
        self.env.users.create_user(&user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("  Ana.B@Example.co.uk "));
        assert!(!is_valid_email("ana.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana@localhost"));
        assert!(!is_valid_email("ana@@example.com"));
        assert!(!is_valid_email("a na@example.com"));
    }

    #[test]
    fn test_registration_validation() {
        let ok = Registration {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "correct horse".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = Registration {
            name: String::new(),
            password: "short".to_string(),
            ..ok
        };
        let Err(MarketError::Validation(fields)) = bad.validate() else {
            unreachable!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_email_normalized() {
        assert_eq!(normalize_email(" Ana@Example.COM "), "ana@example.com");
    }
}
