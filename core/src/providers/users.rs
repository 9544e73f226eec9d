//! User repository trait.

use super::StoreFuture;
use crate::types::{User, UserId};

/// User account storage.
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - Email already registered → `MarketError::Conflict`
    fn create_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, User>;

    /// Get an account by id.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn get_user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>>;

    /// Get an account by (lower-cased) email.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>>;
}
