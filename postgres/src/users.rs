//! `UserRepository` over the `users` table.

use crate::rows::UserRow;
use crate::{PostgresStore, db_error, unique_or_db_error};
use rental_market_core::providers::{StoreFuture, UserRepository};
use rental_market_core::types::{User, UserId};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

impl UserRepository for PostgresStore {
    fn create_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, User> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO users (id, name, email, password_hash, role, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(user.id.as_uuid())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(unique_or_db_error("create user", "Email already registered"))?;

            Ok(user.clone())
        })
    }

    fn get_user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("get user"))?
                .map(User::try_from)
                .transpose()
        })
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move {
            sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find user"))?
            .map(User::try_from)
            .transpose()
        })
    }
}
