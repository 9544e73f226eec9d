//! `MessageRepository` over the `messages` table.

use crate::rows::MessageRow;
use crate::{PostgresStore, count, db_error};
use rental_market_core::providers::{MessageRepository, StoreFuture};
use rental_market_core::types::{ListingId, Message, UserId};

const MESSAGE_COLUMNS: &str = "id, listing_id, sender_id, receiver_id, content, is_read, created_at";

impl MessageRepository for PostgresStore {
    fn insert_message<'a>(&'a self, message: &'a Message) -> StoreFuture<'a, Message> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO messages (id, listing_id, sender_id, receiver_id, content, is_read, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(message.id.as_uuid())
            .bind(message.listing_id.as_uuid())
            .bind(message.sender_id.as_uuid())
            .bind(message.receiver_id.as_uuid())
            .bind(&message.content)
            .bind(message.is_read)
            .bind(message.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error("insert message"))?;

            Ok(message.clone())
        })
    }

    fn list_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Message>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, MessageRow>(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages \
                 WHERE sender_id = $1 OR receiver_id = $1 ORDER BY created_at DESC"
            ))
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list messages"))?;
            Ok(rows.into_iter().map(Message::from).collect())
        })
    }

    fn thread(&self, listing_id: ListingId, a: UserId, b: UserId) -> StoreFuture<'_, Vec<Message>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, MessageRow>(&format!(
                r"
                SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE listing_id = $1
                  AND ((sender_id = $2 AND receiver_id = $3)
                    OR (sender_id = $3 AND receiver_id = $2))
                ORDER BY created_at ASC
                "
            ))
            .bind(listing_id.as_uuid())
            .bind(a.as_uuid())
            .bind(b.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("load thread"))?;
            Ok(rows.into_iter().map(Message::from).collect())
        })
    }

    fn mark_read(
        &self,
        listing_id: ListingId,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE messages SET is_read = TRUE
                WHERE listing_id = $1 AND sender_id = $2 AND receiver_id = $3 AND NOT is_read
                ",
            )
            .bind(listing_id.as_uuid())
            .bind(sender_id.as_uuid())
            .bind(receiver_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error("mark messages read"))?;
            Ok(result.rows_affected())
        })
    }

    fn count_unread(&self, user_id: UserId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let (n,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND NOT is_read")
                    .bind(user_id.as_uuid())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_error("count unread messages"))?;
            Ok(count(n))
        })
    }
}
