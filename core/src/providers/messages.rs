//! Message repository trait.

use super::StoreFuture;
use crate::types::{ListingId, Message, UserId};

/// Message storage.
pub trait MessageRepository: Send + Sync {
    /// Insert a message.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn insert_message<'a>(&'a self, message: &'a Message) -> StoreFuture<'a, Message>;

    /// Every message sent or received by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn list_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Message>>;

    /// Messages between `a` and `b` about `listing_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn thread(&self, listing_id: ListingId, a: UserId, b: UserId) -> StoreFuture<'_, Vec<Message>>;

    /// Mark unread messages from `sender_id` to `receiver_id` about
    /// `listing_id` as read; returns rows touched.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn mark_read(
        &self,
        listing_id: ListingId,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> StoreFuture<'_, u64>;

    /// Unread messages addressed to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails.
    fn count_unread(&self, user_id: UserId) -> StoreFuture<'_, u64>;
}
