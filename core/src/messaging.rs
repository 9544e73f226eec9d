//! Messages between users about a listing.
//!
//! Conversations are not stored; they are derived from the message history
//! as unique `(listing, counterparty)` pairs.

use crate::environment::MarketEnvironment;
use crate::error::{MarketError, Result, Validator};
use crate::notify::{ChannelKey, Notification};
use crate::types::{Conversation, ListingId, Message, MessageId, UserId};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Longest accepted message body
pub const MAX_CONTENT_LEN: usize = 2000;

/// Messaging operations.
#[derive(Clone, Debug)]
pub struct MessagingService {
    env: MarketEnvironment,
}

impl MessagingService {
    /// Service over `env`.
    #[must_use]
    pub const fn new(env: MarketEnvironment) -> Self {
        Self { env }
    }

    /// Send a message about a listing.
    ///
    /// One of the two parties must own the listing. The receiver is notified
    /// and the sender gets an echo for their other open sessions.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty/oversized body or a message to oneself
    /// - `NotFound` when the listing or the receiver does not exist
    /// - `Forbidden` when neither party owns the listing
    #[instrument(skip(self, content))]
    pub async fn send(
        &self,
        sender_id: UserId,
        listing_id: ListingId,
        receiver_id: UserId,
        content: &str,
    ) -> Result<Message> {
        let content = content.trim();
        let mut v = Validator::new();
        v.check(!content.is_empty(), "content", "content is required")
            .check(
                content.chars().count() <= MAX_CONTENT_LEN,
                "content",
                format!("content must be at most {MAX_CONTENT_LEN} characters"),
            )
            .check(
                receiver_id != sender_id,
                "receiver_id",
                "you cannot message yourself",
            );
        v.finish()?;

        let listing = self
            .env
            .listings
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Listing", listing_id))?;
        if listing.owner_id != sender_id && listing.owner_id != receiver_id {
            return Err(MarketError::Forbidden(
                "Messages must involve the listing owner".to_string(),
            ));
        }
        if self.env.users.get_user(receiver_id).await?.is_none() {
            return Err(MarketError::not_found("User", receiver_id));
        }

        let message = Message {
            id: MessageId::new(),
            listing_id,
            sender_id,
            receiver_id,
            content: content.to_string(),
            is_read: false,
            created_at: self.env.clock.now(),
        };
        let message = self.env.messages.insert_message(&message).await?;
        debug!(message_id = %message.id, "Message sent");

        let notification = Notification::message_sent(&message);
        self.env
            .notifier
            .publish(&ChannelKey::User(receiver_id), notification.clone());
        self.env
            .notifier
            .publish(&ChannelKey::User(sender_id), notification);
        Ok(message)
    }

    /// Conversations of `user_id`, most recent activity first.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn conversations(&self, user_id: UserId) -> Result<Vec<Conversation>> {
        let messages = self.env.messages.list_for_user(user_id).await?;
        Ok(derive_conversations(user_id, messages))
    }

    /// Messages between `user_id` and `counterparty_id` about a listing,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn thread(
        &self,
        user_id: UserId,
        listing_id: ListingId,
        counterparty_id: UserId,
    ) -> Result<Vec<Message>> {
        self.env
            .messages
            .thread(listing_id, user_id, counterparty_id)
            .await
    }

    /// Mark everything `counterparty_id` sent to `user_id` about the listing
    /// as read and tell both parties.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        user_id: UserId,
        listing_id: ListingId,
        counterparty_id: UserId,
    ) -> Result<u64> {
        let count = self
            .env
            .messages
            .mark_read(listing_id, counterparty_id, user_id)
            .await?;

        let notification = Notification::messages_read(listing_id, user_id, counterparty_id, count);
        self.env
            .notifier
            .publish(&ChannelKey::User(user_id), notification.clone());
        self.env
            .notifier
            .publish(&ChannelKey::User(counterparty_id), notification);
        Ok(count)
    }
}

/// Group a newest-first message history into conversations.
fn derive_conversations(user_id: UserId, messages: Vec<Message>) -> Vec<Conversation> {
    let mut order: Vec<(ListingId, UserId)> = Vec::new();
    let mut by_key: HashMap<(ListingId, UserId), Conversation> = HashMap::new();

    for message in messages {
        let key = (message.listing_id, message.counterparty(user_id));
        let unread = u64::from(message.receiver_id == user_id && !message.is_read);
        match by_key.get_mut(&key) {
            Some(conversation) => conversation.unread_count += unread,
            None => {
                order.push(key);
                by_key.insert(
                    key,
                    Conversation {
                        listing_id: key.0,
                        counterparty_id: key.1,
                        last_message: message,
                        unread_count: unread,
                    },
                );
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn message(listing: ListingId, from: UserId, to: UserId, minute: i64, read: bool) -> Message {
        Message {
            id: MessageId::new(),
            listing_id: listing,
            sender_id: from,
            receiver_id: to,
            content: format!("m{minute}"),
            is_read: read,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minute),
        }
    }

    #[test]
    fn test_conversations_grouped_by_listing_and_counterparty() {
        let me = UserId::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let flat = ListingId::new();
        let house = ListingId::new();

        // newest first, as the store returns them
        let history = vec![
            message(flat, alice, me, 5, false),
            message(house, me, alice, 4, false),
            message(flat, bob, me, 3, true),
            message(flat, alice, me, 2, false),
            message(flat, me, alice, 1, true),
        ];

        let conversations = derive_conversations(me, history);

        assert_eq!(conversations.len(), 3);
        assert_eq!(conversations[0].listing_id, flat);
        assert_eq!(conversations[0].counterparty_id, alice);
        assert_eq!(conversations[0].last_message.content, "m5");
        assert_eq!(conversations[0].unread_count, 2);
        assert_eq!(conversations[1].listing_id, house);
        assert_eq!(conversations[1].unread_count, 0);
        assert_eq!(conversations[2].counterparty_id, bob);
        assert_eq!(conversations[2].unread_count, 0);
    }
}
