//! Notification fan-out contract.
//!
//! Services publish a [`Notification`] to a [`ChannelKey`] after their state
//! change has been committed. Delivery is at-most-once and best-effort:
//!
//! ```text
//! ┌──────────────┐  commit   ┌────────────┐  publish   ┌──────────────┐
//! │   Service    │──────────▶│   Store    │            │   Notifier   │
//! │              │───────────────────────────────────▶│ (transport)  │
//! └──────────────┘                                     └──────┬───────┘
//!                                                              │
//!                                             live connections │ only
//!                                                              ▼
//!                                                      ┌──────────────┐
//!                                                      │ user:<uuid>  │
//!                                                      │ admins       │
//!                                                      └──────────────┘
//! ```
//!
//! A channel with no live subscriber drops the event. Nothing is queued,
//! persisted or retried, and a dropped event never rolls back the state
//! change that produced it.
//!
//! # Topic Naming Convention
//!
//! - `user:<uuid>` - every connection authenticated as that user
//! - `admins` - every connection of an admin account

use crate::types::{Booking, Listing, ListingId, Message, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

/// Address of a notification channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    /// All connections of one user
    User(UserId),
    /// All connections of admin accounts
    Admins,
}

impl ChannelKey {
    /// Topic name used by transports.
    #[must_use]
    pub fn topic(&self) -> String {
        match self {
            Self::User(id) => format!("user:{id}"),
            Self::Admins => "admins".to_string(),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic())
    }
}

/// Name of a pushed event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A tenant requested one of the owner's listings
    NewBookingRequestOwner,
    /// The owner confirmed or rejected the tenant's booking
    BookingStatusUpdateTenant,
    /// A message was sent (to receiver, echoed to sender)
    NewMessageNotification,
    /// A conversation was marked read (to both parties)
    MessagesReadUpdate,
    /// A listing awaits moderation (to admins)
    NewListingPendingAdmin,
    /// A moderator decided on the owner's listing
    ListingStatusUpdateOwner,
}

impl NotificationEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewBookingRequestOwner => "new_booking_request_owner",
            Self::BookingStatusUpdateTenant => "booking_status_update_tenant",
            Self::NewMessageNotification => "new_message_notification",
            Self::MessagesReadUpdate => "messages_read_update",
            Self::NewListingPendingAdmin => "new_listing_pending_admin",
            Self::ListingStatusUpdateOwner => "listing_status_update_owner",
        }
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named event with its JSON payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Event name
    pub event: NotificationEvent,
    /// Event body
    pub payload: Value,
}

impl Notification {
    /// Build a notification from any serializable payload.
    ///
    /// Serialization of the domain types used here cannot fail; should it
    /// ever, the payload degrades to `null` rather than aborting the publish.
    pub fn new(event: NotificationEvent, payload: &impl Serialize) -> Self {
        Self {
            event,
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
        }
    }

    /// Owner-facing event for a new booking request.
    #[must_use]
    pub fn booking_requested(booking: &Booking, listing: &Listing) -> Self {
        Self {
            event: NotificationEvent::NewBookingRequestOwner,
            payload: json!({
                "booking": booking,
                "listing_id": listing.id,
                "listing_title": listing.title,
            }),
        }
    }

    /// Tenant-facing event for a decided booking.
    #[must_use]
    pub fn booking_decided(booking: &Booking) -> Self {
        Self::new(NotificationEvent::BookingStatusUpdateTenant, booking)
    }

    /// Event for a sent message.
    #[must_use]
    pub fn message_sent(message: &Message) -> Self {
        Self::new(NotificationEvent::NewMessageNotification, message)
    }

    /// Event for a conversation marked read by `reader`.
    #[must_use]
    pub fn messages_read(listing_id: ListingId, reader: UserId, other: UserId, count: u64) -> Self {
        Self {
            event: NotificationEvent::MessagesReadUpdate,
            payload: json!({
                "listing_id": listing_id,
                "reader_id": reader,
                "sender_id": other,
                "count": count,
            }),
        }
    }

    /// Admin-facing event for a listing awaiting moderation.
    #[must_use]
    pub fn listing_submitted(listing: &Listing) -> Self {
        Self::new(NotificationEvent::NewListingPendingAdmin, listing)
    }

    /// Owner-facing event for a moderated listing.
    #[must_use]
    pub fn listing_moderated(listing: &Listing) -> Self {
        Self {
            event: NotificationEvent::ListingStatusUpdateOwner,
            payload: json!({
                "listing_id": listing.id,
                "title": listing.title,
                "status": listing.status,
            }),
        }
    }
}

/// Single-capability publish interface.
///
/// Implementations must not block and must not fail loudly: the caller has
/// already committed its state change and never waits for delivery.
pub trait Notifier: Send + Sync {
    /// Deliver `notification` to every live connection on `channel`, if any.
    fn publish(&self, channel: &ChannelKey, notification: Notification);
}

/// Notifier that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn publish(&self, _channel: &ChannelKey, _notification: Notification) {}
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn publish(&self, channel: &ChannelKey, notification: Notification) {
        (**self).publish(channel, notification);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        let id = UserId::new();
        assert_eq!(ChannelKey::User(id).topic(), format!("user:{id}"));
        assert_eq!(ChannelKey::Admins.to_string(), "admins");
    }

    #[test]
    fn test_event_wire_names_match_serde() {
        for event in [
            NotificationEvent::NewBookingRequestOwner,
            NotificationEvent::BookingStatusUpdateTenant,
            NotificationEvent::NewMessageNotification,
            NotificationEvent::MessagesReadUpdate,
            NotificationEvent::NewListingPendingAdmin,
            NotificationEvent::ListingStatusUpdateOwner,
        ] {
            let json = serde_json::to_value(event).unwrap();
            assert_eq!(json, Value::String(event.as_str().to_string()));
        }
    }
}
