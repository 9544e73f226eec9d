//! Booking availability engine.
//!
//! Decides whether a requested stay can be created and whether a pending
//! request can be promoted to `confirmed`, without ever letting two confirmed
//! bookings of one listing overlap.
//!
//! # Overlap
//!
//! Ranges are half-open `[start, end)` calendar dates. A stay ending on day N
//! and another starting on day N do not conflict.
//!
//! # Atomicity
//!
//! The check-then-write sequences run inside the store
//! ([`BookingRepository::reserve`] and [`BookingRepository::decide`]), which
//! serializes them per listing. Two concurrent requests for overlapping dates
//! therefore cannot both pass the check.
//!
//! # Lifecycle
//!
//! ```text
//! pending ──owner──> confirmed   (terminal)
//!    └─────owner──> rejected    (terminal)
//! ```
//!
//! [`BookingRepository::reserve`]: crate::providers::BookingRepository::reserve
//! [`BookingRepository::decide`]: crate::providers::BookingRepository::decide

use crate::environment::MarketEnvironment;
use crate::error::{MarketError, Result};
use crate::notify::{ChannelKey, Notification};
use crate::providers::{DecideOutcome, ReserveOutcome};
use crate::types::{Booking, BookingId, BookingStatus, DateRange, Listing, ListingId, UserId};
use chrono::NaiveDate;
use serde::Serialize;
use std::str::FromStr;
use tracing::{info, instrument, warn};

/// Which existing bookings block a new request.
///
/// Confirmation is always guarded by other confirmed bookings; this policy
/// only governs the request step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BookingPolicy {
    /// Refuse a request overlapping any pending or confirmed booking.
    #[default]
    RejectOverlaps,
    /// Accept every request; overlaps are settled when the owner confirms,
    /// first confirmation wins.
    ResolveOnConfirm,
}

impl BookingPolicy {
    /// Statuses of existing bookings that make a request conflict.
    #[must_use]
    pub const fn request_blocking(self) -> &'static [BookingStatus] {
        match self {
            Self::RejectOverlaps => &[BookingStatus::Pending, BookingStatus::Confirmed],
            Self::ResolveOnConfirm => &[],
        }
    }
}

impl FromStr for BookingPolicy {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reject-overlaps" => Ok(Self::RejectOverlaps),
            "resolve-on-confirm" => Ok(Self::ResolveOnConfirm),
            other => Err(MarketError::validation(
                "booking_policy",
                format!("unknown booking policy '{other}'"),
            )),
        }
    }
}

/// A tenant's request for a stay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingRequest {
    /// Listing to book
    pub listing_id: ListingId,
    /// Requesting tenant
    pub tenant_id: UserId,
    /// First night
    pub start_date: NaiveDate,
    /// Departure day
    pub end_date: NaiveDate,
}

/// Owner decision on a pending booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Accept the stay
    Confirm,
    /// Refuse the stay
    Reject,
}

impl Decision {
    /// Status the booking moves to.
    #[must_use]
    pub const fn target(self) -> BookingStatus {
        match self {
            Self::Confirm => BookingStatus::Confirmed,
            Self::Reject => BookingStatus::Rejected,
        }
    }
}

impl FromStr for Decision {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "confirmed" => Ok(Self::Confirm),
            "rejected" => Ok(Self::Reject),
            _ => Err(MarketError::validation(
                "status",
                "status must be 'confirmed' or 'rejected'",
            )),
        }
    }
}

/// A booking together with its listing, as seen by an owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OwnerBooking {
    /// The booking
    #[serde(flatten)]
    pub booking: Booking,
    /// Title of the booked listing
    pub listing_title: String,
}

/// The booking availability engine.
#[derive(Clone, Debug)]
pub struct BookingEngine {
    env: MarketEnvironment,
    policy: BookingPolicy,
}

impl BookingEngine {
    /// Engine over `env` with the given request policy.
    #[must_use]
    pub const fn new(env: MarketEnvironment, policy: BookingPolicy) -> Self {
        Self { env, policy }
    }

    /// Request policy in force.
    #[must_use]
    pub const fn policy(&self) -> BookingPolicy {
        self.policy
    }

    /// Create a `pending` booking and notify the listing owner.
    ///
    /// Checks run in this order, the first failure wins:
    /// 1. listing exists and is `active`, else `NotFound`
    /// 2. tenant is not the owner, else `Forbidden`
    /// 3. `start_date < end_date`, else `Validation`
    /// 4. no blocking booking overlaps, else `Conflict` (nothing written)
    ///
    /// # Errors
    ///
    /// See above; storage failures surface as `MarketError::Storage`.
    #[instrument(skip(self, request), fields(listing_id = %request.listing_id, tenant_id = %request.tenant_id))]
    pub async fn request_booking(&self, request: BookingRequest) -> Result<Booking> {
        let listing = self.active_listing(request.listing_id).await?;

        if listing.owner_id == request.tenant_id {
            return Err(MarketError::Forbidden(
                "You cannot book your own listing".to_string(),
            ));
        }

        let range = DateRange::new(request.start_date, request.end_date)?;
        let booking = Booking::pending(listing.id, request.tenant_id, range, self.env.clock.now());

        match self
            .env
            .bookings
            .reserve(&booking, self.policy.request_blocking())
            .await?
        {
            ReserveOutcome::Reserved(booking) => {
                info!(booking_id = %booking.id, %range, "Booking requested");
                self.env.notifier.publish(
                    &ChannelKey::User(listing.owner_id),
                    Notification::booking_requested(&booking, &listing),
                );
                Ok(booking)
            }
            ReserveOutcome::Conflict(conflicting) => {
                warn!(%range, conflicts = conflicting.len(), "Booking request overlaps existing bookings");
                Err(MarketError::Conflict(format!(
                    "Listing is already booked for dates overlapping {range}"
                )))
            }
        }
    }

    /// Confirm or reject a `pending` booking and notify the tenant.
    ///
    /// Confirmation is refused while another confirmed booking of the same
    /// listing overlaps; the booking then stays `pending`. Rejection always
    /// succeeds. Either way the tenant's seen flag is cleared.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the booking does not exist
    /// - `Forbidden` when `decider_id` does not own the listing
    /// - `AlreadyDecided` when the booking left `pending`, whatever `decision` is
    /// - `Conflict` when confirming would double-book
    #[instrument(skip(self), fields(booking_id = %booking_id, decider_id = %decider_id))]
    pub async fn decide_booking(
        &self,
        booking_id: BookingId,
        decider_id: UserId,
        decision: Decision,
    ) -> Result<Booking> {
        let booking = self
            .env
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Booking", booking_id))?;
        let listing = self
            .env
            .listings
            .get_listing(booking.listing_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Booking", booking_id))?;

        if listing.owner_id != decider_id {
            return Err(MarketError::Forbidden(
                "Only the listing owner can decide on this booking".to_string(),
            ));
        }

        let status = decision.target();
        match self
            .env
            .bookings
            .decide(booking_id, status, self.env.clock.now())
            .await?
        {
            DecideOutcome::Decided(booking) => {
                info!(status = %booking.status, "Booking decided");
                self.env.notifier.publish(
                    &ChannelKey::User(booking.tenant_id),
                    Notification::booking_decided(&booking),
                );
                Ok(booking)
            }
            DecideOutcome::Conflict(conflicting) => {
                warn!(conflicts = conflicting.len(), "Confirmation overlaps a confirmed booking");
                Err(MarketError::Conflict(format!(
                    "Dates {} overlap an already confirmed booking",
                    booking.range()
                )))
            }
            DecideOutcome::AlreadyDecided(status) => {
                Err(MarketError::AlreadyDecided { booking_id, status })
            }
            DecideOutcome::Missing => Err(MarketError::not_found("Booking", booking_id)),
        }
    }

    /// Bookings across all of the owner's listings, pending first then newest.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    #[instrument(skip(self))]
    pub async fn owner_bookings(&self, owner_id: UserId) -> Result<Vec<OwnerBooking>> {
        let listings = self.env.listings.list_by_owner(owner_id).await?;
        let bookings = self.env.bookings.list_for_owner(owner_id).await?;

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let listing_title = listings
                    .iter()
                    .find(|l| l.id == booking.listing_id)
                    .map(|l| l.title.clone())
                    .unwrap_or_default();
                OwnerBooking {
                    booking,
                    listing_title,
                }
            })
            .collect())
    }

    /// The tenant's own bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn tenant_bookings(&self, tenant_id: UserId) -> Result<Vec<Booking>> {
        self.env.bookings.list_for_tenant(tenant_id).await
    }

    /// A single booking, visible to its tenant and the listing owner.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the booking does not exist
    /// - `Forbidden` for anyone else
    pub async fn get_booking(&self, booking_id: BookingId, actor_id: UserId) -> Result<Booking> {
        let booking = self
            .env
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Booking", booking_id))?;

        if booking.tenant_id == actor_id {
            return Ok(booking);
        }

        let owns_listing = self
            .env
            .listings
            .get_listing(booking.listing_id)
            .await?
            .is_some_and(|l| l.owner_id == actor_id);
        if owns_listing {
            Ok(booking)
        } else {
            Err(MarketError::Forbidden(
                "You are not a party to this booking".to_string(),
            ))
        }
    }

    /// Acknowledge all status changes of the tenant's bookings.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn mark_status_updates_seen(&self, tenant_id: UserId) -> Result<u64> {
        self.env.bookings.mark_seen_for_tenant(tenant_id).await
    }

    /// Confirmed date ranges of an active listing, by start date.
    ///
    /// # Errors
    ///
    /// `NotFound` when the listing is missing or not active.
    pub async fn listing_availability(&self, listing_id: ListingId) -> Result<Vec<DateRange>> {
        let listing = self.active_listing(listing_id).await?;
        let confirmed = self
            .env
            .bookings
            .list_for_listing(listing.id, &[BookingStatus::Confirmed])
            .await?;
        Ok(confirmed.iter().map(Booking::range).collect())
    }

    async fn active_listing(&self, listing_id: ListingId) -> Result<Listing> {
        self.env
            .listings
            .get_listing(listing_id)
            .await?
            .filter(Listing::is_active)
            .ok_or_else(|| MarketError::not_found("Listing", listing_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_parsing() {
        assert_eq!("confirmed".parse::<Decision>().unwrap(), Decision::Confirm);
        assert_eq!("rejected".parse::<Decision>().unwrap().target(), BookingStatus::Rejected);
        assert!(matches!(
            "pending".parse::<Decision>(),
            Err(MarketError::Validation(_))
        ));
    }

    #[test]
    fn test_policy_blocking_sets() {
        assert_eq!(
            BookingPolicy::default().request_blocking(),
            &[BookingStatus::Pending, BookingStatus::Confirmed]
        );
        assert!(BookingPolicy::ResolveOnConfirm.request_blocking().is_empty());
        assert_eq!(
            "resolve-on-confirm".parse::<BookingPolicy>().unwrap(),
            BookingPolicy::ResolveOnConfirm
        );
        assert!("first-come".parse::<BookingPolicy>().is_err());
    }
}
