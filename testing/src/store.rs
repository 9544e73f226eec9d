//! In-memory implementation of every repository trait.
//!
//! All tables live behind one mutex, so `reserve` and `decide` are atomic
//! exactly like their transactional PostgreSQL counterparts.

use chrono::{DateTime, Utc};
use rental_market_core::error::{MarketError, Result};
use rental_market_core::providers::{
    AnalyticsRepository, BookingRepository, DecideOutcome, DeleteOutcome, FavoriteRepository,
    ListingRepository, MessageRepository, ReserveOutcome, StoreFuture, UserRepository,
};
use rental_market_core::types::{
    Booking, BookingId, BookingStatus, Favorite, Listing, ListingId, ListingQuery, ListingStatus,
    Message, Page, User, UserId,
};
use std::collections::HashMap;
use std::future::ready;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    listings: Vec<Listing>,
    bookings: Vec<Booking>,
    messages: Vec<Message>,
    favorites: Vec<Favorite>,
    views: HashMap<ListingId, (u64, DateTime<Utc>)>,
}

impl Tables {
    fn owner_of(&self, listing_id: ListingId) -> Option<UserId> {
        self.listings
            .iter()
            .find(|l| l.id == listing_id)
            .map(|l| l.owner_id)
    }

    fn overlapping(&self, booking: &Booking, statuses: &[BookingStatus]) -> Vec<BookingId> {
        let range = booking.range();
        self.bookings
            .iter()
            .filter(|b| {
                b.listing_id == booking.listing_id
                    && b.id != booking.id
                    && statuses.contains(&b.status)
                    && b.range().overlaps(&range)
            })
            .map(|b| b.id)
            .collect()
    }
}

/// Shared in-memory store.
///
/// Cloning yields another handle to the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `MarketError::Storage`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every booking currently stored.
    ///
    /// # Errors
    ///
    /// Returns error if the store lock is poisoned.
    pub fn all_bookings(&self) -> Result<Vec<Booking>> {
        self.with(|t| Ok(t.bookings.clone()))
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MarketError::Storage("in-memory store set to fail".to_string()));
        }
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| MarketError::Storage("store lock poisoned".to_string()))?;
        f(&mut tables)
    }

    fn run<T: Send + 'static>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T>,
    ) -> StoreFuture<'_, T> {
        Box::pin(ready(self.with(f)))
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    items.reverse();
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl UserRepository for InMemoryStore {
    fn create_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, User> {
        let user = user.clone();
        self.run(move |t| {
            if t.users.iter().any(|u| u.email == user.email) {
                return Err(MarketError::Conflict("Email already registered".to_string()));
            }
            t.users.push(user.clone());
            Ok(user)
        })
    }

    fn get_user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        self.run(move |t| Ok(t.users.iter().find(|u| u.id == user_id).cloned()))
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>> {
        self.run(move |t| Ok(t.users.iter().find(|u| u.email == email).cloned()))
    }
}

impl ListingRepository for InMemoryStore {
    fn insert_listing<'a>(&'a self, listing: &'a Listing) -> StoreFuture<'a, Listing> {
        let listing = listing.clone();
        self.run(move |t| {
            t.listings.push(listing.clone());
            Ok(listing)
        })
    }

    fn get_listing(&self, listing_id: ListingId) -> StoreFuture<'_, Option<Listing>> {
        self.run(move |t| Ok(t.listings.iter().find(|l| l.id == listing_id).cloned()))
    }

    fn update_listing<'a>(&'a self, listing: &'a Listing) -> StoreFuture<'a, Listing> {
        let listing = listing.clone();
        self.run(move |t| {
            let slot = t
                .listings
                .iter_mut()
                .find(|l| l.id == listing.id)
                .ok_or_else(|| MarketError::not_found("Listing", listing.id))?;
            *slot = listing.clone();
            Ok(listing)
        })
    }

    fn delete_listing(&self, listing_id: ListingId) -> StoreFuture<'_, DeleteOutcome> {
        self.run(move |t| {
            if !t.listings.iter().any(|l| l.id == listing_id) {
                return Ok(DeleteOutcome::Missing);
            }
            let confirmed: Vec<BookingId> = t
                .bookings
                .iter()
                .filter(|b| b.listing_id == listing_id && b.status == BookingStatus::Confirmed)
                .map(|b| b.id)
                .collect();
            if !confirmed.is_empty() {
                return Ok(DeleteOutcome::Booked(confirmed));
            }
            t.listings.retain(|l| l.id != listing_id);
            t.bookings.retain(|b| b.listing_id != listing_id);
            t.messages.retain(|m| m.listing_id != listing_id);
            t.favorites.retain(|f| f.listing_id != listing_id);
            t.views.remove(&listing_id);
            Ok(DeleteOutcome::Deleted)
        })
    }

    fn search_active<'a>(&'a self, query: &'a ListingQuery) -> StoreFuture<'a, Page<Listing>> {
        self.run(move |t| {
            let mut matching: Vec<Listing> = t
                .listings
                .iter()
                .filter(|l| query.matches(l))
                .cloned()
                .collect();
            newest_first(&mut matching, |l| l.created_at);

            let total = to_u64(matching.len());
            let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
            let items = matching
                .into_iter()
                .skip(offset)
                .take(query.per_page as usize)
                .collect();
            Ok(Page {
                items,
                page: query.page,
                per_page: query.per_page,
                total,
            })
        })
    }

    fn list_by_owner(&self, owner_id: UserId) -> StoreFuture<'_, Vec<Listing>> {
        self.run(move |t| {
            let mut listings: Vec<Listing> = t
                .listings
                .iter()
                .filter(|l| l.owner_id == owner_id)
                .cloned()
                .collect();
            newest_first(&mut listings, |l| l.created_at);
            Ok(listings)
        })
    }

    fn list_by_status(&self, status: ListingStatus) -> StoreFuture<'_, Vec<Listing>> {
        self.run(move |t| {
            let mut listings: Vec<Listing> = t
                .listings
                .iter()
                .filter(|l| l.status == status)
                .cloned()
                .collect();
            listings.sort_by_key(|l| l.created_at);
            Ok(listings)
        })
    }

    fn count_by_status(&self, status: ListingStatus) -> StoreFuture<'_, u64> {
        self.run(move |t| Ok(to_u64(t.listings.iter().filter(|l| l.status == status).count())))
    }
}

impl BookingRepository for InMemoryStore {
    fn reserve<'a>(
        &'a self,
        booking: &'a Booking,
        blocking: &'a [BookingStatus],
    ) -> StoreFuture<'a, ReserveOutcome> {
        let booking = booking.clone();
        let blocking = blocking.to_vec();
        self.run(move |t| {
            let conflicts = t.overlapping(&booking, &blocking);
            if !conflicts.is_empty() {
                return Ok(ReserveOutcome::Conflict(conflicts));
            }
            t.bookings.push(booking.clone());
            Ok(ReserveOutcome::Reserved(booking))
        })
    }

    fn decide(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, DecideOutcome> {
        self.run(move |t| {
            let Some(current) = t.bookings.iter().find(|b| b.id == booking_id).cloned() else {
                return Ok(DecideOutcome::Missing);
            };
            if current.status != BookingStatus::Pending {
                return Ok(DecideOutcome::AlreadyDecided(current.status));
            }
            if status == BookingStatus::Confirmed {
                let conflicts = t.overlapping(&current, &[BookingStatus::Confirmed]);
                if !conflicts.is_empty() {
                    return Ok(DecideOutcome::Conflict(conflicts));
                }
            }

            let Some(slot) = t.bookings.iter_mut().find(|b| b.id == booking_id) else {
                return Ok(DecideOutcome::Missing);
            };
            slot.status = status;
            slot.tenant_seen = false;
            slot.updated_at = at;
            Ok(DecideOutcome::Decided(slot.clone()))
        })
    }

    fn get_booking(&self, booking_id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        self.run(move |t| Ok(t.bookings.iter().find(|b| b.id == booking_id).cloned()))
    }

    fn list_for_owner(&self, owner_id: UserId) -> StoreFuture<'_, Vec<Booking>> {
        self.run(move |t| {
            let mut bookings: Vec<Booking> = t
                .bookings
                .iter()
                .filter(|b| t.owner_of(b.listing_id) == Some(owner_id))
                .cloned()
                .collect();
            newest_first(&mut bookings, |b| b.created_at);
            bookings.sort_by_key(|b| b.status != BookingStatus::Pending);
            Ok(bookings)
        })
    }

    fn list_for_tenant(&self, tenant_id: UserId) -> StoreFuture<'_, Vec<Booking>> {
        self.run(move |t| {
            let mut bookings: Vec<Booking> = t
                .bookings
                .iter()
                .filter(|b| b.tenant_id == tenant_id)
                .cloned()
                .collect();
            newest_first(&mut bookings, |b| b.created_at);
            Ok(bookings)
        })
    }

    fn list_for_listing<'a>(
        &'a self,
        listing_id: ListingId,
        statuses: &'a [BookingStatus],
    ) -> StoreFuture<'a, Vec<Booking>> {
        self.run(move |t| {
            let mut bookings: Vec<Booking> = t
                .bookings
                .iter()
                .filter(|b| b.listing_id == listing_id && statuses.contains(&b.status))
                .cloned()
                .collect();
            bookings.sort_by_key(|b| b.start_date);
            Ok(bookings)
        })
    }

    fn count_pending_for_owner(&self, owner_id: UserId) -> StoreFuture<'_, u64> {
        self.run(move |t| {
            Ok(to_u64(
                t.bookings
                    .iter()
                    .filter(|b| {
                        b.status == BookingStatus::Pending
                            && t.owner_of(b.listing_id) == Some(owner_id)
                    })
                    .count(),
            ))
        })
    }

    fn count_unseen_for_tenant(&self, tenant_id: UserId) -> StoreFuture<'_, u64> {
        self.run(move |t| {
            Ok(to_u64(
                t.bookings
                    .iter()
                    .filter(|b| b.tenant_id == tenant_id && b.status.is_terminal() && !b.tenant_seen)
                    .count(),
            ))
        })
    }

    fn mark_seen_for_tenant(&self, tenant_id: UserId) -> StoreFuture<'_, u64> {
        self.run(move |t| {
            let mut touched = 0;
            for booking in t
                .bookings
                .iter_mut()
                .filter(|b| b.tenant_id == tenant_id && !b.tenant_seen)
            {
                booking.tenant_seen = true;
                touched += 1;
            }
            Ok(touched)
        })
    }
}

impl MessageRepository for InMemoryStore {
    fn insert_message<'a>(&'a self, message: &'a Message) -> StoreFuture<'a, Message> {
        let message = message.clone();
        self.run(move |t| {
            t.messages.push(message.clone());
            Ok(message)
        })
    }

    fn list_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Message>> {
        self.run(move |t| {
            let mut messages: Vec<Message> = t
                .messages
                .iter()
                .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
                .cloned()
                .collect();
            newest_first(&mut messages, |m| m.created_at);
            Ok(messages)
        })
    }

    fn thread(&self, listing_id: ListingId, a: UserId, b: UserId) -> StoreFuture<'_, Vec<Message>> {
        self.run(move |t| {
            let mut messages: Vec<Message> = t
                .messages
                .iter()
                .filter(|m| {
                    m.listing_id == listing_id
                        && ((m.sender_id == a && m.receiver_id == b)
                            || (m.sender_id == b && m.receiver_id == a))
                })
                .cloned()
                .collect();
            messages.sort_by_key(|m| m.created_at);
            Ok(messages)
        })
    }

    fn mark_read(
        &self,
        listing_id: ListingId,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> StoreFuture<'_, u64> {
        self.run(move |t| {
            let mut touched = 0;
            for message in t.messages.iter_mut().filter(|m| {
                m.listing_id == listing_id
                    && m.sender_id == sender_id
                    && m.receiver_id == receiver_id
                    && !m.is_read
            }) {
                message.is_read = true;
                touched += 1;
            }
            Ok(touched)
        })
    }

    fn count_unread(&self, user_id: UserId) -> StoreFuture<'_, u64> {
        self.run(move |t| {
            Ok(to_u64(
                t.messages
                    .iter()
                    .filter(|m| m.receiver_id == user_id && !m.is_read)
                    .count(),
            ))
        })
    }
}

impl FavoriteRepository for InMemoryStore {
    fn add_favorite<'a>(&'a self, favorite: &'a Favorite) -> StoreFuture<'a, Favorite> {
        let favorite = favorite.clone();
        self.run(move |t| {
            if t
                .favorites
                .iter()
                .any(|f| f.user_id == favorite.user_id && f.listing_id == favorite.listing_id)
            {
                return Err(MarketError::Conflict("Listing already in favorites".to_string()));
            }
            t.favorites.push(favorite.clone());
            Ok(favorite)
        })
    }

    fn remove_favorite(&self, user_id: UserId, listing_id: ListingId) -> StoreFuture<'_, bool> {
        self.run(move |t| {
            let before = t.favorites.len();
            t.favorites
                .retain(|f| !(f.user_id == user_id && f.listing_id == listing_id));
            Ok(t.favorites.len() < before)
        })
    }

    fn favorite_listings(&self, user_id: UserId) -> StoreFuture<'_, Vec<Listing>> {
        self.run(move |t| {
            let mut favorites: Vec<&Favorite> =
                t.favorites.iter().filter(|f| f.user_id == user_id).collect();
            favorites.reverse();
            favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(favorites
                .into_iter()
                .filter_map(|f| t.listings.iter().find(|l| l.id == f.listing_id))
                .filter(|l| l.is_active())
                .cloned()
                .collect())
        })
    }
}

impl AnalyticsRepository for InMemoryStore {
    fn record_view(&self, listing_id: ListingId, at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        self.run(move |t| {
            let entry = t.views.entry(listing_id).or_insert((0, at));
            entry.0 += 1;
            entry.1 = at;
            Ok(())
        })
    }

    fn views_for<'a>(
        &'a self,
        listing_ids: &'a [ListingId],
    ) -> StoreFuture<'a, HashMap<ListingId, u64>> {
        self.run(move |t| {
            Ok(listing_ids
                .iter()
                .filter_map(|id| t.views.get(id).map(|(views, _)| (*id, *views)))
                .collect())
        })
    }
}
