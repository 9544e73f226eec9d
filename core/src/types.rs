//! Domain types for the rental marketplace.
//!
//! Identifiers, entities and value objects shared by every service. All of
//! them are plain owned data: the relational store is the source of truth and
//! nothing here is cached across requests.

use crate::error::{MarketError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user account
    UserId
);
define_id!(
    /// Unique identifier for a listing
    ListingId
);
define_id!(
    /// Unique identifier for a booking
    BookingId
);
define_id!(
    /// Unique identifier for a message
    MessageId
);

// ============================================================================
// Enumerations
// ============================================================================

/// Role of a user account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account (owner and/or tenant)
    User,
    /// Moderator with access to the admin channel and moderation endpoints
    Admin,
}

impl Role {
    /// Database/wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(MarketError::validation("role", format!("unknown role '{other}'"))),
        }
    }
}

/// Rental type of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingType {
    /// Rented by the month
    MonthlyRental,
    /// Rented by the night
    DailyRental,
}

impl ListingType {
    /// Database/wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MonthlyRental => "monthly-rental",
            Self::DailyRental => "daily-rental",
        }
    }
}

impl FromStr for ListingType {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "monthly-rental" => Ok(Self::MonthlyRental),
            "daily-rental" => Ok(Self::DailyRental),
            other => Err(MarketError::validation(
                "type",
                format!("unknown listing type '{other}'"),
            )),
        }
    }
}

/// Moderation/visibility status of a listing.
///
/// ```text
/// pending ──admin──> active ──owner──> archived
///    │                  ^                 │
///    └──admin──> rejected    └──owner─────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Awaiting moderation
    Pending,
    /// Publicly visible and bookable
    Active,
    /// Refused by a moderator
    Rejected,
    /// Hidden by its owner
    Archived,
}

impl ListingStatus {
    /// Database/wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for ListingStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "rejected" => Ok(Self::Rejected),
            "archived" => Ok(Self::Archived),
            other => Err(MarketError::validation(
                "status",
                format!("unknown listing status '{other}'"),
            )),
        }
    }
}

/// Status of a booking.
///
/// `pending → confirmed` and `pending → rejected`; both targets are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Requested by a tenant, awaiting the owner's decision
    Pending,
    /// Accepted by the owner
    Confirmed,
    /// Refused by the owner
    Rejected,
}

impl BookingStatus {
    /// Database/wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected)
    }
}

impl FromStr for BookingStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            other => Err(MarketError::validation(
                "status",
                format!("unknown booking status '{other}'"),
            )),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Date ranges
// ============================================================================

/// Half-open calendar date range `[start, end)`.
///
/// A stay ending on day N and another starting on day N do not overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First occupied day
    pub start: NaiveDate,
    /// Day of departure (not occupied)
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, requiring `start < end`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] when `end` is not after `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(MarketError::validation(
                "end_date",
                "end_date must be after start_date",
            ));
        }
        Ok(Self { start, end })
    }

    /// Half-open overlap test.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Number of occupied days.
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A registered account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account id
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Lower-cased unique email
    pub email: String,
    /// bcrypt hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Account role
    pub role: Role,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the account may moderate listings.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The authenticated caller of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Actor {
    /// Caller's account
    pub id: UserId,
    /// Caller's role
    pub role: Role,
}

impl Actor {
    /// Regular user.
    #[must_use]
    pub const fn user(id: UserId) -> Self {
        Self { id, role: Role::User }
    }

    /// Whether the caller may moderate.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

/// Geographic coordinates of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, `-90..=90`
    pub latitude: f64,
    /// Longitude in degrees, `-180..=180`
    pub longitude: f64,
}

/// A rentable property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Listing id
    pub id: ListingId,
    /// User who created the listing
    pub owner_id: UserId,
    /// Headline
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Price in minor currency units (per month or per night depending on type)
    pub price: i64,
    /// Rental type
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    /// Moderation status
    pub status: ListingStatus,
    /// Street address
    pub address: String,
    /// Optional coordinates
    pub location: Option<GeoPoint>,
    /// Photo filenames, in display order
    pub photos: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Only active listings are bookable or publicly visible.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

/// A tenant's request to occupy a listing for a date range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking id
    pub id: BookingId,
    /// Booked listing
    pub listing_id: ListingId,
    /// Requesting tenant
    pub tenant_id: UserId,
    /// First night
    pub start_date: NaiveDate,
    /// Departure day (exclusive)
    pub end_date: NaiveDate,
    /// Current status
    pub status: BookingStatus,
    /// Whether the tenant has seen the latest status change
    pub tenant_seen: bool,
    /// Request time
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A fresh `pending` booking.
    #[must_use]
    pub fn pending(
        listing_id: ListingId,
        tenant_id: UserId,
        range: DateRange,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BookingId::new(),
            listing_id,
            tenant_id,
            start_date: range.start,
            end_date: range.end,
            status: BookingStatus::Pending,
            tenant_seen: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The occupied range.
    #[must_use]
    pub const fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

/// A message exchanged about a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message id
    pub id: MessageId,
    /// Listing the conversation is about
    pub listing_id: ListingId,
    /// Author
    pub sender_id: UserId,
    /// Recipient
    pub receiver_id: UserId,
    /// Text body
    pub content: String,
    /// Whether the recipient has read it
    pub is_read: bool,
    /// Send time
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The other participant from `user`'s point of view.
    #[must_use]
    pub fn counterparty(&self, user: UserId) -> UserId {
        if self.sender_id == user {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

/// Derived conversation: one per `(listing, counterparty)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Conversation {
    /// Listing discussed
    pub listing_id: ListingId,
    /// Other participant
    pub counterparty_id: UserId,
    /// Most recent message in either direction
    pub last_message: Message,
    /// Messages from the counterparty not yet read
    pub unread_count: u64,
}

/// A user's bookmarked listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    /// Owner of the bookmark
    pub user_id: UserId,
    /// Bookmarked listing
    pub listing_id: ListingId,
    /// When it was added
    pub created_at: DateTime<Utc>,
}

/// Per listing figures shown to an owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListingStats {
    /// Listing id
    pub listing_id: ListingId,
    /// Listing title
    pub title: String,
    /// Listing status
    pub status: ListingStatus,
    /// Detail page views
    pub views: u64,
    /// Bookings awaiting a decision
    pub pending_bookings: u64,
    /// Confirmed bookings
    pub confirmed_bookings: u64,
}

/// Aggregate counters, recomputed on every request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Messages addressed to the caller and not read
    pub unread_messages: u64,
    /// Pending bookings on listings the caller owns
    pub pending_bookings: u64,
    /// Decided bookings of the caller not yet acknowledged
    pub unseen_booking_updates: u64,
    /// Listings awaiting moderation (admins only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_listings: Option<u64>,
}

// ============================================================================
// Queries
// ============================================================================

/// Filter for the public listing search.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ListingQuery {
    /// Restrict to a rental type
    pub listing_type: Option<ListingType>,
    /// Minimum price (inclusive)
    pub min_price: Option<i64>,
    /// Maximum price (inclusive)
    pub max_price: Option<i64>,
    /// Case-insensitive substring of title or address
    pub text: Option<String>,
    /// 1-based page
    pub page: u32,
    /// Page size
    pub per_page: u32,
}

impl ListingQuery {
    /// Largest accepted page size
    pub const MAX_PER_PAGE: u32 = 100;

    /// Default page size
    pub const DEFAULT_PER_PAGE: u32 = 20;

    /// Clamp paging parameters into their valid ranges.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.per_page = match self.per_page {
            0 => Self::DEFAULT_PER_PAGE,
            n => n.min(Self::MAX_PER_PAGE),
        };
        self.text = self
            .text
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        self
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Whether an active listing matches the filter (paging ignored).
    #[must_use]
    pub fn matches(&self, listing: &Listing) -> bool {
        listing.is_active()
            && self.listing_type.is_none_or(|t| listing.listing_type == t)
            && self.min_price.is_none_or(|min| listing.price >= min)
            && self.max_price.is_none_or(|max| listing.price <= max)
            && self.text.as_deref().is_none_or(|text| {
                listing.title.to_lowercase().contains(text)
                    || listing.address.to_lowercase().contains(text)
            })
    }
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub per_page: u32,
    /// Total matching items
    pub total: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(a: &str, b: &str) -> DateRange {
        DateRange::new(date(a), date(b)).unwrap()
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        let existing = range("2024-01-01", "2024-01-05");
        assert!(!existing.overlaps(&range("2024-01-05", "2024-01-10")));
        assert!(!range("2024-01-05", "2024-01-10").overlaps(&existing));
    }

    #[test]
    fn test_intersecting_ranges_overlap() {
        let existing = range("2024-01-01", "2024-01-05");
        assert!(existing.overlaps(&range("2024-01-04", "2024-01-06")));
        assert!(existing.overlaps(&range("2023-12-01", "2024-02-01")));
        assert!(existing.overlaps(&existing));
    }

    #[test]
    fn test_empty_and_inverted_ranges_rejected() {
        assert!(DateRange::new(date("2024-01-05"), date("2024-01-05")).is_err());
        assert!(DateRange::new(date("2024-01-06"), date("2024-01-05")).is_err());
    }

    #[test]
    fn test_nights() {
        assert_eq!(range("2024-02-27", "2024-03-02").nights(), 4);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ListingType::MonthlyRental).unwrap(),
            "\"monthly-rental\""
        );
        assert_eq!("daily-rental".parse::<ListingType>().unwrap(), ListingType::DailyRental);
        assert_eq!("confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert!("cancelled".parse::<BookingStatus>().is_err());
        assert!(BookingStatus::Rejected.is_terminal());
        assert!(!BookingStatus::Pending.is_terminal());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: UserId::new(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "$2b$secret".to_string(),
            role: Role::User,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_query_normalization() {
        let query = ListingQuery {
            text: Some("  Harbour ".to_string()),
            per_page: 500,
            ..ListingQuery::default()
        }
        .normalized();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, ListingQuery::MAX_PER_PAGE);
        assert_eq!(query.text.as_deref(), Some("harbour"));
        assert_eq!(query.offset(), 0);
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric_and_matches_day_sets(
            a in 0i64..60, la in 1i64..15, b in 0i64..60, lb in 1i64..15,
        ) {
            let base = date("2024-01-01");
            let r1 = DateRange::new(base + chrono::Days::new(a as u64), base + chrono::Days::new((a + la) as u64)).unwrap();
            let r2 = DateRange::new(base + chrono::Days::new(b as u64), base + chrono::Days::new((b + lb) as u64)).unwrap();

            let shared_day = (a..a + la).any(|d| (b..b + lb).contains(&d));
            prop_assert_eq!(r1.overlaps(&r2), shared_day);
            prop_assert_eq!(r1.overlaps(&r2), r2.overlaps(&r1));
        }
    }
}
