//! Database row shapes and their conversion into domain types.
//!
//! Enumerations are stored as `TEXT` and parsed back with their `FromStr`
//! impls; a value the domain does not know is reported as a storage error.

use chrono::{DateTime, NaiveDate, Utc};
use rental_market_core::error::{MarketError, Result};
use rental_market_core::types::{
    Booking, BookingId, Favorite, GeoPoint, Listing, ListingId, Message, MessageId, User, UserId,
};
use std::str::FromStr;
use uuid::Uuid;

fn parse_column<T: FromStr>(column: &'static str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| MarketError::Storage(format!("Unexpected {column} value '{value}'")))
}

/// `users` row.
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    /// Account id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Lower-cased email
    pub email: String,
    /// bcrypt hash
    pub password_hash: String,
    /// `user` or `admin`
    pub role: String,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = MarketError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            role: parse_column("role", &row.role)?,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

/// `listings` row.
#[derive(Debug, sqlx::FromRow)]
pub struct ListingRow {
    /// Listing id
    pub id: Uuid,
    /// Owner account
    pub owner_id: Uuid,
    /// Headline
    pub title: String,
    /// Description
    pub description: String,
    /// Minor currency units
    pub price: i64,
    /// `monthly-rental` or `daily-rental`
    pub listing_type: String,
    /// Moderation status
    pub status: String,
    /// Street address
    pub address: String,
    /// Latitude, set together with longitude
    pub latitude: Option<f64>,
    /// Longitude, set together with latitude
    pub longitude: Option<f64>,
    /// Photo filenames
    pub photos: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = MarketError;

    fn try_from(row: ListingRow) -> Result<Self> {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
            _ => None,
        };
        Ok(Self {
            id: ListingId::from_uuid(row.id),
            owner_id: UserId::from_uuid(row.owner_id),
            listing_type: parse_column("listing_type", &row.listing_type)?,
            status: parse_column("status", &row.status)?,
            title: row.title,
            description: row.description,
            price: row.price,
            address: row.address,
            location,
            photos: row.photos,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `bookings` row.
#[derive(Debug, sqlx::FromRow)]
pub struct BookingRow {
    /// Booking id
    pub id: Uuid,
    /// Booked listing
    pub listing_id: Uuid,
    /// Requesting tenant
    pub tenant_id: Uuid,
    /// First night
    pub start_date: NaiveDate,
    /// Departure day
    pub end_date: NaiveDate,
    /// `pending`, `confirmed` or `rejected`
    pub status: String,
    /// Tenant acknowledged the last change
    pub tenant_seen: bool,
    /// Request time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = MarketError;

    fn try_from(row: BookingRow) -> Result<Self> {
        Ok(Self {
            id: BookingId::from_uuid(row.id),
            listing_id: ListingId::from_uuid(row.listing_id),
            tenant_id: UserId::from_uuid(row.tenant_id),
            start_date: row.start_date,
            end_date: row.end_date,
            status: parse_column("status", &row.status)?,
            tenant_seen: row.tenant_seen,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `messages` row.
#[derive(Debug, sqlx::FromRow)]
pub struct MessageRow {
    /// Message id
    pub id: Uuid,
    /// Listing discussed
    pub listing_id: Uuid,
    /// Author
    pub sender_id: Uuid,
    /// Recipient
    pub receiver_id: Uuid,
    /// Body
    pub content: String,
    /// Read flag
    pub is_read: bool,
    /// Send time
    pub created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: MessageId::from_uuid(row.id),
            listing_id: ListingId::from_uuid(row.listing_id),
            sender_id: UserId::from_uuid(row.sender_id),
            receiver_id: UserId::from_uuid(row.receiver_id),
            content: row.content,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// `favorites` row.
#[derive(Debug, sqlx::FromRow)]
pub struct FavoriteRow {
    /// Bookmark owner
    pub user_id: Uuid,
    /// Bookmarked listing
    pub listing_id: Uuid,
    /// When it was added
    pub created_at: DateTime<Utc>,
}

impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            listing_id: ListingId::from_uuid(row.listing_id),
            created_at: row.created_at,
        }
    }
}

/// Convert every row, failing on the first bad one.
///
/// # Errors
///
/// Returns the first conversion error.
pub fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = MarketError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rental_market_core::types::{BookingStatus, ListingStatus, ListingType};

    fn listing_row() -> ListingRow {
        ListingRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Loft".into(),
            description: String::new(),
            price: 9_000,
            listing_type: "daily-rental".into(),
            status: "active".into(),
            address: "1 Main St".into(),
            latitude: Some(48.85),
            longitude: Some(2.35),
            photos: vec!["a.jpg".into()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_listing_row_converts() {
        let listing = Listing::try_from(listing_row()).unwrap();
        assert_eq!(listing.listing_type, ListingType::DailyRental);
        assert_eq!(listing.status, ListingStatus::Active);
        assert!(listing.location.is_some());
    }

    #[test]
    fn test_unknown_status_is_storage_error() {
        let row = ListingRow {
            status: "deleted".into(),
            ..listing_row()
        };
        assert!(matches!(Listing::try_from(row), Err(MarketError::Storage(_))));
    }

    #[test]
    fn test_booking_row_converts() {
        let row = BookingRow {
            id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            status: "confirmed".into(),
            tenant_seen: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let booking = Booking::try_from(row).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.range().nights(), 4);
    }
}
