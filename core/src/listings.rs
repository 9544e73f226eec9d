//! Listing lifecycle: submission, editing, moderation, archiving and search.
//!
//! ```text
//! pending ──admin──> active <──owner──> archived
//!    │
//!    └────admin──> rejected ──owner edits──> pending
//! ```
//!
//! Only `active` listings are bookable or publicly visible.

use crate::analytics::AnalyticsService;
use crate::environment::MarketEnvironment;
use crate::error::{MarketError, Result, Validator};
use crate::notify::{ChannelKey, Notification};
use crate::providers::DeleteOutcome;
use crate::types::{
    Actor, GeoPoint, Listing, ListingId, ListingQuery, ListingStatus, ListingType, Page, UserId,
};
use tracing::{debug, info, instrument};

/// Longest accepted title
pub const MAX_TITLE_LEN: usize = 200;
/// Longest accepted description
pub const MAX_DESCRIPTION_LEN: usize = 5000;
/// Longest accepted address
pub const MAX_ADDRESS_LEN: usize = 300;
/// Most photos per listing
pub const MAX_PHOTOS: usize = 20;

/// Owner-supplied listing fields, for creation and edits.
#[derive(Clone, Debug, PartialEq)]
pub struct ListingDraft {
    /// Headline
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Price in minor units
    pub price: i64,
    /// Rental type
    pub listing_type: ListingType,
    /// Street address
    pub address: String,
    /// Latitude, set together with longitude
    pub latitude: Option<f64>,
    /// Longitude, set together with latitude
    pub longitude: Option<f64>,
    /// Photo filenames in display order
    pub photos: Vec<String>,
}

impl ListingDraft {
    /// Validate every field, reporting all failures at once.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] listing each offending field.
    pub fn validate(&self) -> Result<Option<GeoPoint>> {
        let title = self.title.trim();
        let mut v = Validator::new();
        v.check(!title.is_empty(), "title", "title is required")
            .check(
                title.chars().count() <= MAX_TITLE_LEN,
                "title",
                format!("title must be at most {MAX_TITLE_LEN} characters"),
            )
            .check(
                self.description.chars().count() <= MAX_DESCRIPTION_LEN,
                "description",
                format!("description must be at most {MAX_DESCRIPTION_LEN} characters"),
            )
            .check(self.price > 0, "price", "price must be positive")
            .check(
                self.address.trim().chars().count() <= MAX_ADDRESS_LEN,
                "address",
                format!("address must be at most {MAX_ADDRESS_LEN} characters"),
            )
            .check(
                self.photos.len() <= MAX_PHOTOS,
                "photos",
                format!("at most {MAX_PHOTOS} photos are allowed"),
            )
            .check(
                self.photos.iter().all(|p| is_plain_filename(p)),
                "photos",
                "photos must be plain file names",
            );

        let location = match (self.latitude, self.longitude) {
            (None, None) => None,
            (Some(latitude), Some(longitude)) => {
                v.check(
                    (-90.0..=90.0).contains(&latitude),
                    "latitude",
                    "latitude must be between -90 and 90",
                )
                .check(
                    (-180.0..=180.0).contains(&longitude),
                    "longitude",
                    "longitude must be between -180 and 180",
                );
                Some(GeoPoint {
                    latitude,
                    longitude,
                })
            }
            _ => {
                v.check(false, "location", "latitude and longitude must be given together");
                None
            }
        };

        v.finish()?;
        Ok(location)
    }
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Listing management.
#[derive(Clone, Debug)]
pub struct ListingService {
    env: MarketEnvironment,
    analytics: AnalyticsService,
}

impl ListingService {
    /// Service over `env`.
    #[must_use]
    pub fn new(env: MarketEnvironment) -> Self {
        Self {
            analytics: AnalyticsService::new(env.clone()),
            env,
        }
    }

    /// Submit a new listing for moderation and notify admins.
    ///
    /// # Errors
    ///
    /// `Validation` for bad fields; storage failures.
    #[instrument(skip(self, draft))]
    pub async fn create(&self, owner_id: UserId, draft: ListingDraft) -> Result<Listing> {
        let location = draft.validate()?;
        let now = self.env.clock.now();
        let listing = Listing {
            id: ListingId::new(),
            owner_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            price: draft.price,
            listing_type: draft.listing_type,
            status: ListingStatus::Pending,
            address: draft.address.trim().to_string(),
            location,
            photos: draft.photos,
            created_at: now,
            updated_at: now,
        };

        let listing = self.env.listings.insert_listing(&listing).await?;
        info!(listing_id = %listing.id, "Listing submitted for moderation");
        self.env
            .notifier
            .publish(&ChannelKey::Admins, Notification::listing_submitted(&listing));
        Ok(listing)
    }

    /// Replace the owner-editable fields of a listing.
    ///
    /// Editing a `rejected` listing resubmits it as `pending`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` for non-owners, `Validation`.
    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        listing_id: ListingId,
        actor_id: UserId,
        draft: ListingDraft,
    ) -> Result<Listing> {
        let mut listing = self.owned(listing_id, actor_id).await?;
        let location = draft.validate()?;

        listing.title = draft.title.trim().to_string();
        listing.description = draft.description;
        listing.price = draft.price;
        listing.listing_type = draft.listing_type;
        listing.address = draft.address.trim().to_string();
        listing.location = location;
        listing.photos = draft.photos;
        listing.updated_at = self.env.clock.now();

        let resubmitted = listing.status == ListingStatus::Rejected;
        if resubmitted {
            listing.status = ListingStatus::Pending;
        }

        let listing = self.env.listings.update_listing(&listing).await?;
        if resubmitted {
            self.env
                .notifier
                .publish(&ChannelKey::Admins, Notification::listing_submitted(&listing));
        }
        Ok(listing)
    }

    /// Delete a listing with everything attached to it.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, `Conflict` while a confirmed booking exists.
    #[instrument(skip(self))]
    pub async fn delete(&self, listing_id: ListingId, actor_id: UserId) -> Result<()> {
        let listing = self.owned(listing_id, actor_id).await?;

        match self.env.listings.delete_listing(listing.id).await? {
            DeleteOutcome::Deleted => {}
            DeleteOutcome::Booked(confirmed) => {
                debug!(?confirmed, "Delete blocked by confirmed bookings");
                return Err(MarketError::Conflict(
                    "Listing has confirmed bookings and cannot be deleted".to_string(),
                ));
            }
            DeleteOutcome::Missing => return Err(MarketError::not_found("Listing", listing_id)),
        }
        info!("Listing deleted");
        Ok(())
    }

    /// Hide an active listing.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, `Conflict` unless the listing is `active`.
    pub async fn archive(&self, listing_id: ListingId, actor_id: UserId) -> Result<Listing> {
        self.owner_transition(listing_id, actor_id, ListingStatus::Active, ListingStatus::Archived)
            .await
    }

    /// Republish an archived listing.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, `Conflict` unless the listing is `archived`.
    pub async fn unarchive(&self, listing_id: ListingId, actor_id: UserId) -> Result<Listing> {
        self.owner_transition(listing_id, actor_id, ListingStatus::Archived, ListingStatus::Active)
            .await
    }

    /// Approve or reject a pending listing and notify its owner.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless `actor` is an admin
    /// - `Validation` unless `status` is `active` or `rejected`
    /// - `NotFound`, `Conflict` unless the listing is `pending`
    #[instrument(skip(self, actor), fields(admin_id = %actor.id))]
    pub async fn moderate(
        &self,
        listing_id: ListingId,
        actor: Actor,
        status: ListingStatus,
    ) -> Result<Listing> {
        if !actor.is_admin() {
            return Err(MarketError::Forbidden("Admin access required".to_string()));
        }
        if !matches!(status, ListingStatus::Active | ListingStatus::Rejected) {
            return Err(MarketError::validation(
                "status",
                "status must be 'active' or 'rejected'",
            ));
        }

        let mut listing = self.find(listing_id).await?;
        if listing.status != ListingStatus::Pending {
            return Err(MarketError::Conflict(format!(
                "Listing is {} and cannot be moderated",
                listing.status.as_str()
            )));
        }

        listing.status = status;
        listing.updated_at = self.env.clock.now();
        let listing = self.env.listings.update_listing(&listing).await?;

        info!(status = listing.status.as_str(), "Listing moderated");
        self.env.notifier.publish(
            &ChannelKey::User(listing.owner_id),
            Notification::listing_moderated(&listing),
        );
        Ok(listing)
    }

    /// A single listing.
    ///
    /// Active listings are visible to everyone and count a view for anyone
    /// but their owner; other statuses only to the owner and admins.
    ///
    /// # Errors
    ///
    /// `NotFound` when missing or not visible to `viewer`.
    pub async fn get(&self, listing_id: ListingId, viewer: Option<Actor>) -> Result<Listing> {
        let listing = self.find(listing_id).await?;
        let privileged = viewer.is_some_and(|a| a.is_admin() || a.id == listing.owner_id);

        if listing.is_active() {
            if viewer.is_none_or(|a| a.id != listing.owner_id) {
                self.analytics.record_view(listing.id).await;
            }
            Ok(listing)
        } else if privileged {
            Ok(listing)
        } else {
            Err(MarketError::not_found("Listing", listing_id))
        }
    }

    /// Public search over active listings, newest first.
    ///
    /// # Errors
    ///
    /// `Validation` when `min_price > max_price`; storage failures.
    pub async fn search(&self, query: ListingQuery) -> Result<Page<Listing>> {
        let query = query.normalized();
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(MarketError::validation(
                    "min_price",
                    "min_price must not exceed max_price",
                ));
            }
        }
        self.env.listings.search_active(&query).await
    }

    /// Every listing of the caller, any status.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn mine(&self, owner_id: UserId) -> Result<Vec<Listing>> {
        self.env.listings.list_by_owner(owner_id).await
    }

    /// Listings awaiting moderation, oldest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless `actor` is an admin.
    pub async fn pending(&self, actor: Actor) -> Result<Vec<Listing>> {
        if !actor.is_admin() {
            return Err(MarketError::Forbidden("Admin access required".to_string()));
        }
        self.env.listings.list_by_status(ListingStatus::Pending).await
    }

    async fn find(&self, listing_id: ListingId) -> Result<Listing> {
        self.env
            .listings
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| MarketError::not_found("Listing", listing_id))
    }

    async fn owned(&self, listing_id: ListingId, actor_id: UserId) -> Result<Listing> {
        let listing = self.find(listing_id).await?;
        if listing.owner_id != actor_id {
            return Err(MarketError::Forbidden(
                "Only the owner can modify this listing".to_string(),
            ));
        }
        Ok(listing)
    }

    async fn owner_transition(
        &self,
        listing_id: ListingId,
        actor_id: UserId,
        from: ListingStatus,
        to: ListingStatus,
    ) -> Result<Listing> {
        let mut listing = self.owned(listing_id, actor_id).await?;
        if listing.status != from {
            return Err(MarketError::Conflict(format!(
                "Listing is {}, expected {}",
                listing.status.as_str(),
                from.as_str()
            )));
        }
        listing.status = to;
        listing.updated_at = self.env.clock.now();
        self.env.listings.update_listing(&listing).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn draft() -> ListingDraft {
        ListingDraft {
            title: "Sunny loft".to_string(),
            description: "Two rooms near the harbour".to_string(),
            price: 95_000,
            listing_type: ListingType::MonthlyRental,
            address: "1 Quay Street".to_string(),
            latitude: Some(45.0),
            longitude: Some(-73.5),
            photos: vec!["front.jpg".to_string()],
        }
    }

    #[test]
    fn test_valid_draft_yields_location() {
        let location = draft().validate().unwrap();
        assert_eq!(location.map(|p| p.latitude), Some(45.0));
    }

    #[test]
    fn test_invalid_draft_reports_every_field() {
        let bad = ListingDraft {
            title: "   ".to_string(),
            price: 0,
            latitude: Some(91.0),
            photos: vec!["../etc/passwd".to_string()],
            ..draft()
        };
        let Err(MarketError::Validation(fields)) = bad.validate() else {
            panic!("expected validation error");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, ["title", "price", "photos", "latitude"]);
    }

    #[test]
    fn test_half_location_rejected() {
        let bad = ListingDraft {
            longitude: None,
            ..draft()
        };
        assert!(matches!(bad.validate(), Err(MarketError::Validation(_))));
    }
}
