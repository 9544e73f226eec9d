//! Service integration tests over the in-memory store.
//!
//! Covers listing lifecycle and moderation, messaging, favorites, counters,
//! accounts and owner statistics.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use chrono::Duration;
use rental_market_core::accounts::{AccountService, Registration};
use rental_market_core::analytics::AnalyticsService;
use rental_market_core::booking::{BookingPolicy, BookingRequest, Decision};
use rental_market_core::counters::CounterService;
use rental_market_core::error::MarketError;
use rental_market_core::favorites::FavoriteService;
use rental_market_core::listings::{ListingDraft, ListingService};
use rental_market_core::messaging::MessagingService;
use rental_market_core::notify::{ChannelKey, NotificationEvent};
use rental_market_core::providers::{BookingRepository, DeleteOutcome, ListingRepository};
use rental_market_core::types::{
    Actor, ListingQuery, ListingStatus, ListingType, Role,
};
use rental_market_testing::fixtures::{TestMarket, date};

fn draft(title: &str, price: i64) -> ListingDraft {
    ListingDraft {
        title: title.to_string(),
        description: "Quiet street, close to the station".to_string(),
        price,
        listing_type: ListingType::MonthlyRental,
        address: "4 Rue des Lilas".to_string(),
        latitude: Some(48.85),
        longitude: Some(2.35),
        photos: vec!["living.jpg".to_string(), "kitchen.jpg".to_string()],
    }
}

// ============================================================================
// Listings
// ============================================================================

#[tokio::test]
async fn test_listing_lifecycle_with_moderation() {
    let market = TestMarket::new();
    let owner = market.user("owner@example.com").await;
    let admin = market.admin("admin@example.com").await;
    let listings = ListingService::new(market.env.clone());

    let listing = listings.create(owner.id, draft("Loft", 90_000)).await.unwrap();
    assert_eq!(listing.status, ListingStatus::Pending);
    assert_eq!(
        market.notifier.events_for(&ChannelKey::Admins),
        vec![NotificationEvent::NewListingPendingAdmin]
    );

    // not public yet
    assert!(matches!(
        listings.get(listing.id, None).await,
        Err(MarketError::NotFound { .. })
    ));
    assert!(listings.get(listing.id, Some(Actor::user(owner.id))).await.is_ok());
    assert!(listings.get(listing.id, Some(Actor::from(&admin))).await.is_ok());

    // only admins moderate
    assert!(matches!(
        listings
            .moderate(listing.id, Actor::user(owner.id), ListingStatus::Active)
            .await,
        Err(MarketError::Forbidden(_))
    ));
    let active = listings
        .moderate(listing.id, Actor::from(&admin), ListingStatus::Active)
        .await
        .unwrap();
    assert!(active.is_active());
    assert_eq!(
        market.notifier.events_for(&ChannelKey::User(owner.id)),
        vec![NotificationEvent::ListingStatusUpdateOwner]
    );

    // a second moderation is a conflict
    assert!(matches!(
        listings
            .moderate(listing.id, Actor::from(&admin), ListingStatus::Rejected)
            .await,
        Err(MarketError::Conflict(_))
    ));

    let archived = listings.archive(listing.id, owner.id).await.unwrap();
    assert_eq!(archived.status, ListingStatus::Archived);
    assert!(matches!(
        listings.archive(listing.id, owner.id).await,
        Err(MarketError::Conflict(_))
    ));
    let back = listings.unarchive(listing.id, owner.id).await.unwrap();
    assert_eq!(back.status, ListingStatus::Active);
}

#[tokio::test]
async fn test_editing_rejected_listing_resubmits_it() {
    let market = TestMarket::new();
    let owner = market.user("owner@example.com").await;
    let other = market.user("other@example.com").await;
    let admin = market.admin("admin@example.com").await;
    let listings = ListingService::new(market.env.clone());

    let listing = listings.create(owner.id, draft("Loft", 90_000)).await.unwrap();
    listings
        .moderate(listing.id, Actor::from(&admin), ListingStatus::Rejected)
        .await
        .unwrap();

    assert!(matches!(
        listings.update(listing.id, other.id, draft("Mine now", 1)).await,
        Err(MarketError::Forbidden(_))
    ));

    let edited = listings
        .update(listing.id, owner.id, draft("Loft, renovated", 95_000))
        .await
        .unwrap();
    assert_eq!(edited.status, ListingStatus::Pending);
    assert_eq!(edited.title, "Loft, renovated");
    assert_eq!(
        listings.pending(Actor::from(&admin)).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_delete_refused_while_confirmed_booking_exists() {
    let market = TestMarket::new();
    let owner = market.user("owner@example.com").await;
    let tenant = market.user("tenant@example.com").await;
    let listing = market.active_listing(owner.id).await;
    let listings = ListingService::new(market.env.clone());
    let engine = market.engine(BookingPolicy::default());

    let booking = engine
        .request_booking(BookingRequest {
            listing_id: listing.id,
            tenant_id: tenant.id,
            start_date: date("2024-03-01"),
            end_date: date("2024-03-03"),
        })
        .await
        .unwrap();
    engine.decide_booking(booking.id, owner.id, Decision::Confirm).await.unwrap();

    assert!(matches!(
        listings.delete(listing.id, owner.id).await,
        Err(MarketError::Conflict(_))
    ));
    assert_eq!(
        market.store.delete_listing(listing.id).await.unwrap(),
        DeleteOutcome::Booked(vec![booking.id])
    );
    assert!(market.store.get_booking(booking.id).await.unwrap().is_some());

    let spare = market.active_listing(owner.id).await;
    listings.delete(spare.id, owner.id).await.unwrap();
    assert!(matches!(
        listings.get(spare.id, Some(Actor::user(owner.id))).await,
        Err(MarketError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_search_filters_and_paginates_newest_first() {
    let market = TestMarket::new();
    let owner = market.user("owner@example.com").await;
    let admin = market.admin("admin@example.com").await;
    let listings = ListingService::new(market.env.clone());

    let mut ids = Vec::new();
    for (title, price) in [("Cheap room", 30_000), ("Harbour flat", 80_000), ("Harbour villa", 250_000)] {
        market.clock.advance(Duration::minutes(1));
        let listing = listings.create(owner.id, draft(title, price)).await.unwrap();
        listings
            .moderate(listing.id, Actor::from(&admin), ListingStatus::Active)
            .await
            .unwrap();
        ids.push(listing.id);
    }
    listings.create(owner.id, draft("Harbour pending", 50_000)).await.unwrap();

    let page = listings
        .search(ListingQuery {
            text: Some("harbour".to_string()),
            ..ListingQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].id, ids[2]);
    assert_eq!(page.items[1].id, ids[1]);

    let page = listings
        .search(ListingQuery {
            max_price: Some(100_000),
            per_page: 1,
            page: 2,
            ..ListingQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, ids[0]);

    assert!(matches!(
        listings
            .search(ListingQuery {
                min_price: Some(10),
                max_price: Some(5),
                ..ListingQuery::default()
            })
            .await,
        Err(MarketError::Validation(_))
    ));
}

// ============================================================================
// Messaging
// ============================================================================

#[tokio::test]
async fn test_messaging_flow() {
    let market = TestMarket::new();
    let owner = market.user("owner@example.com").await;
    let tenant = market.user("tenant@example.com").await;
    let outsider = market.user("outsider@example.com").await;
    let listing = market.active_listing(owner.id).await;
    let messaging = MessagingService::new(market.env.clone());

    let sent = messaging
        .send(tenant.id, listing.id, owner.id, "  Is it still available?  ")
        .await
        .unwrap();
    assert_eq!(sent.content, "Is it still available?");
    assert_eq!(
        market.notifier.events_for(&ChannelKey::User(owner.id)),
        vec![NotificationEvent::NewMessageNotification]
    );
    assert_eq!(
        market.notifier.events_for(&ChannelKey::User(tenant.id)),
        vec![NotificationEvent::NewMessageNotification]
    );

    market.clock.advance(Duration::minutes(1));
    messaging
        .send(owner.id, listing.id, tenant.id, "Yes!")
        .await
        .unwrap();

    // neither party owns the listing
    assert!(matches!(
        messaging.send(tenant.id, listing.id, outsider.id, "hi").await,
        Err(MarketError::Forbidden(_))
    ));
    assert!(matches!(
        messaging.send(tenant.id, listing.id, tenant.id, "hi").await,
        Err(MarketError::Validation(_))
    ));
    assert!(matches!(
        messaging.send(tenant.id, listing.id, owner.id, "   ").await,
        Err(MarketError::Validation(_))
    ));

    let conversations = messaging.conversations(owner.id).await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].counterparty_id, tenant.id);
    assert_eq!(conversations[0].last_message.content, "Yes!");
    assert_eq!(conversations[0].unread_count, 1);

    let thread = messaging.thread(owner.id, listing.id, tenant.id).await.unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0].id, sent.id);

    market.notifier.clear();
    assert_eq!(messaging.mark_read(owner.id, listing.id, tenant.id).await.unwrap(), 1);
    assert_eq!(
        market.notifier.events_for(&ChannelKey::User(tenant.id)),
        vec![NotificationEvent::MessagesReadUpdate]
    );
    assert_eq!(
        market.notifier.events_for(&ChannelKey::User(owner.id)),
        vec![NotificationEvent::MessagesReadUpdate]
    );
    assert_eq!(messaging.mark_read(owner.id, listing.id, tenant.id).await.unwrap(), 0);
}

// ============================================================================
// Favorites
// ============================================================================

#[tokio::test]
async fn test_favorites() {
    let market = TestMarket::new();
    let owner = market.user("owner@example.com").await;
    let user = market.user("user@example.com").await;
    let first = market.active_listing(owner.id).await;
    let second = market.active_listing(owner.id).await;
    let hidden = market.listing(owner.id, ListingStatus::Pending).await;
    let favorites = FavoriteService::new(market.env.clone());

    favorites.add(user.id, first.id).await.unwrap();
    market.clock.advance(Duration::seconds(5));
    favorites.add(user.id, second.id).await.unwrap();

    assert!(matches!(
        favorites.add(user.id, first.id).await,
        Err(MarketError::Conflict(_))
    ));
    assert!(matches!(
        favorites.add(user.id, hidden.id).await,
        Err(MarketError::NotFound { .. })
    ));

    let listed: Vec<_> = favorites
        .list(user.id)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(listed, vec![second.id, first.id]);

    favorites.remove(user.id, first.id).await.unwrap();
    assert!(matches!(
        favorites.remove(user.id, first.id).await,
        Err(MarketError::NotFound { .. })
    ));
}

// ============================================================================
// Counters and analytics
// ============================================================================

#[tokio::test]
async fn test_counters_are_recomputed_per_call() {
    let market = TestMarket::new();
    let owner = market.user("owner@example.com").await;
    let tenant = market.user("tenant@example.com").await;
    let admin = market.admin("admin@example.com").await;
    let listing = market.active_listing(owner.id).await;
    market.listing(owner.id, ListingStatus::Pending).await;
    let engine = market.engine(BookingPolicy::default());
    let messaging = MessagingService::new(market.env.clone());
    let counters = CounterService::new(market.env.clone());

    let booking = engine
        .request_booking(BookingRequest {
            listing_id: listing.id,
            tenant_id: tenant.id,
            start_date: date("2024-03-01"),
            end_date: date("2024-03-03"),
        })
        .await
        .unwrap();
    messaging.send(tenant.id, listing.id, owner.id, "Hello").await.unwrap();

    let owner_counts = counters.for_actor(Actor::user(owner.id)).await.unwrap();
    assert_eq!(owner_counts.unread_messages, 1);
    assert_eq!(owner_counts.pending_bookings, 1);
    assert_eq!(owner_counts.pending_listings, None);

    engine.decide_booking(booking.id, owner.id, Decision::Reject).await.unwrap();
    let tenant_counts = counters.for_actor(Actor::user(tenant.id)).await.unwrap();
    assert_eq!(tenant_counts.unseen_booking_updates, 1);

    let owner_counts = counters.for_actor(Actor::user(owner.id)).await.unwrap();
    assert_eq!(owner_counts.pending_bookings, 0);

    let admin_counts = counters.for_actor(Actor::from(&admin)).await.unwrap();
    assert_eq!(admin_counts.pending_listings, Some(1));
}

#[tokio::test]
async fn test_views_counted_for_visitors_but_not_owner() {
    let market = TestMarket::new();
    let owner = market.user("owner@example.com").await;
    let visitor = market.user("visitor@example.com").await;
    let listing = market.active_listing(owner.id).await;
    let listings = ListingService::new(market.env.clone());
    let analytics = AnalyticsService::new(market.env.clone());

    listings.get(listing.id, None).await.unwrap();
    listings.get(listing.id, Some(Actor::user(visitor.id))).await.unwrap();
    listings.get(listing.id, Some(Actor::user(owner.id))).await.unwrap();

    let stats = analytics.owner_stats(owner.id).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].views, 2);
    assert_eq!(stats[0].pending_bookings, 0);
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_register_login_and_duplicate_email() {
    let market = TestMarket::new();
    let accounts = AccountService::with_hash_cost(market.env.clone(), 4);

    let user = accounts
        .register(Registration {
            name: " Ana ".to_string(),
            email: "Ana@Example.com".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(user.email, "ana@example.com");
    assert_eq!(user.name, "Ana");
    assert_eq!(user.role, Role::User);
    assert_ne!(user.password_hash, "correct horse");

    let logged_in = accounts.login("ANA@example.com", "correct horse").await.unwrap();
    assert_eq!(logged_in.id, user.id);

    assert!(matches!(
        accounts.login("ana@example.com", "wrong password").await,
        Err(MarketError::Unauthorized(_))
    ));
    assert!(matches!(
        accounts.login("nobody@example.com", "correct horse").await,
        Err(MarketError::Unauthorized(_))
    ));

    assert!(matches!(
        accounts
            .register(Registration {
                name: "Impostor".to_string(),
                email: "ana@example.com".to_string(),
                password: "another secret".to_string(),
            })
            .await,
        Err(MarketError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_ensure_admin_is_idempotent() {
    let market = TestMarket::new();
    let accounts = AccountService::with_hash_cost(market.env.clone(), 4);
    let registration = Registration {
        name: "Root".to_string(),
        email: "root@example.com".to_string(),
        password: "super secret".to_string(),
    };

    let first = accounts.ensure_admin(registration.clone()).await.unwrap();
    let second = accounts.ensure_admin(registration).await.unwrap();
    assert_eq!(first.id, second.id);
    assert!(first.is_admin());
}
