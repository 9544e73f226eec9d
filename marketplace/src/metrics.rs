//! Business metrics for the marketplace.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `marketplace_bookings_total{status}` - Booking requests and decisions
//! - `marketplace_messages_total` - Messages sent
//! - `marketplace_listings_total{status}` - Listings submitted and moderated
//! - `marketplace_notifications_total{delivered}` - Pushes, recorded by the hub
//! - `marketplace_ws_rejected_total` - Sockets refused at the connection limit

use metrics::describe_counter;
use rental_market_core::types::{BookingStatus, ListingStatus};

/// Register all business metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_business_metrics() {
    describe_counter!(
        "marketplace_bookings_total",
        "Bookings by resulting status (pending on request, confirmed or rejected on decision)"
    );
    describe_counter!("marketplace_messages_total", "Messages sent between users");
    describe_counter!(
        "marketplace_listings_total",
        "Listings by resulting status (pending on submission, active or rejected on moderation)"
    );
    describe_counter!(
        "marketplace_notifications_total",
        "Notifications published, by whether a live subscriber received them"
    );
    describe_counter!(
        "marketplace_ws_rejected_total",
        "WebSocket upgrades refused because the connection limit was reached"
    );

    tracing::info!("Business metrics registered");
}

/// Record a booking reaching `status`.
pub fn record_booking(status: BookingStatus) {
    metrics::counter!("marketplace_bookings_total", "status" => status.as_str()).increment(1);
}

/// Record a sent message.
pub fn record_message_sent() {
    metrics::counter!("marketplace_messages_total").increment(1);
}

/// Record a listing reaching `status`.
pub fn record_listing(status: ListingStatus) {
    metrics::counter!("marketplace_listings_total", "status" => status.as_str()).increment(1);
}

/// Record a refused WebSocket upgrade.
pub fn record_ws_rejected() {
    metrics::counter!("marketplace_ws_rejected_total").increment(1);
}
