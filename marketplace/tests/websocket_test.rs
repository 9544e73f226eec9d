//! Live notification delivery over a real socket.
//!
//! Run with: `cargo test -p marketplace --test websocket_test`

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod common;

use chrono::NaiveDate;
use common::{active_listing, admin_with_token, test_state, user_with_token};
use futures::{SinkExt, StreamExt};
use marketplace::build_router;
use marketplace::server::AppState;
use rental_market_core::booking::{BookingPolicy, BookingRequest};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(state: &AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, token: &str) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}/api/ws?token={token}"))
        .await
        .expect("WebSocket handshake succeeds");
    socket
}

/// Next JSON text frame, skipping keep-alive control frames.
async fn next_event(socket: &mut Socket) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    })
    .await
    .expect("event arrives in time")
}

/// Wait until the server holds `connections` session permits.
async fn wait_for_sessions(state: &AppState, connections: usize) {
    for _ in 0..50 {
        if state.connections.active() >= connections {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("sessions never became active");
}

#[tokio::test]
async fn test_booking_request_is_pushed_to_owner() {
    let state = test_state(BookingPolicy::default());
    let addr = serve(&state).await;
    let (owner, owner_token) = user_with_token(&state, "owner@example.com").await;
    let (tenant, _) = user_with_token(&state, "tenant@example.com").await;
    let (admin, _) = admin_with_token(&state).await;
    let listing = active_listing(&state, &owner, &admin, "Harbour view studio").await;

    let mut socket = connect(addr, &owner_token).await;
    wait_for_sessions(&state, 1).await;

    let booking = state
        .bookings
        .request_booking(BookingRequest {
            listing_id: listing.id,
            tenant_id: tenant.id,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        })
        .await
        .unwrap();

    let event = next_event(&mut socket).await;
    assert_eq!(event["event"], "new_booking_request_owner");
    assert_eq!(event["payload"]["booking"]["id"], booking.id.to_string());
    assert_eq!(event["payload"]["listing_title"], "Harbour view studio");
}

#[tokio::test]
async fn test_admin_session_receives_moderation_queue() {
    let state = test_state(BookingPolicy::default());
    let addr = serve(&state).await;
    let (owner, _) = user_with_token(&state, "owner@example.com").await;
    let (_, admin_token) = admin_with_token(&state).await;

    let mut socket = connect(addr, &admin_token).await;
    wait_for_sessions(&state, 1).await;

    let listing = state
        .listings
        .create(owner.id, common::draft("Garden flat", 9_000))
        .await
        .unwrap();

    let event = next_event(&mut socket).await;
    assert_eq!(event["event"], "new_listing_pending_admin");
    assert_eq!(event["payload"]["id"], listing.id.to_string());
}

#[tokio::test]
async fn test_client_ping_is_answered() {
    let state = test_state(BookingPolicy::default());
    let addr = serve(&state).await;
    let (_, token) = user_with_token(&state, "tenant@example.com").await;

    let mut socket = connect(addr, &token).await;
    socket
        .send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await
        .unwrap();

    let event = next_event(&mut socket).await;
    assert_eq!(event["event"], "pong");
}

#[tokio::test]
async fn test_handshake_requires_valid_token() {
    let state = test_state(BookingPolicy::default());
    let addr = serve(&state).await;

    let result = connect_async(format!("ws://{addr}/api/ws?token=forged")).await;
    assert!(result.is_err());
    assert_eq!(state.connections.active(), 0);
}
