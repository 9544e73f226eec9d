//! Marketplace HTTP server.
//!
//! REST API, notification WebSocket and Prometheus metrics over a
//! `PostgreSQL` store.

use anyhow::Context;
use marketplace::auth::JwtKeys;
use marketplace::config::Config;
use marketplace::metrics::register_business_metrics;
use marketplace::server::health::DatabaseProbe;
use marketplace::server::{AppState, StateOptions, build_router};
use metrics_exporter_prometheus::PrometheusBuilder;
use rental_market_core::accounts::{DEFAULT_HASH_COST, Registration};
use rental_market_core::environment::{MarketEnvironment, SystemClock};
use rental_market_postgres::PostgresStore;
use rental_market_web::{NotificationHub, ResponseCache};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "marketplace=info,rental_market_core=info,rental_market_web=info,tower_http=debug,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Marketplace HTTP Server");

    // Load configuration
    let config = Config::from_env();
    let policy = config.booking.policy().context("Invalid BOOKING_POLICY")?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        app_env = %config.server.app_env,
        booking_policy = ?policy,
        "Configuration loaded"
    );

    // Metrics exporter
    let metrics_addr: SocketAddr = format!("{}:{}", config.server.metrics_host, config.server.metrics_port)
        .parse()
        .context("Invalid metrics address")?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    register_business_metrics();
    info!(address = %metrics_addr, "Metrics endpoint listening");

    // Database
    info!("Connecting to database...");
    let store = PostgresStore::connect(
        &config.postgres.url,
        config.postgres.max_connections,
        config.postgres.min_connections,
        config.postgres.connect_timeout(),
    )
    .await
    .context("Failed to connect to database")?;
    store.migrate().await.context("Failed to run migrations")?;
    info!("Database connected and migrated");

    // Services
    let hub = NotificationHub::new();
    let env = MarketEnvironment::with_store(
        Arc::new(store.clone()),
        Arc::new(SystemClock),
        Arc::new(hub.clone()),
    );
    let state = AppState::new(
        &env,
        hub,
        JwtKeys::new(config.auth.jwt_secret.as_bytes(), config.auth.token_ttl),
        Arc::new(DatabaseProbe::new(store)),
        StateOptions {
            policy,
            cache: ResponseCache::new(config.cache.capacity, config.cache.ttl()),
            max_connections: config.server.max_ws_connections,
            hash_cost: DEFAULT_HASH_COST,
            expose_internal_errors: !config.server.is_production(),
        },
    );

    if let Some(admin) = &config.admin {
        let user = state
            .accounts
            .ensure_admin(Registration {
                name: admin.name.clone(),
                email: admin.email.clone(),
                password: admin.password.clone(),
            })
            .await
            .context("Failed to provision admin account")?;
        info!(user_id = %user.id, email = %user.email, "Admin account ready");
    }

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    // Open WebSocket sessions keep the server alive after the signal, so
    // draining is bounded by the shutdown timeout.
    let (draining_tx, mut draining_rx) = watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = draining_tx.send(true);
        })
        .into_future();
    let drain_deadline = async {
        if draining_rx.wait_for(|draining| *draining).await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(Duration::from_secs(config.server.shutdown_timeout)).await;
    };

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!(error = %e, "Server error");
                return Err(e.into());
            }
        }
        () = drain_deadline => {
            warn!(
                timeout_secs = config.server.shutdown_timeout,
                "Graceful shutdown timed out, closing remaining connections"
            );
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
