//! estimation-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use estimation_gateway::api;
use estimation_gateway::app_state::AppState;
use estimation_gateway::auth::TokenService;
use estimation_gateway::config::GatewayConfig;
use estimation_gateway::persistence::{MemoryRoundStore, PostgresRoundStore, RoundStore};
use estimation_gateway::service::StoreTuning;
use estimation_gateway::store::{ExpiringStore, MemoryStore};
use estimation_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;
    tracing::info!(addr = %config.listen_addr, "starting estimation-gateway");

    // Shared expiring store. The in-memory implementation is
    // single-process; a multi-instance deployment plugs a distributed
    // backend into the same trait.
    let store: Arc<dyn ExpiringStore> = Arc::new(MemoryStore::new());

    // Durable round store
    let round_store: Arc<dyn RoundStore> = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await?;
        tracing::info!("connected to PostgreSQL round store");
        Arc::new(PostgresRoundStore::new(pool))
    } else {
        tracing::warn!("persistence disabled, using in-memory round store");
        Arc::new(MemoryRoundStore::new())
    };

    let tokens = Arc::new(TokenService::new(
        &config.token_secret,
        std::time::Duration::from_secs(config.token_ttl_secs),
    ));

    let tuning = StoreTuning {
        room_ttl: config.room_ttl(),
        channel_ttl: config.channel_ttl(),
        lock_wait: config.lock_wait_timeout(),
    };

    // Build application state
    let app_state = AppState::new(
        store,
        round_store,
        tokens,
        tuning,
        config.event_bus_capacity,
    );

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws/room/{room_id}", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
