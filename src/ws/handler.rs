//! Axum WebSocket upgrade handler: the Connecting → Authenticating leg.
//!
//! The room id comes from the connection target and the bearer token from
//! the query string. Authentication failure or an inactive room refuses
//! the connection with an HTTP error; the socket is never upgraded.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::RoomId;
use crate::error::GatewayError;

/// Query parameters of the WebSocket endpoint.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Opaque bearer token issued at join time.
    #[serde(default)]
    pub token: Option<String>,
}

/// `GET /ws/room/{room_id}?token=...` — upgrade to WebSocket.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidToken`] / [`GatewayError::ExpiredToken`]
/// when the token does not resolve to a participant uuid, and
/// [`GatewayError::RoundNotFound`] when the room has no active round.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<uuid::Uuid>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let room_id = RoomId::from_uuid(room_id);

    let token = query.token.ok_or(GatewayError::InvalidToken)?;
    let user_uuid = state.tokens.decode(&token)?;

    // Only rooms with a running round accept connections.
    state
        .rounds
        .round_store()
        .active_round(room_id)
        .await?
        .ok_or(GatewayError::RoundNotFound)?;

    tracing::debug!(%room_id, %user_uuid, "ws connection authenticated");
    let event_rx = state.event_bus.subscribe();
    Ok(ws.on_upgrade(move |socket| run_connection(socket, state, room_id, user_uuid, event_rx)))
}
