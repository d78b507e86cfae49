//! WebSocket connection state machine.
//!
//! A connection moves Connecting → Authenticating (in
//! [`super::handler::ws_handler`], before the upgrade) → Open (this loop)
//! → Closed. While Open, inbound frames are parsed and routed through the
//! dispatcher and matching broadcast events are relayed to the client;
//! rejected frames get an error payload on this connection only. On close
//! the channel binding is removed and the participant is marked offline.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::actions::ActionContext;
use super::messages;
use crate::app_state::AppState;
use crate::domain::{GroupMessage, RoomEvent, RoomId};
use crate::error::GatewayError;

/// Runs the Open phase for an authenticated connection.
///
/// - Registers the channel binding and marks the participant online.
/// - Broadcasts the current "who has voted" snapshot to the room.
/// - Reads frames from the client and dispatches them.
/// - Forwards the room's events from the [`broadcast::Receiver`].
pub async fn run_connection(
    socket: WebSocket,
    state: AppState,
    room_id: RoomId,
    user_uuid: Uuid,
    mut event_rx: broadcast::Receiver<GroupMessage>,
) {
    let channel_id = Uuid::new_v4();
    let group = room_id.group_name();

    if let Err(error) = state
        .channels
        .add_participant(channel_id, user_uuid, room_id)
        .await
    {
        tracing::warn!(%channel_id, %error, "channel registration failed");
    }
    if let Err(error) = state.presence.set_user_online(user_uuid, room_id).await {
        tracing::warn!(%user_uuid, %error, "presence online bookkeeping failed");
    }
    match state.room_state(room_id).get_votes().await {
        Ok(votes) => {
            state.notifier.send(
                &group,
                RoomEvent::VotedUsersUpdate {
                    voted_users: votes.keys().copied().collect(),
                },
            );
        }
        Err(error) => {
            tracing::warn!(%room_id, %error, "voted-users snapshot failed");
        }
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Incoming frame from the client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_frame(&state, room_id, user_uuid, &text).await;
                        if let Some(payload) = reply
                            && ws_tx.send(Message::text(payload)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            // Event from the room's broadcast group
            event = event_rx.recv() => {
                match event {
                    Ok(message) => {
                        if message.group != group {
                            continue;
                        }
                        let json = serde_json::to_string(&message.event).unwrap_or_default();
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    close_connection(&state, channel_id).await;
    tracing::debug!(%channel_id, "ws connection closed");
}

/// Parses and dispatches one inbound frame. Returns the payload to send
/// back to this connection only, if any; successful actions broadcast to
/// the whole room instead.
async fn handle_frame(
    state: &AppState,
    room_id: RoomId,
    user_uuid: Uuid,
    text: &str,
) -> Option<String> {
    let (action, params) = match messages::parse_frame(text) {
        Ok(parsed) => parsed,
        Err(error) => return Some(messages::error_payload(&error)),
    };

    let context = ActionContext {
        state: state.clone(),
        room_id,
        user_uuid,
    };
    match state.dispatcher.execute(&action, &context, &params).await {
        Ok(event) => {
            state.notifier.send(&room_id.group_name(), event);
            None
        }
        Err(error) => {
            if matches!(error, GatewayError::LockTimeout(_)) {
                tracing::error!(%room_id, %user_uuid, %error, "action hit lock timeout");
            }
            Some(messages::error_payload(&error))
        }
    }
}

/// Closed-state bookkeeping: unbind the channel and resolve the binding
/// back to presence.
async fn close_connection(state: &AppState, channel_id: Uuid) {
    match state.channels.remove_participant(channel_id).await {
        Ok(Some(binding)) => {
            if let Err(error) = state
                .presence
                .set_user_offline(binding.user_uuid, binding.room_id)
                .await
            {
                // Kicked participants are already gone from the room.
                tracing::debug!(
                    user = %binding.user_uuid,
                    %error,
                    "offline bookkeeping skipped"
                );
            }
        }
        Ok(None) => {}
        Err(error) => {
            tracing::warn!(%channel_id, %error, "channel unbind failed");
        }
    }
}
