//! Participant handlers: join, kick, presence map.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{JoinRoomRequest, JoinRoomResponse, PresenceResponse};
use crate::app_state::AppState;
use crate::domain::{RoomEvent, RoomId};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /rooms/{room_id}/participants` — join a room.
///
/// Adds the participant to the room cache, issues the session token for
/// the WebSocket connection, and broadcasts `user_joined`.
///
/// # Errors
///
/// Returns [`GatewayError::DuplicateParticipant`] on uuid collision and
/// [`GatewayError::InvalidInput`] for an unknown role.
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/participants",
    tag = "Participants",
    summary = "Join a room",
    description = "Adds a participant with the given nickname and role, returning the participant uuid and the bearer token used to open the room's WebSocket.",
    request_body = JoinRoomRequest,
    responses(
        (status = 201, description = "Participant joined", body = JoinRoomResponse),
        (status = 400, description = "Invalid role", body = ErrorResponse),
        (status = 409, description = "Participant already present", body = ErrorResponse),
    )
)]
pub async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let room_id = RoomId::from_uuid(room_id);
    let role = req.parsed_role()?;

    let user_uuid = Uuid::new_v4();
    state
        .room_state(room_id)
        .add_user(user_uuid, role, req.nickname.clone())
        .await?;
    let token = state.tokens.issue(user_uuid)?;

    state.notifier.send(
        &room_id.group_name(),
        RoomEvent::UserJoined {
            user: user_uuid,
            nickname: req.nickname,
            role,
        },
    );
    tracing::info!(%room_id, %user_uuid, ?role, "participant joined");

    Ok((
        StatusCode::CREATED,
        Json(JoinRoomResponse { user_uuid, token }),
    ))
}

/// `DELETE /rooms/{room_id}/participants/{user_uuid}` — kick a participant.
///
/// # Errors
///
/// Returns [`GatewayError::ParticipantNotFound`] if the uuid is not in
/// the room.
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{room_id}/participants/{user_uuid}",
    tag = "Participants",
    summary = "Kick a participant",
    description = "Removes the participant (and any pending vote) from the room and broadcasts `user_kicked`.",
    responses(
        (status = 204, description = "Participant removed"),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn kick_participant(
    State(state): State<AppState>,
    Path((room_id, user_uuid)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, GatewayError> {
    let room_id = RoomId::from_uuid(room_id);
    let room = state.room_state(room_id);

    let participant = room
        .get_user(user_uuid)
        .await?
        .ok_or(GatewayError::ParticipantNotFound)?;
    room.remove_user(user_uuid).await?;

    state.notifier.send(
        &room_id.group_name(),
        RoomEvent::UserKicked {
            user: user_uuid,
            nickname: participant.nickname,
        },
    );
    tracing::info!(%room_id, %user_uuid, "participant kicked");

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /rooms/{room_id}/participants` — the room's presence map.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/participants",
    tag = "Participants",
    summary = "Presence map",
    description = "Returns the room's presence map (participant uuid to online flag) for diagnostics and UI.",
    responses(
        (status = 200, description = "Presence map", body = PresenceResponse),
    )
)]
pub async fn room_presence(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let participants = state
        .presence
        .get_room_participants(RoomId::from_uuid(room_id))
        .await?;
    Ok(Json(PresenceResponse { participants }))
}

/// Participant routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/rooms/{room_id}/participants",
            post(join_room).get(room_presence),
        )
        .route(
            "/rooms/{room_id}/participants/{user_uuid}",
            delete(kick_participant),
        )
}
