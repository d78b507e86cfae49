//! Room timer handlers: start, read, reset.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{StartTimerRequest, TimerResponse};
use crate::app_state::AppState;
use crate::domain::{RoomEvent, RoomId};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /rooms/{room_id}/timer` — start the room timer.
///
/// # Errors
///
/// Returns [`GatewayError::TimerExists`] if a timer is already running and
/// [`GatewayError::InvalidEndTime`] if the end is not in the future.
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/timer",
    tag = "Timer",
    summary = "Start the room timer",
    description = "Stores the timer with a TTL equal to its remaining duration and broadcasts `timer_started`. At most one timer per room.",
    request_body = StartTimerRequest,
    responses(
        (status = 201, description = "Timer started", body = TimerResponse),
        (status = 400, description = "End time not in the future", body = ErrorResponse),
        (status = 409, description = "Timer already running", body = ErrorResponse),
    )
)]
pub async fn start_timer(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(req): Json<StartTimerRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let room_id = RoomId::from_uuid(room_id);
    state.room_state(room_id).start_timer(req.end_time).await?;

    state.notifier.send(
        &room_id.group_name(),
        RoomEvent::TimerStarted {
            end_time: req.end_time.timestamp_millis(),
        },
    );
    tracing::info!(%room_id, end_time = %req.end_time, "timer started");

    Ok((
        StatusCode::CREATED,
        Json(TimerResponse {
            end_time: Some(req.end_time),
        }),
    ))
}

/// `GET /rooms/{room_id}/timer` — current timer state.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/timer",
    tag = "Timer",
    summary = "Read the room timer",
    responses(
        (status = 200, description = "Current timer, or null when none", body = TimerResponse),
    )
)]
pub async fn get_timer(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let end_time = state
        .room_state(RoomId::from_uuid(room_id))
        .get_timer()
        .await?;
    Ok(Json(TimerResponse { end_time }))
}

/// `DELETE /rooms/{room_id}/timer` — reset the timer.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] on store failure.
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{room_id}/timer",
    tag = "Timer",
    summary = "Reset the room timer",
    description = "Clears the timer and broadcasts `timer_reset`. Resetting an absent timer is a no-op.",
    responses(
        (status = 204, description = "Timer cleared"),
    )
)]
pub async fn reset_timer(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let room_id = RoomId::from_uuid(room_id);
    state.room_state(room_id).reset_timer().await?;

    state
        .notifier
        .send(&room_id.group_name(), RoomEvent::TimerReset);
    tracing::info!(%room_id, "timer reset");

    Ok(StatusCode::NO_CONTENT)
}

/// Timer routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/rooms/{room_id}/timer",
        post(start_timer).get(get_timer).delete(reset_timer),
    )
}
