//! Round lifecycle handlers: start, end, restart, rename task.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{RoundResponse, StartRoundRequest, UpdateTaskRequest};
use crate::app_state::AppState;
use crate::domain::RoomId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /rooms/{room_id}/rounds` — start a new voting round.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidInput`] if the room already has an
/// active round.
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/rounds",
    tag = "Rounds",
    summary = "Start a round",
    description = "Creates the durable round record and broadcasts `round_started` to the room.",
    request_body = StartRoundRequest,
    responses(
        (status = 201, description = "Round started", body = RoundResponse),
        (status = 400, description = "Room already has an active round", body = ErrorResponse),
    )
)]
pub async fn start_round(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(req): Json<StartRoundRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state
        .rounds
        .start_round(RoomId::from_uuid(room_id), &req.task_name)
        .await?;
    Ok((StatusCode::CREATED, Json(RoundResponse::from(record))))
}

/// `PUT /rounds/{round_id}/end` — end the round for good.
///
/// # Errors
///
/// Returns [`GatewayError::RoundNotFound`] for an unknown or already
/// ended round.
#[utoipa::path(
    put,
    path = "/api/v1/rounds/{round_id}/end",
    tag = "Rounds",
    summary = "End a round",
    description = "Marks the round inactive, clears the room's ephemeral state, and wipes quarantined participants.",
    responses(
        (status = 200, description = "Round ended", body = RoundResponse),
        (status = 404, description = "Active round not found", body = ErrorResponse),
    )
)]
pub async fn end_round(
    State(state): State<AppState>,
    Path(round_id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state.rounds.end_round(round_id).await?;
    Ok(Json(RoundResponse::from(record)))
}

/// `PUT /rounds/{round_id}/restart` — reset the round for a fresh vote.
///
/// # Errors
///
/// Returns [`GatewayError::RoundNotFound`] for an unknown round.
#[utoipa::path(
    put,
    path = "/api/v1/rounds/{round_id}/restart",
    tag = "Rounds",
    summary = "Restart a round",
    description = "Reactivates the round, drops votes and the stored average, cleans offline leftovers, and broadcasts `round_change_status` with `restart`.",
    responses(
        (status = 200, description = "Round restarted", body = RoundResponse),
        (status = 404, description = "Round not found", body = ErrorResponse),
    )
)]
pub async fn restart_round(
    State(state): State<AppState>,
    Path(round_id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state.rounds.restart_round(round_id).await?;
    Ok(Json(RoundResponse::from(record)))
}

/// `PUT /rounds/{round_id}/task` — rename the round's task.
///
/// # Errors
///
/// Returns [`GatewayError::RoundNotFound`] for an unknown round.
#[utoipa::path(
    put,
    path = "/api/v1/rounds/{round_id}/task",
    tag = "Rounds",
    summary = "Rename the round's task",
    description = "Updates the durable record and broadcasts `task_name_changed`.",
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task renamed", body = RoundResponse),
        (status = 404, description = "Round not found", body = ErrorResponse),
    )
)]
pub async fn update_task(
    State(state): State<AppState>,
    Path(round_id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state
        .rounds
        .update_task_name(round_id, &req.task_name, &req.nickname)
        .await?;
    Ok(Json(RoundResponse::from(record)))
}

/// Round routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms/{room_id}/rounds", post(start_round))
        .route("/rounds/{round_id}/end", put(end_round))
        .route("/rounds/{round_id}/restart", put(restart_round))
        .route("/rounds/{round_id}/task", put(update_task))
}
