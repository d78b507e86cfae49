//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Thin endpoints over the service layer: joining and kicking
//! participants, the room timer, and the round lifecycle. All endpoints
//! are mounted under `/api/v1`, except the health check.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
