//! REST endpoint handlers organized by resource.

pub mod participants;
pub mod rounds;
pub mod system;
pub mod timer;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(participants::routes())
        .merge(timer::routes())
        .merge(rounds::routes())
}
