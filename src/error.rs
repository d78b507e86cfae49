//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! The `Display` strings double as the wire-level error messages sent to a
//! single WebSocket client when an action is rejected.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All REST error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2003,
///     "message": "User already exists in the room",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                  |
/// |-----------|-------------------|------------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request              |
/// | 2000–2999 | State/Not Found   | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server            | 500 Internal Server Error    |
/// | 4000–4999 | Auth/Role         | 401 / 403                    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A participant with the same uuid is already present in the room.
    #[error("User already exists in the room")]
    DuplicateParticipant,

    /// Participant with the given uuid was not found in the room.
    #[error("Participant not found")]
    ParticipantNotFound,

    /// No matching (active) round exists for the room.
    #[error("Round not found")]
    RoundNotFound,

    /// The participant's role does not permit the operation.
    #[error("User is not allowed to vote")]
    NotAllowed,

    /// Request validation failed. The message is sent to the client verbatim.
    #[error("{0}")]
    InvalidInput(String),

    /// A timer is already running for the room.
    #[error("Timer exists")]
    TimerExists,

    /// Requested timer end time is not strictly in the future.
    #[error("End time is invalid")]
    InvalidEndTime,

    /// Bearer token failed signature or structural validation.
    #[error("Invalid token")]
    InvalidToken,

    /// Bearer token is past its expiry.
    #[error("Token expired")]
    ExpiredToken,

    /// Inbound WebSocket frame was not valid JSON.
    #[error("Invalid JSON format")]
    ProtocolError,

    /// Inbound frame named an action that is not registered.
    #[error("Invalid action")]
    UnknownAction,

    /// Bounded wait for a room-scoped store lock expired. Internal fault.
    #[error("lock wait timed out: {0}")]
    LockTimeout(String),

    /// Durable round store failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidInput(_) => 1001,
            Self::ProtocolError => 1002,
            Self::UnknownAction => 1003,
            Self::InvalidEndTime => 1004,
            Self::ParticipantNotFound => 2001,
            Self::RoundNotFound => 2002,
            Self::DuplicateParticipant => 2003,
            Self::TimerExists => 2004,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::LockTimeout(_) => 3002,
            Self::NotAllowed => 4001,
            Self::InvalidToken => 4002,
            Self::ExpiredToken => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_)
            | Self::ProtocolError
            | Self::UnknownAction
            | Self::InvalidEndTime => StatusCode::BAD_REQUEST,
            Self::ParticipantNotFound | Self::RoundNotFound => StatusCode::NOT_FOUND,
            Self::DuplicateParticipant | Self::TimerExists => StatusCode::CONFLICT,
            Self::NotAllowed => StatusCode::FORBIDDEN,
            Self::InvalidToken | Self::ExpiredToken => StatusCode::UNAUTHORIZED,
            Self::LockTimeout(_) | Self::Persistence(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if matches!(self, Self::LockTimeout(_)) {
            // Internal fault, not a user error: needs operational attention.
            tracing::error!(error = %self, "room lock wait exhausted");
        }
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn wire_messages_are_stable() {
        assert_eq!(
            GatewayError::DuplicateParticipant.to_string(),
            "User already exists in the room"
        );
        assert_eq!(
            GatewayError::ParticipantNotFound.to_string(),
            "Participant not found"
        );
        assert_eq!(GatewayError::ProtocolError.to_string(), "Invalid JSON format");
        assert_eq!(GatewayError::UnknownAction.to_string(), "Invalid action");
        assert_eq!(
            GatewayError::InvalidInput("Invalid vote format".to_string()).to_string(),
            "Invalid vote format"
        );
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            GatewayError::DuplicateParticipant.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            GatewayError::ParticipantNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(GatewayError::NotAllowed.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            GatewayError::ExpiredToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::LockTimeout("room:r1".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_codes_are_unique() {
        let variants = [
            GatewayError::DuplicateParticipant,
            GatewayError::ParticipantNotFound,
            GatewayError::RoundNotFound,
            GatewayError::NotAllowed,
            GatewayError::InvalidInput(String::new()),
            GatewayError::TimerExists,
            GatewayError::InvalidEndTime,
            GatewayError::InvalidToken,
            GatewayError::ExpiredToken,
            GatewayError::ProtocolError,
            GatewayError::UnknownAction,
            GatewayError::LockTimeout(String::new()),
            GatewayError::Persistence(String::new()),
            GatewayError::Internal(String::new()),
        ];
        let mut codes: Vec<u32> = variants.iter().map(GatewayError::error_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), variants.len());
    }
}
