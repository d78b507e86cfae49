//! Request and response DTOs for the REST endpoints.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Role;
use crate::error::GatewayError;
use crate::persistence::RoundRecord;

/// Body of `POST /rooms/{room_id}/participants`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct JoinRoomRequest {
    /// Display name of the joining participant.
    pub nickname: String,
    /// Requested role: `"voter"` or `"observer"`.
    pub role: String,
}

impl JoinRoomRequest {
    /// Parses the requested role string.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] for anything but the two
    /// known roles.
    pub fn parsed_role(&self) -> Result<Role, GatewayError> {
        match self.role.as_str() {
            "voter" => Ok(Role::Voter),
            "observer" => Ok(Role::Observer),
            _ => Err(GatewayError::InvalidInput("Invalid role".to_string())),
        }
    }
}

/// Response of a successful join.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JoinRoomResponse {
    /// Assigned participant uuid.
    pub user_uuid: Uuid,
    /// Bearer token for the WebSocket connection.
    pub token: String,
}

/// Presence map of a room.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PresenceResponse {
    /// uuid → online flag.
    pub participants: HashMap<Uuid, bool>,
}

/// Body of `POST /rooms/{room_id}/timer`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartTimerRequest {
    /// Instant the timer runs out at (RFC 3339).
    pub end_time: DateTime<Utc>,
}

/// Current timer state of a room.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimerResponse {
    /// Active timer's end, or `null`.
    pub end_time: Option<DateTime<Utc>>,
}

/// Body of `POST /rooms/{room_id}/rounds`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartRoundRequest {
    /// Task under estimation.
    pub task_name: String,
}

/// Body of `PUT /rounds/{round_id}/task`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    /// New task name.
    pub task_name: String,
    /// Nickname of the participant renaming it.
    pub nickname: String,
}

/// One round record.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundResponse {
    /// Record id.
    pub id: i64,
    /// Owning room.
    pub room_id: Uuid,
    /// Task under estimation.
    pub task_name: String,
    /// Whether the round is running.
    pub active: bool,
    /// Final average, once persisted.
    pub average_score: Option<i64>,
}

impl From<RoundRecord> for RoundResponse {
    fn from(record: RoundRecord) -> Self {
        Self {
            id: record.id,
            room_id: *record.room_id.as_uuid(),
            task_name: record.task_name,
            active: record.active,
            average_score: record.average_score,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_accepts_known_roles_only() {
        let mut request = JoinRoomRequest {
            nickname: "alice".to_string(),
            role: "voter".to_string(),
        };
        assert_eq!(request.parsed_role().ok(), Some(Role::Voter));

        request.role = "observer".to_string();
        assert_eq!(request.parsed_role().ok(), Some(Role::Observer));

        request.role = "admin".to_string();
        assert!(matches!(
            request.parsed_role(),
            Err(GatewayError::InvalidInput(_))
        ));
    }
}
