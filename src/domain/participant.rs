//! Participant, vote, and channel-binding records.
//!
//! These are the value shapes stored under a room scope's keys. The
//! participant record deliberately carries no vote: votes live solely in
//! the per-room vote map, keyed by participant uuid.

use serde::{Deserialize, Serialize};

use super::RoomId;

/// Role of a participant within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Submits votes and counts toward round completion.
    Voter,
    /// Watches the round; may not vote.
    Observer,
}

/// A participant's record within one room scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Role within the room.
    pub role: Role,
    /// Display name.
    pub nickname: String,
}

/// One submitted vote, stored in the room's vote map keyed by
/// participant uuid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEntry {
    /// Voter's display name, denormalized for result payloads.
    pub nickname: String,
    /// Submitted numeric score.
    pub vote: i64,
}

/// Binding from an ephemeral connection identifier back to the
/// participant and room it represents.
///
/// The only way a bare transport-level disconnect (which carries no
/// application payload) can be resolved to presence bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBinding {
    /// Participant the channel belongs to.
    pub user_uuid: uuid::Uuid,
    /// Room the channel is subscribed to.
    pub room_id: RoomId,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Role::Voter).ok(),
            Some("\"voter\"".to_string())
        );
        assert_eq!(
            serde_json::to_string(&Role::Observer).ok(),
            Some("\"observer\"".to_string())
        );
    }

    #[test]
    fn participant_record_has_no_vote_field() {
        let record = Participant {
            role: Role::Voter,
            nickname: "alice".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap_or_default();
        let Some(object) = json.as_object() else {
            panic!("participant must serialize as an object");
        };
        assert!(!object.contains_key("vote"));
        assert_eq!(object.len(), 2);
    }

    #[test]
    fn channel_binding_round_trips() {
        let binding = ChannelBinding {
            user_uuid: uuid::Uuid::new_v4(),
            room_id: RoomId::new(),
        };
        let json = serde_json::to_value(binding).unwrap_or_default();
        let back: Option<ChannelBinding> = serde_json::from_value(json).ok();
        assert_eq!(back, Some(binding));
    }
}
