//! Wire-level room events broadcast to WebSocket clients.
//!
//! Every successful state mutation produces a [`RoomEvent`], published to
//! the room's group through the notifier and serialized to clients as
//! `{"type": "<snake_case tag>", ...}`. Events are self-contained
//! snapshots: clients must tolerate duplicate or out-of-order delivery.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::participant::{Role, VoteEntry};

/// Round status values a client may request via `change_round_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Current round is reset and voting starts over.
    Restart,
    /// Round is finished for good.
    Ended,
    /// Round ends and the room moves on to the next task, keeping
    /// its membership.
    Next,
}

impl RoundStatus {
    /// Parses a wire status string.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "restart" => Some(Self::Restart),
            "ended" => Some(Self::Ended),
            "next" => Some(Self::Next),
            _ => None,
        }
    }
}

/// Event broadcast to every connection in a room's group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// A participant joined the room.
    UserJoined {
        /// Participant uuid.
        user: uuid::Uuid,
        /// Display name.
        nickname: String,
        /// Assigned role.
        role: Role,
    },

    /// A participant was removed by another participant.
    UserKicked {
        /// Removed participant uuid.
        user: uuid::Uuid,
        /// Removed participant's display name.
        nickname: String,
    },

    /// A participant's connection came (back) up.
    UserOnline {
        /// Participant uuid.
        user: uuid::Uuid,
        /// Display name.
        nickname: String,
    },

    /// A participant's connection dropped.
    UserOffline {
        /// Participant uuid.
        user: uuid::Uuid,
        /// Display name.
        nickname: String,
    },

    /// A countdown timer started for the room.
    TimerStarted {
        /// Unix-millisecond timestamp the timer runs out at.
        end_time: i64,
    },

    /// The room timer was cleared.
    TimerReset,

    /// The active round's task was renamed.
    TaskNameChanged {
        /// New task name.
        new_task_name: String,
        /// Nickname of the participant who renamed it.
        user: String,
    },

    /// A new voting round started.
    RoundStarted {
        /// Durable round record id.
        id: i64,
    },

    /// The round's status was changed by a participant.
    RoundChangeStatus {
        /// Requested status, echoed back.
        status: RoundStatus,
    },

    /// A voter submitted a vote (round not yet complete).
    UserVoted {
        /// Voter uuid.
        user: uuid::Uuid,
    },

    /// Every voter has voted: final votes and average score.
    Results {
        /// Vote map keyed by voter uuid.
        votes: HashMap<uuid::Uuid, VoteEntry>,
        /// Ceiling of the vote mean.
        average_score: i64,
    },

    /// Snapshot of which voters have already voted.
    VotedUsersUpdate {
        /// Uuids present in the vote map.
        voted_users: Vec<uuid::Uuid>,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_carry_snake_case_type_tag() {
        let event = RoomEvent::UserVoted {
            user: uuid::Uuid::nil(),
        };
        let value = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(value.get("type"), Some(&json!("user_voted")));

        let event = RoomEvent::VotedUsersUpdate {
            voted_users: vec![],
        };
        let value = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(value.get("type"), Some(&json!("voted_users_update")));
    }

    #[test]
    fn unit_variant_serializes_with_tag_only() {
        let value = serde_json::to_value(RoomEvent::TimerReset).unwrap_or_default();
        assert_eq!(value, json!({"type": "timer_reset"}));
    }

    #[test]
    fn results_payload_shape() {
        let voter = uuid::Uuid::new_v4();
        let mut votes = HashMap::new();
        votes.insert(
            voter,
            VoteEntry {
                nickname: "alice".to_string(),
                vote: 3,
            },
        );
        let value = serde_json::to_value(RoomEvent::Results {
            votes,
            average_score: 3,
        })
        .unwrap_or_default();

        assert_eq!(value.get("type"), Some(&json!("results")));
        assert_eq!(value.get("average_score"), Some(&json!(3)));
        let vote = value
            .get("votes")
            .and_then(|v| v.get(voter.to_string()))
            .cloned();
        assert_eq!(vote, Some(json!({"nickname": "alice", "vote": 3})));
    }

    #[test]
    fn round_status_parses_known_values_only() {
        assert_eq!(RoundStatus::parse("restart"), Some(RoundStatus::Restart));
        assert_eq!(RoundStatus::parse("ended"), Some(RoundStatus::Ended));
        assert_eq!(RoundStatus::parse("next"), Some(RoundStatus::Next));
        assert_eq!(RoundStatus::parse("paused"), None);
    }
}
