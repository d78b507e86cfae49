//! Type-safe room identifier and storage scopes.
//!
//! [`RoomId`] is a newtype wrapper around [`uuid::Uuid`] (v4) providing type
//! safety so that room identifiers cannot be confused with participant or
//! channel UUIDs. [`RoomScope`] names one room-shaped key namespace in the
//! expiring store — either a room proper or its quarantine sibling.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for an estimation room.
///
/// Wraps a UUID v4. Rooms exist in the store only as key-namespace prefixes;
/// the id is also the basis of the room's broadcast group name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(uuid::Uuid);

impl RoomId {
    /// Creates a new random `RoomId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `RoomId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Broadcast group name every connection in this room subscribes to.
    #[must_use]
    pub fn group_name(&self) -> String {
        format!("room_{}", self.0)
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for RoomId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RoomId> for uuid::Uuid {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

/// One room-shaped key namespace in the expiring store.
///
/// A real room and its quarantine sibling share the layout of keys below but
/// have independent lifecycles: the quarantine scope parks the full records
/// of disconnected participants and never owns a timer or a round.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomScope {
    key: String,
}

impl RoomScope {
    /// Scope of the room itself.
    #[must_use]
    pub fn main(room_id: RoomId) -> Self {
        Self {
            key: room_id.to_string(),
        }
    }

    /// Scope parking offline participants of `room_id`, derived
    /// deterministically by suffix.
    #[must_use]
    pub fn quarantine(room_id: RoomId) -> Self {
        Self {
            key: format!("{room_id}:offline"),
        }
    }

    /// Root key of the namespace; doubles as the scope's lock name.
    #[must_use]
    pub fn root_key(&self) -> String {
        format!("room:{}", self.key)
    }

    /// Key holding one participant's record.
    #[must_use]
    pub fn participant_key(&self, uuid: &uuid::Uuid) -> String {
        format!("room:{}:participant:{uuid}", self.key)
    }

    /// Key holding the member uuid set.
    #[must_use]
    pub fn members_key(&self) -> String {
        format!("room:{}:participants", self.key)
    }

    /// Key holding the vote map.
    #[must_use]
    pub fn votes_key(&self) -> String {
        format!("room:{}:votes", self.key)
    }

    /// Key holding the room timer.
    #[must_use]
    pub fn timer_key(&self) -> String {
        format!("room:{}:timer", self.key)
    }
}
