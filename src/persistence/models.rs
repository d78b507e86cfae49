//! Row types for the PostgreSQL round store.

use sqlx::FromRow;
use uuid::Uuid;

use super::RoundRecord;
use crate::domain::RoomId;

/// Row of the `rounds` table.
#[derive(Debug, Clone, FromRow)]
pub struct RoundRow {
    /// Record id.
    pub id: i64,
    /// Owning room.
    pub room_id: Uuid,
    /// Task under estimation.
    pub task_name: String,
    /// Whether the round is currently running.
    pub active: bool,
    /// Final average score, if persisted.
    pub average_score: Option<i64>,
}

impl From<RoundRow> for RoundRecord {
    fn from(row: RoundRow) -> Self {
        Self {
            id: row.id,
            room_id: RoomId::from_uuid(row.room_id),
            task_name: row.task_name,
            active: row.active,
            average_score: row.average_score,
        }
    }
}
