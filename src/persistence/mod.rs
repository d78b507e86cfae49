//! Durable round records.
//!
//! The gateway touches durable storage only at round boundaries: a record is
//! created when a round starts, finalized with votes and average when every
//! voter has voted, and ended/reset by the round lifecycle endpoints — never
//! per vote. [`RoundStore`] is the collaborator seam; [`PostgresRoundStore`]
//! is the production implementation, [`MemoryRoundStore`] backs tests and
//! single-process development.

pub mod memory;
pub mod models;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{RoomId, VoteEntry};
use crate::error::GatewayError;

pub use memory::MemoryRoundStore;
pub use postgres::PostgresRoundStore;

/// One voting round's durable record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRecord {
    /// Record id.
    pub id: i64,
    /// Room the round belongs to.
    pub room_id: RoomId,
    /// Task under estimation.
    pub task_name: String,
    /// Whether the round is currently running.
    pub active: bool,
    /// Final average score, set when results are persisted.
    pub average_score: Option<i64>,
}

/// Durable store for round records, touched only at round boundaries.
#[async_trait]
pub trait RoundStore: std::fmt::Debug + Send + Sync {
    /// Creates a new active round for the room.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on backend failure.
    async fn create(&self, room_id: RoomId, task_name: &str)
        -> Result<RoundRecord, GatewayError>;

    /// Returns the room's active round, if any.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on backend failure.
    async fn active_round(&self, room_id: RoomId) -> Result<Option<RoundRecord>, GatewayError>;

    /// Reads one round record by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on backend failure.
    async fn get(&self, round_id: i64) -> Result<Option<RoundRecord>, GatewayError>;

    /// Marks the round inactive.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RoundNotFound`] for an unknown id.
    async fn end(&self, round_id: i64) -> Result<(), GatewayError>;

    /// Reactivates the round and drops its stored votes and average.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RoundNotFound`] for an unknown id.
    async fn reset(&self, round_id: i64) -> Result<(), GatewayError>;

    /// Renames the round's task, returning the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RoundNotFound`] for an unknown id.
    async fn update_task_name(
        &self,
        round_id: i64,
        task_name: &str,
    ) -> Result<RoundRecord, GatewayError>;

    /// Stores the final vote map and average score for the round.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RoundNotFound`] for an unknown id.
    async fn persist_results(
        &self,
        round_id: i64,
        votes: &HashMap<Uuid, VoteEntry>,
        average_score: i64,
    ) -> Result<(), GatewayError>;
}
