//! Round lifecycle orchestration.
//!
//! [`RoundService`] coordinates the durable round store with the ephemeral
//! room state: starting a round, ending it (with or without clearing the
//! room), restarting it, renaming its task, and computing completion and
//! the final average. Durable writes happen only at these boundaries,
//! never per vote.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::{PresenceTracker, RoomStateService, StoreTuning};
use crate::domain::{Role, RoomEvent, RoomId, RoomScope, RoundStatus, VoteEntry};
use crate::error::GatewayError;
use crate::notify::Notifier;
use crate::persistence::{RoundRecord, RoundStore};
use crate::store::ExpiringStore;

/// `true` when every voter in the room has a vote entry.
///
/// A room with zero voters never finishes: the round would otherwise
/// complete (and divide by zero) the moment it starts.
#[must_use]
pub fn is_round_finished(voter_count: usize, vote_count: usize) -> bool {
    voter_count == vote_count && voter_count > 0
}

/// Ceiling of the vote mean; `0` for an empty map.
///
/// Mirrors ceiling division via negated floor division so negative sums
/// round toward positive infinity as well.
#[must_use]
pub fn average_score(votes: &HashMap<Uuid, VoteEntry>) -> i64 {
    let count = i64::try_from(votes.len()).unwrap_or(i64::MAX);
    if count == 0 {
        return 0;
    }
    let sum: i64 = votes.values().map(|entry| entry.vote).sum();
    -((-sum).div_euclid(count))
}

/// Orchestrates the round lifecycle across store, presence, and notifier.
#[derive(Debug, Clone)]
pub struct RoundService {
    store: Arc<dyn ExpiringStore>,
    rounds: Arc<dyn RoundStore>,
    presence: PresenceTracker,
    notifier: Arc<dyn Notifier>,
    tuning: StoreTuning,
}

impl RoundService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ExpiringStore>,
        rounds: Arc<dyn RoundStore>,
        presence: PresenceTracker,
        notifier: Arc<dyn Notifier>,
        tuning: StoreTuning,
    ) -> Self {
        Self {
            store,
            rounds,
            presence,
            notifier,
            tuning,
        }
    }

    /// The underlying round store.
    #[must_use]
    pub fn round_store(&self) -> &Arc<dyn RoundStore> {
        &self.rounds
    }

    fn room_state(&self, room_id: RoomId) -> RoomStateService {
        RoomStateService::new(Arc::clone(&self.store), RoomScope::main(room_id), self.tuning)
    }

    /// Starts a new round for the room and broadcasts `round_started`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if the room already has an
    /// active round.
    pub async fn start_round(
        &self,
        room_id: RoomId,
        task_name: &str,
    ) -> Result<RoundRecord, GatewayError> {
        if self.rounds.active_round(room_id).await?.is_some() {
            return Err(GatewayError::InvalidInput(
                "Room round already exists".to_string(),
            ));
        }

        let record = self.rounds.create(room_id, task_name).await?;
        tracing::info!(%room_id, round = record.id, task_name, "round started");
        self.notifier.send(
            &room_id.group_name(),
            RoomEvent::RoundStarted { id: record.id },
        );
        Ok(record)
    }

    /// Ends a round for good: clears the room's ephemeral state and the
    /// quarantine leftovers.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RoundNotFound`] if the round is unknown or
    /// already ended.
    pub async fn end_round(&self, round_id: i64) -> Result<RoundRecord, GatewayError> {
        let record = self.active_record(round_id).await?;
        self.rounds.end(round_id).await?;
        self.room_state(record.room_id).clear_room().await?;
        self.presence
            .clean_room_offline_participants(record.room_id)
            .await?;
        tracing::info!(room_id = %record.room_id, round = round_id, "round ended");
        Ok(record)
    }

    /// Ends the round but keeps the room's membership, dropping only votes.
    /// Used by the `next` status change.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RoundNotFound`] if the round is unknown or
    /// already ended.
    pub async fn end_round_keep_members(&self, round_id: i64) -> Result<(), GatewayError> {
        let record = self.active_record(round_id).await?;
        self.rounds.end(round_id).await?;
        self.room_state(record.room_id).clear_votes().await?;
        tracing::info!(room_id = %record.room_id, round = round_id, "round ended, room kept");
        Ok(())
    }

    /// Resets the round: votes dropped, offline leftovers cleaned, round
    /// active again. Broadcasts `round_change_status{restart}`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RoundNotFound`] for an unknown id.
    pub async fn restart_round(&self, round_id: i64) -> Result<RoundRecord, GatewayError> {
        let record = self
            .rounds
            .get(round_id)
            .await?
            .ok_or(GatewayError::RoundNotFound)?;

        self.rounds.reset(round_id).await?;
        self.room_state(record.room_id).clear_votes().await?;
        self.presence
            .clean_room_offline_participants(record.room_id)
            .await?;

        tracing::info!(room_id = %record.room_id, round = round_id, "round restarted");
        self.notifier.send(
            &record.room_id.group_name(),
            RoomEvent::RoundChangeStatus {
                status: RoundStatus::Restart,
            },
        );
        Ok(record)
    }

    /// Renames the round's task and broadcasts `task_name_changed`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RoundNotFound`] for an unknown id.
    pub async fn update_task_name(
        &self,
        round_id: i64,
        task_name: &str,
        changed_by: &str,
    ) -> Result<RoundRecord, GatewayError> {
        let record = self.rounds.update_task_name(round_id, task_name).await?;
        self.notifier.send(
            &record.room_id.group_name(),
            RoomEvent::TaskNameChanged {
                new_task_name: task_name.to_string(),
                user: changed_by.to_string(),
            },
        );
        Ok(record)
    }

    /// Completion check for the room's active round: every voter currently
    /// in the main scope has a vote entry. Quarantined (offline) voters are
    /// out of the main scope and therefore out of the denominator.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn check_round_finish(&self, room_id: RoomId) -> Result<bool, GatewayError> {
        let room = self.room_state(room_id);
        let voters = room.get_users_by_role(Role::Voter).await?;
        let votes = room.get_votes().await?;
        Ok(is_round_finished(voters.len(), votes.len()))
    }

    /// Persists final votes and the ceiling average to the durable record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RoundNotFound`] for an unknown id.
    pub async fn finalize_results(
        &self,
        round_id: i64,
        votes: &HashMap<Uuid, VoteEntry>,
    ) -> Result<i64, GatewayError> {
        let average = average_score(votes);
        self.rounds.persist_results(round_id, votes, average).await?;
        tracing::info!(round = round_id, average, "round results persisted");
        Ok(average)
    }

    async fn active_record(&self, round_id: i64) -> Result<RoundRecord, GatewayError> {
        let record = self
            .rounds
            .get(round_id)
            .await?
            .ok_or(GatewayError::RoundNotFound)?;
        if !record.active {
            return Err(GatewayError::RoundNotFound);
        }
        Ok(record)
    }
}
