//! In-memory round store for tests and single-process development.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{RoundRecord, RoundStore};
use crate::domain::{RoomId, VoteEntry};
use crate::error::GatewayError;

/// Mutex-guarded map of round records with a monotonically increasing id.
#[derive(Debug, Default)]
pub struct MemoryRoundStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    rounds: HashMap<i64, RoundRecord>,
}

impl MemoryRoundStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoundStore for MemoryRoundStore {
    async fn create(
        &self,
        room_id: RoomId,
        task_name: &str,
    ) -> Result<RoundRecord, GatewayError> {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let record = RoundRecord {
            id: inner.next_id,
            room_id,
            task_name: task_name.to_string(),
            active: true,
            average_score: None,
        };
        inner.rounds.insert(record.id, record.clone());
        Ok(record)
    }

    async fn active_round(&self, room_id: RoomId) -> Result<Option<RoundRecord>, GatewayError> {
        let inner = self.inner.lock();
        Ok(inner
            .rounds
            .values()
            .filter(|record| record.room_id == room_id && record.active)
            .max_by_key(|record| record.id)
            .cloned())
    }

    async fn get(&self, round_id: i64) -> Result<Option<RoundRecord>, GatewayError> {
        Ok(self.inner.lock().rounds.get(&round_id).cloned())
    }

    async fn end(&self, round_id: i64) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        let record = inner
            .rounds
            .get_mut(&round_id)
            .ok_or(GatewayError::RoundNotFound)?;
        record.active = false;
        Ok(())
    }

    async fn reset(&self, round_id: i64) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        let record = inner
            .rounds
            .get_mut(&round_id)
            .ok_or(GatewayError::RoundNotFound)?;
        record.active = true;
        record.average_score = None;
        Ok(())
    }

    async fn update_task_name(
        &self,
        round_id: i64,
        task_name: &str,
    ) -> Result<RoundRecord, GatewayError> {
        let mut inner = self.inner.lock();
        let record = inner
            .rounds
            .get_mut(&round_id)
            .ok_or(GatewayError::RoundNotFound)?;
        record.task_name = task_name.to_string();
        Ok(record.clone())
    }

    async fn persist_results(
        &self,
        round_id: i64,
        _votes: &HashMap<Uuid, VoteEntry>,
        average_score: i64,
    ) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        let record = inner
            .rounds
            .get_mut(&round_id)
            .ok_or(GatewayError::RoundNotFound)?;
        record.average_score = Some(average_score);
        Ok(())
    }
}
