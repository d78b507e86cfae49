//! PostgreSQL implementation of the round store.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::RoundRow;
use super::{RoundRecord, RoundStore};
use crate::domain::{RoomId, VoteEntry};
use crate::error::GatewayError;

/// PostgreSQL-backed round store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresRoundStore {
    pool: PgPool,
}

impl PostgresRoundStore {
    /// Creates a round store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn persistence_error(e: sqlx::Error) -> GatewayError {
    GatewayError::Persistence(e.to_string())
}

#[async_trait]
impl RoundStore for PostgresRoundStore {
    async fn create(
        &self,
        room_id: RoomId,
        task_name: &str,
    ) -> Result<RoundRecord, GatewayError> {
        let row = sqlx::query_as::<_, RoundRow>(
            "INSERT INTO rounds (room_id, task_name, active) VALUES ($1, $2, TRUE) \
             RETURNING id, room_id, task_name, active, average_score",
        )
        .bind(room_id.as_uuid())
        .bind(task_name)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence_error)?;

        Ok(row.into())
    }

    async fn active_round(&self, room_id: RoomId) -> Result<Option<RoundRecord>, GatewayError> {
        let row = sqlx::query_as::<_, RoundRow>(
            "SELECT id, room_id, task_name, active, average_score FROM rounds \
             WHERE room_id = $1 AND active ORDER BY id DESC LIMIT 1",
        )
        .bind(room_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_error)?;

        Ok(row.map(RoundRecord::from))
    }

    async fn get(&self, round_id: i64) -> Result<Option<RoundRecord>, GatewayError> {
        let row = sqlx::query_as::<_, RoundRow>(
            "SELECT id, room_id, task_name, active, average_score FROM rounds WHERE id = $1",
        )
        .bind(round_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_error)?;

        Ok(row.map(RoundRecord::from))
    }

    async fn end(&self, round_id: i64) -> Result<(), GatewayError> {
        let result = sqlx::query("UPDATE rounds SET active = FALSE WHERE id = $1")
            .bind(round_id)
            .execute(&self.pool)
            .await
            .map_err(persistence_error)?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::RoundNotFound);
        }
        Ok(())
    }

    async fn reset(&self, round_id: i64) -> Result<(), GatewayError> {
        let result = sqlx::query(
            "UPDATE rounds SET active = TRUE, votes = NULL, average_score = NULL WHERE id = $1",
        )
        .bind(round_id)
        .execute(&self.pool)
        .await
        .map_err(persistence_error)?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::RoundNotFound);
        }
        Ok(())
    }

    async fn update_task_name(
        &self,
        round_id: i64,
        task_name: &str,
    ) -> Result<RoundRecord, GatewayError> {
        let row = sqlx::query_as::<_, RoundRow>(
            "UPDATE rounds SET task_name = $2 WHERE id = $1 \
             RETURNING id, room_id, task_name, active, average_score",
        )
        .bind(round_id)
        .bind(task_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_error)?;

        row.map(RoundRecord::from).ok_or(GatewayError::RoundNotFound)
    }

    async fn persist_results(
        &self,
        round_id: i64,
        votes: &HashMap<Uuid, VoteEntry>,
        average_score: i64,
    ) -> Result<(), GatewayError> {
        let votes_json =
            serde_json::to_value(votes).map_err(|e| GatewayError::Internal(e.to_string()))?;

        let result =
            sqlx::query("UPDATE rounds SET votes = $2, average_score = $3 WHERE id = $1")
                .bind(round_id)
                .bind(votes_json)
                .bind(average_score)
                .execute(&self.pool)
                .await
                .map_err(persistence_error)?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::RoundNotFound);
        }
        Ok(())
    }
}
