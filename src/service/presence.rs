//! Online/offline presence tracking with quarantine relocation.
//!
//! A dropped connection must not silently delete an in-progress vote, but a
//! disconnected participant should stop counting toward "everyone voted".
//! [`PresenceTracker`] achieves both by moving the participant's full record
//! (vote included) into the room's quarantine scope while they are offline,
//! and back on reconnect. The tracker owns its [`RoomStateService`] handles;
//! the state service never calls back into presence.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::{RoomStateService, StoreTuning};
use crate::domain::{RoomEvent, RoomId, RoomScope};
use crate::error::GatewayError;
use crate::notify::Notifier;
use crate::store::{ExpiringStore, StoreLockGuard};

const PRESENCE_PREFIX: &str = "online";

/// Tracks per-participant online status and relocates offline participants
/// into the room's quarantine namespace.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    store: Arc<dyn ExpiringStore>,
    notifier: Arc<dyn Notifier>,
    tuning: StoreTuning,
}

impl PresenceTracker {
    /// Creates a tracker over the shared store.
    #[must_use]
    pub fn new(
        store: Arc<dyn ExpiringStore>,
        notifier: Arc<dyn Notifier>,
        tuning: StoreTuning,
    ) -> Self {
        Self {
            store,
            notifier,
            tuning,
        }
    }

    fn room_state(&self, scope: RoomScope) -> RoomStateService {
        RoomStateService::new(Arc::clone(&self.store), scope, self.tuning)
    }

    fn presence_key(room_id: RoomId) -> String {
        format!("{PRESENCE_PREFIX}:room_{room_id}")
    }

    /// Parks the participant in quarantine and broadcasts `user_offline`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ParticipantNotFound`] if the participant is
    /// not in the main room (e.g. already kicked).
    pub async fn set_user_offline(
        &self,
        user_uuid: Uuid,
        room_id: RoomId,
    ) -> Result<(), GatewayError> {
        let main = self.room_state(RoomScope::main(room_id));
        let participant = main
            .get_user(user_uuid)
            .await?
            .ok_or(GatewayError::ParticipantNotFound)?;

        main.transfer_user(user_uuid, RoomScope::quarantine(room_id))
            .await?;
        self.set_status(user_uuid, room_id, false).await?;

        self.notifier.send(
            &room_id.group_name(),
            RoomEvent::UserOffline {
                user: user_uuid,
                nickname: participant.nickname,
            },
        );
        tracing::info!(%room_id, %user_uuid, "participant went offline");
        Ok(())
    }

    /// Restores the participant from quarantine (if parked there), marks
    /// them online, and broadcasts `user_online`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::LockTimeout`] if the quarantine transfer
    /// cannot take the room locks in time.
    pub async fn set_user_online(
        &self,
        user_uuid: Uuid,
        room_id: RoomId,
    ) -> Result<(), GatewayError> {
        let main = self.room_state(RoomScope::main(room_id));
        let quarantine = self.room_state(RoomScope::quarantine(room_id));

        if quarantine.get_user(user_uuid).await?.is_some() {
            quarantine
                .transfer_user(user_uuid, RoomScope::main(room_id))
                .await?;
        }
        self.set_status(user_uuid, room_id, true).await?;

        let nickname = main
            .get_user(user_uuid)
            .await?
            .map(|participant| participant.nickname)
            .unwrap_or_default();
        self.notifier.send(
            &room_id.group_name(),
            RoomEvent::UserOnline {
                user: user_uuid,
                nickname,
            },
        );
        tracing::info!(%room_id, %user_uuid, "participant came online");
        Ok(())
    }

    /// Wipes the quarantine namespace and resets the presence map.
    ///
    /// Invoked when a round ends or restarts so stale offline participants
    /// do not leak into the next round.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::LockTimeout`] on lock-wait expiry.
    pub async fn clean_room_offline_participants(
        &self,
        room_id: RoomId,
    ) -> Result<(), GatewayError> {
        self.room_state(RoomScope::quarantine(room_id))
            .clear_room()
            .await?;

        let store = Arc::clone(&self.store);
        let ttl = self.tuning.room_ttl;
        let lock_wait = self.tuning.lock_wait;
        let key = Self::presence_key(room_id);
        tokio::task::spawn_blocking(move || {
            let _guard = StoreLockGuard::acquire(&store, &key, lock_wait)?;
            store.set(&key, serde_json::json!({}), ttl)
        })
        .await
        .map_err(|e| GatewayError::Internal(format!("blocking store task failed: {e}")))?
    }

    /// Returns the room's presence map (uuid → online flag).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn get_room_participants(
        &self,
        room_id: RoomId,
    ) -> Result<HashMap<Uuid, bool>, GatewayError> {
        let store = Arc::clone(&self.store);
        let key = Self::presence_key(room_id);
        tokio::task::spawn_blocking(move || {
            let Some(value) = store.get(&key)? else {
                return Ok(HashMap::new());
            };
            serde_json::from_value(value).map_err(|e| GatewayError::Internal(e.to_string()))
        })
        .await
        .map_err(|e| GatewayError::Internal(format!("blocking store task failed: {e}")))?
    }

    /// Refreshes the presence map's TTL, if the map exists.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn refresh_ttl(&self, room_id: RoomId) -> Result<(), GatewayError> {
        let store = Arc::clone(&self.store);
        let ttl = self.tuning.room_ttl;
        let key = Self::presence_key(room_id);
        tokio::task::spawn_blocking(move || store.touch(&key, ttl).map(|_| ()))
            .await
            .map_err(|e| GatewayError::Internal(format!("blocking store task failed: {e}")))?
    }

    async fn set_status(
        &self,
        user_uuid: Uuid,
        room_id: RoomId,
        online: bool,
    ) -> Result<(), GatewayError> {
        let store = Arc::clone(&self.store);
        let ttl = self.tuning.room_ttl;
        let key = Self::presence_key(room_id);
        tokio::task::spawn_blocking(move || {
            let mut participants: HashMap<Uuid, bool> = match store.get(&key)? {
                Some(value) => serde_json::from_value(value)
                    .map_err(|e| GatewayError::Internal(e.to_string()))?,
                None => HashMap::new(),
            };
            participants.insert(user_uuid, online);
            let value = serde_json::to_value(participants)
                .map_err(|e| GatewayError::Internal(e.to_string()))?;
            store.set(&key, value, ttl)
        })
        .await
        .map_err(|e| GatewayError::Internal(format!("blocking store task failed: {e}")))?
    }
}
