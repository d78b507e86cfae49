//! Channel registry: ephemeral connection → (participant, room) bindings.
//!
//! A transport-level disconnect carries no application payload, only the
//! connection's channel id. [`ChannelRegistry`] keeps the TTL-bound binding
//! that resolves such an event back to the participant and room for
//! presence bookkeeping, plus the per-room set of open channels.

use std::sync::Arc;

use uuid::Uuid;

use super::StoreTuning;
use crate::domain::{ChannelBinding, RoomId};
use crate::error::GatewayError;
use crate::store::ExpiringStore;

const SESSION_PREFIX: &str = "ws_sessions";

fn channel_key(channel_id: Uuid) -> String {
    format!("{SESSION_PREFIX}:channel:{channel_id}")
}

fn room_channels_key(room_id: RoomId) -> String {
    format!("{SESSION_PREFIX}:room_participants:{room_id}")
}

/// Registry of live WebSocket channels keyed by channel id.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    store: Arc<dyn ExpiringStore>,
    tuning: StoreTuning,
}

impl ChannelRegistry {
    /// Creates a registry over the shared store.
    #[must_use]
    pub fn new(store: Arc<dyn ExpiringStore>, tuning: StoreTuning) -> Self {
        Self { store, tuning }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        F: FnOnce(&Arc<dyn ExpiringStore>, StoreTuning) -> Result<T, GatewayError>
            + Send
            + 'static,
    {
        let store = Arc::clone(&self.store);
        let tuning = self.tuning;
        tokio::task::spawn_blocking(move || op(&store, tuning))
            .await
            .map_err(|e| GatewayError::Internal(format!("blocking store task failed: {e}")))?
    }

    /// Records a channel binding. Idempotent per channel id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn add_participant(
        &self,
        channel_id: Uuid,
        user_uuid: Uuid,
        room_id: RoomId,
    ) -> Result<(), GatewayError> {
        self.run(move |store, tuning| {
            let room_key = room_channels_key(room_id);
            let mut channels: Vec<Uuid> = match store.get(&room_key)? {
                Some(value) => serde_json::from_value(value)
                    .map_err(|e| GatewayError::Internal(e.to_string()))?,
                None => Vec::new(),
            };
            if !channels.contains(&channel_id) {
                channels.push(channel_id);
                let value = serde_json::to_value(&channels)
                    .map_err(|e| GatewayError::Internal(e.to_string()))?;
                store.set(&room_key, value, tuning.channel_ttl)?;
            }

            let binding = ChannelBinding { user_uuid, room_id };
            let value = serde_json::to_value(binding)
                .map_err(|e| GatewayError::Internal(e.to_string()))?;
            store.set(&channel_key(channel_id), value, tuning.channel_ttl)
        })
        .await
    }

    /// Removes a channel binding, returning it so the caller can resolve
    /// the disconnect to `(participant, room)`. `None` if the binding is
    /// unknown or already expired.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn remove_participant(
        &self,
        channel_id: Uuid,
    ) -> Result<Option<ChannelBinding>, GatewayError> {
        self.run(move |store, tuning| {
            let chan_key = channel_key(channel_id);
            let Some(value) = store.get(&chan_key)? else {
                return Ok(None);
            };
            let binding: ChannelBinding = serde_json::from_value(value)
                .map_err(|e| GatewayError::Internal(e.to_string()))?;

            let room_key = room_channels_key(binding.room_id);
            let mut channels: Vec<Uuid> = match store.get(&room_key)? {
                Some(value) => serde_json::from_value(value)
                    .map_err(|e| GatewayError::Internal(e.to_string()))?,
                None => Vec::new(),
            };
            channels.retain(|id| *id != channel_id);
            if channels.is_empty() {
                store.delete(&room_key)?;
            } else {
                let value = serde_json::to_value(&channels)
                    .map_err(|e| GatewayError::Internal(e.to_string()))?;
                store.set(&room_key, value, tuning.channel_ttl)?;
            }

            store.delete(&chan_key)?;
            Ok(Some(binding))
        })
        .await
    }

    /// Looks up a channel's binding without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn get_participant_info(
        &self,
        channel_id: Uuid,
    ) -> Result<Option<ChannelBinding>, GatewayError> {
        self.run(move |store, _| {
            let Some(value) = store.get(&channel_key(channel_id))? else {
                return Ok(None);
            };
            serde_json::from_value(value)
                .map(Some)
                .map_err(|e| GatewayError::Internal(e.to_string()))
        })
        .await
    }

    /// Returns the channel ids currently bound to a room.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn get_room_participants(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<Uuid>, GatewayError> {
        self.run(move |store, _| {
            let Some(value) = store.get(&room_channels_key(room_id))? else {
                return Ok(Vec::new());
            };
            serde_json::from_value(value).map_err(|e| GatewayError::Internal(e.to_string()))
        })
        .await
    }

    /// Refreshes the TTL of a channel binding and its room's channel set.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn refresh_ttl(&self, channel_id: Uuid) -> Result<(), GatewayError> {
        self.run(move |store, tuning| {
            let Some(value) = store.get(&channel_key(channel_id))? else {
                return Ok(());
            };
            let binding: ChannelBinding = serde_json::from_value(value)
                .map_err(|e| GatewayError::Internal(e.to_string()))?;
            store.touch(&channel_key(channel_id), tuning.channel_ttl)?;
            store.touch(&room_channels_key(binding.room_id), tuning.channel_ttl)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn registry() -> ChannelRegistry {
        let store: Arc<dyn ExpiringStore> = Arc::new(MemoryStore::new());
        ChannelRegistry::new(store, StoreTuning::for_tests())
    }

    #[tokio::test]
    async fn add_then_lookup_binding() {
        let registry = registry();
        let channel = Uuid::new_v4();
        let user = Uuid::new_v4();
        let room = RoomId::new();

        assert!(registry.add_participant(channel, user, room).await.is_ok());

        let info = registry.get_participant_info(channel).await.unwrap_or_default();
        assert_eq!(
            info,
            Some(ChannelBinding {
                user_uuid: user,
                room_id: room,
            })
        );
        assert_eq!(
            registry.get_room_participants(room).await.unwrap_or_default(),
            vec![channel]
        );
    }

    #[tokio::test]
    async fn add_is_idempotent_per_channel() {
        let registry = registry();
        let channel = Uuid::new_v4();
        let user = Uuid::new_v4();
        let room = RoomId::new();

        assert!(registry.add_participant(channel, user, room).await.is_ok());
        assert!(registry.add_participant(channel, user, room).await.is_ok());

        assert_eq!(
            registry.get_room_participants(room).await.unwrap_or_default().len(),
            1
        );
    }

    #[tokio::test]
    async fn remove_returns_binding_and_prunes_room_set() {
        let registry = registry();
        let room = RoomId::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        assert!(registry.add_participant(first, Uuid::new_v4(), room).await.is_ok());
        assert!(registry.add_participant(second, Uuid::new_v4(), room).await.is_ok());

        let removed = registry.remove_participant(first).await.unwrap_or_default();
        assert!(removed.is_some());
        assert_eq!(
            registry.get_room_participants(room).await.unwrap_or_default(),
            vec![second]
        );

        // Removing the last channel deletes the room's set entirely.
        let removed = registry.remove_participant(second).await.unwrap_or_default();
        assert!(removed.is_some());
        assert!(registry.get_room_participants(room).await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn remove_of_unknown_channel_is_none() {
        let registry = registry();
        let removed = registry.remove_participant(Uuid::new_v4()).await.unwrap_or_default();
        assert_eq!(removed, None);
    }

    #[tokio::test]
    async fn refresh_ttl_tolerates_unknown_channel() {
        let registry = registry();
        assert!(registry.refresh_ttl(Uuid::new_v4()).await.is_ok());
    }
}
