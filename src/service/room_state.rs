//! Concurrency-safe participant, vote, and timer state for one room scope.
//!
//! [`RoomStateService`] owns every key under a single [`RoomScope`]. The
//! check-then-set operations (`add_user`, `set_vote`, `clear_room`,
//! `transfer_user`) hold the scope's named lock for their critical section;
//! reads take no lock. Every touched key gets its TTL refreshed so an
//! abandoned room's whole footprint expires together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use super::StoreTuning;
use crate::domain::{Participant, Role, RoomScope, VoteEntry};
use crate::error::GatewayError;
use crate::store::{ExpiringStore, StoreLockGuard};

/// Store handles captured into blocking closures.
#[derive(Debug, Clone)]
struct Shared {
    store: Arc<dyn ExpiringStore>,
    ttl: Duration,
    lock_wait: Duration,
}

/// Atomic participant/vote/timer operations scoped to one room namespace.
#[derive(Debug, Clone)]
pub struct RoomStateService {
    shared: Shared,
    scope: RoomScope,
}

impl RoomStateService {
    /// Creates a service over the given scope.
    #[must_use]
    pub fn new(store: Arc<dyn ExpiringStore>, scope: RoomScope, tuning: StoreTuning) -> Self {
        Self {
            shared: Shared {
                store,
                ttl: tuning.room_ttl,
                lock_wait: tuning.lock_wait,
            },
            scope,
        }
    }

    /// The scope this service operates on.
    #[must_use]
    pub fn scope(&self) -> &RoomScope {
        &self.scope
    }

    async fn run<T, F>(&self, op: F) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        F: FnOnce(&Shared, &RoomScope) -> Result<T, GatewayError> + Send + 'static,
    {
        let shared = self.shared.clone();
        let scope = self.scope.clone();
        tokio::task::spawn_blocking(move || op(&shared, &scope))
            .await
            .map_err(|e| GatewayError::Internal(format!("blocking store task failed: {e}")))?
    }

    /// Inserts a participant into the room.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DuplicateParticipant`] if the uuid is already
    /// present; [`GatewayError::LockTimeout`] if the room lock wait expires.
    pub async fn add_user(
        &self,
        uuid: Uuid,
        role: Role,
        nickname: String,
    ) -> Result<(), GatewayError> {
        self.run(move |shared, scope| {
            let _guard = scope_lock(shared, scope)?;
            insert_participant(shared, scope, uuid, &Participant { role, nickname })
        })
        .await
    }

    /// Reads one participant's record, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn get_user(&self, uuid: Uuid) -> Result<Option<Participant>, GatewayError> {
        self.run(move |shared, scope| read_participant(shared, scope, uuid))
            .await
    }

    /// Returns all participants in the room with their records.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn get_room_users(&self) -> Result<HashMap<Uuid, Participant>, GatewayError> {
        self.run(read_all_participants).await
    }

    /// Returns uuids of participants holding the given role.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn get_users_by_role(&self, role: Role) -> Result<Vec<Uuid>, GatewayError> {
        self.run(move |shared, scope| {
            let users = read_all_participants(shared, scope)?;
            Ok(users
                .into_iter()
                .filter(|(_, participant)| participant.role == role)
                .map(|(uuid, _)| uuid)
                .collect())
        })
        .await
    }

    /// Removes a participant and any vote entry they own. No-op if absent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn remove_user(&self, uuid: Uuid) -> Result<(), GatewayError> {
        self.run(move |shared, scope| remove_participant(shared, scope, uuid))
            .await
    }

    /// Writes a vote for a VOTER participant.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ParticipantNotFound`] if the uuid is absent,
    /// [`GatewayError::NotAllowed`] if the participant is not a voter, and
    /// [`GatewayError::LockTimeout`] if the room lock wait expires.
    pub async fn set_vote(&self, uuid: Uuid, vote: i64) -> Result<(), GatewayError> {
        self.run(move |shared, scope| {
            let _guard = scope_lock(shared, scope)?;
            let participant = read_participant(shared, scope, uuid)?
                .ok_or(GatewayError::ParticipantNotFound)?;
            if participant.role != Role::Voter {
                return Err(GatewayError::NotAllowed);
            }

            let mut votes = read_votes(shared, scope)?;
            votes.insert(
                uuid,
                VoteEntry {
                    nickname: participant.nickname,
                    vote,
                },
            );
            write_json(shared, &scope.votes_key(), &votes)?;
            refresh_scope_ttls(shared, scope)
        })
        .await
    }

    /// Removes only the participant's vote entry, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ParticipantNotFound`] if the participant is
    /// absent. A participant without a vote is a no-op.
    pub async fn remove_user_vote(&self, uuid: Uuid) -> Result<(), GatewayError> {
        self.run(move |shared, scope| {
            if read_participant(shared, scope, uuid)?.is_none() {
                return Err(GatewayError::ParticipantNotFound);
            }
            let mut votes = read_votes(shared, scope)?;
            if votes.remove(&uuid).is_some() {
                write_json(shared, &scope.votes_key(), &votes)?;
            }
            Ok(())
        })
        .await
    }

    /// Returns the room's vote map.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn get_votes(&self) -> Result<HashMap<Uuid, VoteEntry>, GatewayError> {
        self.run(read_votes).await
    }

    /// Clears every vote without touching participants.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn clear_votes(&self) -> Result<(), GatewayError> {
        self.run(move |shared, scope| shared.store.delete(&scope.votes_key()))
            .await
    }

    /// Deletes every participant key, the member set, and the vote map.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::LockTimeout`] if the room lock wait expires.
    pub async fn clear_room(&self) -> Result<(), GatewayError> {
        self.run(move |shared, scope| {
            let _guard = scope_lock(shared, scope)?;
            let members = read_members(shared, scope)?;
            for uuid in &members {
                shared.store.delete(&scope.participant_key(uuid))?;
            }
            shared.store.delete(&scope.members_key())?;
            shared.store.delete(&scope.votes_key())
        })
        .await
    }

    /// Atomically moves a participant (and any pending vote) into `target`.
    ///
    /// Holds the source lock, then the target lock, for the whole move, so
    /// lock-honoring observers never see the participant in both scopes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ParticipantNotFound`] if the source record is
    /// absent, [`GatewayError::DuplicateParticipant`] if the target already
    /// holds the uuid, and [`GatewayError::LockTimeout`] on lock-wait expiry.
    pub async fn transfer_user(&self, uuid: Uuid, target: RoomScope) -> Result<(), GatewayError> {
        self.run(move |shared, scope| {
            let _source_guard = scope_lock(shared, scope)?;
            let participant = read_participant(shared, scope, uuid)?
                .ok_or(GatewayError::ParticipantNotFound)?;
            let mut source_votes = read_votes(shared, scope)?;
            let pending_vote = source_votes.remove(&uuid);

            {
                let _target_guard = scope_lock(shared, &target)?;
                insert_participant(shared, &target, uuid, &participant)?;
                if let Some(vote) = pending_vote {
                    let mut target_votes = read_votes(shared, &target)?;
                    target_votes.insert(uuid, vote);
                    write_json(shared, &target.votes_key(), &target_votes)?;
                }
            }

            write_json(shared, &scope.votes_key(), &source_votes)?;
            remove_participant(shared, scope, uuid)
        })
        .await
    }

    /// Starts the room timer.
    ///
    /// The stored key's TTL equals the remaining duration, so an elapsed
    /// timer disappears on its own.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TimerExists`] if a timer is already active
    /// and [`GatewayError::InvalidEndTime`] if `end_time` is not strictly
    /// in the future.
    pub async fn start_timer(&self, end_time: DateTime<Utc>) -> Result<(), GatewayError> {
        self.run(move |shared, scope| {
            if shared.store.contains(&scope.timer_key())? {
                return Err(GatewayError::TimerExists);
            }
            let now = Utc::now();
            if end_time <= now {
                return Err(GatewayError::InvalidEndTime);
            }
            let remaining = (end_time - now)
                .to_std()
                .map_err(|e| GatewayError::Internal(e.to_string()))?;
            shared.store.set(
                &scope.timer_key(),
                Value::from(end_time.timestamp_millis()),
                remaining,
            )
        })
        .await
    }

    /// Reads the active timer's end, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn get_timer(&self) -> Result<Option<DateTime<Utc>>, GatewayError> {
        self.run(move |shared, scope| {
            let Some(value) = shared.store.get(&scope.timer_key())? else {
                return Ok(None);
            };
            let millis = value
                .as_i64()
                .ok_or_else(|| GatewayError::Internal("malformed timer value".to_string()))?;
            Ok(DateTime::from_timestamp_millis(millis))
        })
        .await
    }

    /// Clears the room timer.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on store failure.
    pub async fn reset_timer(&self) -> Result<(), GatewayError> {
        self.run(move |shared, scope| shared.store.delete(&scope.timer_key()))
            .await
    }
}

fn scope_lock(shared: &Shared, scope: &RoomScope) -> Result<StoreLockGuard, GatewayError> {
    StoreLockGuard::acquire(&shared.store, &scope.root_key(), shared.lock_wait)
}

fn write_json<T: Serialize>(shared: &Shared, key: &str, value: &T) -> Result<(), GatewayError> {
    let value = serde_json::to_value(value).map_err(|e| GatewayError::Internal(e.to_string()))?;
    shared.store.set(key, value, shared.ttl)
}

fn read_json<T: DeserializeOwned>(
    shared: &Shared,
    key: &str,
) -> Result<Option<T>, GatewayError> {
    match shared.store.get(key)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| GatewayError::Internal(e.to_string())),
        None => Ok(None),
    }
}

fn read_participant(
    shared: &Shared,
    scope: &RoomScope,
    uuid: Uuid,
) -> Result<Option<Participant>, GatewayError> {
    read_json(shared, &scope.participant_key(&uuid))
}

fn read_members(shared: &Shared, scope: &RoomScope) -> Result<Vec<Uuid>, GatewayError> {
    Ok(read_json(shared, &scope.members_key())?.unwrap_or_default())
}

fn read_votes(
    shared: &Shared,
    scope: &RoomScope,
) -> Result<HashMap<Uuid, VoteEntry>, GatewayError> {
    Ok(read_json(shared, &scope.votes_key())?.unwrap_or_default())
}

fn read_all_participants(
    shared: &Shared,
    scope: &RoomScope,
) -> Result<HashMap<Uuid, Participant>, GatewayError> {
    let members = read_members(shared, scope)?;
    if members.is_empty() {
        return Ok(HashMap::new());
    }
    let keys: Vec<String> = members
        .iter()
        .map(|uuid| scope.participant_key(uuid))
        .collect();
    let values = shared.store.get_many(&keys)?;

    let mut users = HashMap::with_capacity(members.len());
    for (uuid, value) in members.into_iter().zip(values) {
        if let Some(value) = value {
            let participant: Participant = serde_json::from_value(value)
                .map_err(|e| GatewayError::Internal(e.to_string()))?;
            users.insert(uuid, participant);
        }
    }
    Ok(users)
}

/// Caller must hold the scope lock: this is the check-then-set add.
fn insert_participant(
    shared: &Shared,
    scope: &RoomScope,
    uuid: Uuid,
    participant: &Participant,
) -> Result<(), GatewayError> {
    if shared.store.contains(&scope.participant_key(&uuid))? {
        return Err(GatewayError::DuplicateParticipant);
    }
    write_json(shared, &scope.participant_key(&uuid), participant)?;

    let mut members = read_members(shared, scope)?;
    if !members.contains(&uuid) {
        members.push(uuid);
    }
    write_json(shared, &scope.members_key(), &members)?;
    refresh_scope_ttls(shared, scope)
}

fn remove_participant(
    shared: &Shared,
    scope: &RoomScope,
    uuid: Uuid,
) -> Result<(), GatewayError> {
    let mut votes = read_votes(shared, scope)?;
    if votes.remove(&uuid).is_some() {
        write_json(shared, &scope.votes_key(), &votes)?;
    }

    let mut members = read_members(shared, scope)?;
    if let Some(position) = members.iter().position(|member| *member == uuid) {
        members.remove(position);
        write_json(shared, &scope.members_key(), &members)?;
    }
    shared.store.delete(&scope.participant_key(&uuid))
}

/// Refreshes the TTL of every key belonging to the scope so the whole
/// footprint expires together.
fn refresh_scope_ttls(shared: &Shared, scope: &RoomScope) -> Result<(), GatewayError> {
    let members = read_members(shared, scope)?;
    for uuid in &members {
        shared.store.touch(&scope.participant_key(uuid), shared.ttl)?;
    }
    shared.store.touch(&scope.members_key(), shared.ttl)?;
    shared.store.touch(&scope.votes_key(), shared.ttl)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::RoomId;
    use crate::store::MemoryStore;

    fn service() -> RoomStateService {
        service_for(RoomScope::main(RoomId::new()))
    }

    fn service_for(scope: RoomScope) -> RoomStateService {
        let store: Arc<dyn ExpiringStore> = Arc::new(MemoryStore::new());
        RoomStateService::new(store, scope, StoreTuning::for_tests())
    }

    async fn add_voter(service: &RoomStateService, nickname: &str) -> Uuid {
        let uuid = Uuid::new_v4();
        let added = service
            .add_user(uuid, Role::Voter, nickname.to_string())
            .await;
        assert!(added.is_ok());
        uuid
    }

    #[tokio::test]
    async fn add_user_twice_fails_with_duplicate() {
        let service = service();
        let uuid = add_voter(&service, "alice").await;

        let second = service.add_user(uuid, Role::Voter, "alice".to_string()).await;
        assert!(matches!(second, Err(GatewayError::DuplicateParticipant)));

        let users = service.get_room_users().await.unwrap_or_default();
        assert_eq!(users.len(), 1);
        assert!(users.contains_key(&uuid));
    }

    #[tokio::test]
    async fn get_user_returns_record_without_creating_state() {
        let service = service();
        assert_eq!(service.get_user(Uuid::new_v4()).await.unwrap_or_default(), None);
        assert!(service.get_room_users().await.unwrap_or_default().is_empty());

        let uuid = add_voter(&service, "alice").await;
        let got = service.get_user(uuid).await.unwrap_or_default();
        assert_eq!(
            got,
            Some(Participant {
                role: Role::Voter,
                nickname: "alice".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn get_users_by_role_filters() {
        let service = service();
        let voter = add_voter(&service, "alice").await;
        let observer = Uuid::new_v4();
        let added = service
            .add_user(observer, Role::Observer, "bob".to_string())
            .await;
        assert!(added.is_ok());

        let voters = service.get_users_by_role(Role::Voter).await.unwrap_or_default();
        assert_eq!(voters, vec![voter]);

        let observers = service
            .get_users_by_role(Role::Observer)
            .await
            .unwrap_or_default();
        assert_eq!(observers, vec![observer]);
    }

    #[tokio::test]
    async fn remove_user_is_idempotent_and_drops_vote() {
        let service = service();
        let uuid = add_voter(&service, "alice").await;
        assert!(service.set_vote(uuid, 5).await.is_ok());

        assert!(service.remove_user(uuid).await.is_ok());
        assert!(service.remove_user(uuid).await.is_ok());

        assert_eq!(service.get_user(uuid).await.unwrap_or_default(), None);
        assert!(service.get_votes().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn set_vote_rejects_unknown_and_observer() {
        let service = service();
        let unknown = service.set_vote(Uuid::new_v4(), 3).await;
        assert!(matches!(unknown, Err(GatewayError::ParticipantNotFound)));

        let observer = Uuid::new_v4();
        let added = service
            .add_user(observer, Role::Observer, "bob".to_string())
            .await;
        assert!(added.is_ok());

        let refused = service.set_vote(observer, 3).await;
        assert!(matches!(refused, Err(GatewayError::NotAllowed)));
        assert!(service.get_votes().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn set_vote_overwrites_previous_value() {
        let service = service();
        let uuid = add_voter(&service, "alice").await;

        assert!(service.set_vote(uuid, 3).await.is_ok());
        assert!(service.set_vote(uuid, 8).await.is_ok());

        let votes = service.get_votes().await.unwrap_or_default();
        assert_eq!(votes.len(), 1);
        assert_eq!(
            votes.get(&uuid),
            Some(&VoteEntry {
                nickname: "alice".to_string(),
                vote: 8,
            })
        );
    }

    #[tokio::test]
    async fn remove_user_vote_requires_participant() {
        let service = service();
        let missing = service.remove_user_vote(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(GatewayError::ParticipantNotFound)));

        let uuid = add_voter(&service, "alice").await;
        // No vote yet: still fine.
        assert!(service.remove_user_vote(uuid).await.is_ok());

        assert!(service.set_vote(uuid, 4).await.is_ok());
        assert!(service.remove_user_vote(uuid).await.is_ok());
        assert!(service.get_votes().await.unwrap_or_default().is_empty());
        // Participant survives vote removal.
        assert!(service.get_user(uuid).await.unwrap_or_default().is_some());
    }

    #[tokio::test]
    async fn clear_votes_keeps_participants() {
        let service = service();
        let uuid = add_voter(&service, "alice").await;
        assert!(service.set_vote(uuid, 2).await.is_ok());

        assert!(service.clear_votes().await.is_ok());
        assert!(service.get_votes().await.unwrap_or_default().is_empty());
        assert_eq!(service.get_room_users().await.unwrap_or_default().len(), 1);
    }

    #[tokio::test]
    async fn clear_room_wipes_everything() {
        let service = service();
        let a = add_voter(&service, "alice").await;
        let b = add_voter(&service, "bob").await;
        assert!(service.set_vote(a, 2).await.is_ok());

        assert!(service.clear_room().await.is_ok());

        assert!(service.get_room_users().await.unwrap_or_default().is_empty());
        assert!(service.get_votes().await.unwrap_or_default().is_empty());
        assert_eq!(service.get_user(a).await.unwrap_or_default(), None);
        assert_eq!(service.get_user(b).await.unwrap_or_default(), None);
    }

    #[tokio::test]
    async fn transfer_moves_participant_and_pending_vote() {
        let room = RoomId::new();
        let store: Arc<dyn ExpiringStore> = Arc::new(MemoryStore::new());
        let main = RoomStateService::new(
            Arc::clone(&store),
            RoomScope::main(room),
            StoreTuning::for_tests(),
        );
        let quarantine = RoomStateService::new(
            Arc::clone(&store),
            RoomScope::quarantine(room),
            StoreTuning::for_tests(),
        );

        let uuid = add_voter(&main, "alice").await;
        assert!(main.set_vote(uuid, 7).await.is_ok());

        let moved = main.transfer_user(uuid, quarantine.scope().clone()).await;
        assert!(moved.is_ok());

        // Absent from the source, present (with vote) in the target.
        assert_eq!(main.get_user(uuid).await.unwrap_or_default(), None);
        assert!(main.get_votes().await.unwrap_or_default().is_empty());

        let parked = quarantine.get_user(uuid).await.unwrap_or_default();
        assert_eq!(
            parked,
            Some(Participant {
                role: Role::Voter,
                nickname: "alice".to_string(),
            })
        );
        let votes = quarantine.get_votes().await.unwrap_or_default();
        assert_eq!(
            votes.get(&uuid).map(|entry| entry.vote),
            Some(7)
        );
    }

    #[tokio::test]
    async fn transfer_of_absent_participant_fails() {
        let room = RoomId::new();
        let service = service_for(RoomScope::main(room));
        let result = service
            .transfer_user(Uuid::new_v4(), RoomScope::quarantine(room))
            .await;
        assert!(matches!(result, Err(GatewayError::ParticipantNotFound)));
    }

    #[tokio::test]
    async fn timer_lifecycle() {
        let service = service();

        assert_eq!(service.get_timer().await.unwrap_or_default(), None);

        let past = Utc::now() - chrono::Duration::seconds(5);
        assert!(matches!(
            service.start_timer(past).await,
            Err(GatewayError::InvalidEndTime)
        ));

        let end = Utc::now() + chrono::Duration::seconds(90);
        assert!(service.start_timer(end).await.is_ok());

        let stored = service.get_timer().await.unwrap_or_default();
        assert_eq!(
            stored.map(|t| t.timestamp_millis()),
            Some(end.timestamp_millis())
        );

        let again = Utc::now() + chrono::Duration::seconds(90);
        assert!(matches!(
            service.start_timer(again).await,
            Err(GatewayError::TimerExists)
        ));

        assert!(service.reset_timer().await.is_ok());
        assert_eq!(service.get_timer().await.unwrap_or_default(), None);

        // A reset room can start a fresh timer.
        assert!(service.start_timer(end).await.is_ok());
    }
}
