//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::TokenService;
use crate::domain::{EventBus, RoomId, RoomScope};
use crate::notify::{BusNotifier, Notifier};
use crate::persistence::RoundStore;
use crate::service::{
    ChannelRegistry, PresenceTracker, RoomStateService, RoundService, StoreTuning,
};
use crate::store::ExpiringStore;
use crate::ws::actions::ActionDispatcher;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Shared expiring store holding all ephemeral room state.
    pub store: Arc<dyn ExpiringStore>,
    /// Event bus WebSocket connections subscribe to.
    pub event_bus: EventBus,
    /// Fan-out used by every event-emitting service.
    pub notifier: Arc<dyn Notifier>,
    /// Presence tracking and quarantine relocation.
    pub presence: PresenceTracker,
    /// Channel → (participant, room) bindings.
    pub channels: ChannelRegistry,
    /// Round lifecycle orchestration.
    pub rounds: RoundService,
    /// Participant session tokens.
    pub tokens: Arc<TokenService>,
    /// Protocol action registry, populated at startup.
    pub dispatcher: Arc<ActionDispatcher>,
    /// Store timing knobs.
    pub tuning: StoreTuning,
}

impl AppState {
    /// Wires the full service graph over the given store and collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn ExpiringStore>,
        round_store: Arc<dyn RoundStore>,
        tokens: Arc<TokenService>,
        tuning: StoreTuning,
        event_bus_capacity: usize,
    ) -> Self {
        let event_bus = EventBus::new(event_bus_capacity);
        let notifier: Arc<dyn Notifier> = Arc::new(BusNotifier::new(event_bus.clone()));
        let presence = PresenceTracker::new(Arc::clone(&store), Arc::clone(&notifier), tuning);
        let channels = ChannelRegistry::new(Arc::clone(&store), tuning);
        let rounds = RoundService::new(
            Arc::clone(&store),
            round_store,
            presence.clone(),
            Arc::clone(&notifier),
            tuning,
        );

        Self {
            store,
            event_bus,
            notifier,
            presence,
            channels,
            rounds,
            tokens,
            dispatcher: Arc::new(ActionDispatcher::with_default_actions()),
            tuning,
        }
    }

    /// Room state service over the room's main scope.
    #[must_use]
    pub fn room_state(&self, room_id: RoomId) -> RoomStateService {
        RoomStateService::new(
            Arc::clone(&self.store),
            RoomScope::main(room_id),
            self.tuning,
        )
    }
}
