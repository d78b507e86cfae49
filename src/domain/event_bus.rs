//! Broadcast channel for room events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every state
//! mutation publishes a [`GroupMessage`] through the bus, and all WebSocket
//! connections subscribe and filter by their room's group name.

use tokio::sync::broadcast;

use super::RoomEvent;

/// A [`RoomEvent`] addressed to one room's broadcast group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMessage {
    /// Target group name (see [`super::RoomId::group_name`]).
    pub group: String,
    /// Event payload.
    pub event: RoomEvent,
}

/// Broadcast bus for [`GroupMessage`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest messages are
/// dropped for lagging receivers — delivery is best-effort by design.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GroupMessage>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes a message to all subscribers.
    ///
    /// Returns the number of receivers that received the message.
    /// If there are no active receivers, the message is silently dropped.
    pub fn publish(&self, message: GroupMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future messages.
    ///
    /// Each WebSocket connection should call this once on connect.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GroupMessage> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
