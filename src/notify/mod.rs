//! Notification fan-out.
//!
//! [`Notifier`] abstracts "send this event to every connection subscribed to
//! a room's group" so the services emitting events stay transport-agnostic.
//! [`BusNotifier`] publishes onto the in-process [`EventBus`];
//! [`CompositeNotifier`] chains several senders (e.g. local bus plus an
//! external pub/sub bridge) behind the same call.

use std::fmt;
use std::sync::Arc;

use crate::domain::{EventBus, GroupMessage, RoomEvent};

/// Fire-and-forget fan-out of an event to a room's broadcast group.
///
/// Delivery is best-effort: implementations must not block or fail the
/// caller when no subscriber is listening.
pub trait Notifier: fmt::Debug + Send + Sync {
    /// Sends `event` to every connection subscribed to `group`.
    fn send(&self, group: &str, event: RoomEvent);
}

/// [`Notifier`] publishing onto the process-local [`EventBus`].
#[derive(Debug, Clone)]
pub struct BusNotifier {
    bus: EventBus,
}

impl BusNotifier {
    /// Creates a notifier over the given bus.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl Notifier for BusNotifier {
    fn send(&self, group: &str, event: RoomEvent) {
        let delivered = self.bus.publish(GroupMessage {
            group: group.to_string(),
            event,
        });
        tracing::debug!(group, delivered, "event published");
    }
}

/// [`Notifier`] that forwards to every registered sender in order.
#[derive(Debug, Default)]
pub struct CompositeNotifier {
    senders: Vec<Arc<dyn Notifier>>,
}

impl CompositeNotifier {
    /// Creates an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sender to the chain.
    pub fn add_sender(&mut self, sender: Arc<dyn Notifier>) {
        self.senders.push(sender);
    }
}

impl Notifier for CompositeNotifier {
    fn send(&self, group: &str, event: RoomEvent) {
        for sender in &self.senders {
            sender.send(group, event.clone());
        }
    }
}
