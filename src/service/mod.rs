//! Service layer: room state, presence, channel registry, round lifecycle.
//!
//! Services wrap the expiring store behind typed, room-scoped operations.
//! Every store access is blocking (it may wait on a shared named lock), so
//! each operation runs on the blocking worker pool via
//! `tokio::task::spawn_blocking` and is awaited by the caller — connection
//! tasks never block their event loop on store work.

pub mod channels;
pub mod presence;
pub mod room_state;
pub mod rounds;

use std::time::Duration;

pub use channels::ChannelRegistry;
pub use presence::PresenceTracker;
pub use room_state::RoomStateService;
pub use rounds::RoundService;

/// Store timing knobs shared by the services.
#[derive(Debug, Clone, Copy)]
pub struct StoreTuning {
    /// TTL applied to room-scoped keys, refreshed on every touch.
    pub room_ttl: Duration,
    /// TTL applied to channel bindings.
    pub channel_ttl: Duration,
    /// Bounded wait for a named store lock.
    pub lock_wait: Duration,
}

impl StoreTuning {
    /// Tuning with short waits, for tests.
    #[must_use]
    pub const fn for_tests() -> Self {
        Self {
            room_ttl: Duration::from_secs(300),
            channel_ttl: Duration::from_secs(300),
            lock_wait: Duration::from_millis(500),
        }
    }
}
