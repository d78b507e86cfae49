//! # estimation-gateway
//!
//! REST API and WebSocket gateway for real-time group-estimation rooms.
//!
//! Participants join a room, submit numeric votes on a shared task, and see
//! live results once everyone has voted. Room state is ephemeral: it lives
//! in a shared expiring key-value store and is garbage-collected by TTL,
//! not by explicit teardown. Durable storage holds only one record per
//! voting round.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler + ActionDispatcher (ws/)
//!     │
//!     ├── RoomStateService / PresenceTracker /
//!     │   ChannelRegistry / RoundService (service/)
//!     ├── Notifier + EventBus (notify/, domain/)
//!     │
//!     ├── ExpiringStore (store/)
//!     └── RoundStore (persistence/)
//! ```
//!
//! Store operations are blocking (they may wait on a shared named lock),
//! so the service layer runs them on the blocking worker pool and awaits
//! the result; connection tasks never block their event loop.

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod service;
pub mod store;
pub mod ws;
