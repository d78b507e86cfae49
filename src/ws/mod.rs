//! WebSocket layer: connection handling, frame routing, protocol actions.
//!
//! The WebSocket endpoint at `/ws/room/{room_id}` authenticates a
//! participant, registers presence, routes inbound action frames through
//! the dispatcher, and relays the room's broadcast events to the client.

pub mod actions;
pub mod connection;
pub mod handler;
pub mod messages;
