//! Shared expiring key-value store seam.
//!
//! The gateway keeps all ephemeral room state (participants, votes, presence,
//! channel bindings, timers) in a key-value store with per-key TTL and a
//! named mutual-exclusion primitive, shared by every server process. This
//! module defines the [`ExpiringStore`] trait consumed by the service layer,
//! the [`StoreLockGuard`] that scopes named-lock ownership, and the
//! in-process [`MemoryStore`] implementation.
//!
//! All trait methods are blocking: callers in async context must run them on
//! the blocking worker pool (`tokio::task::spawn_blocking`) and await the
//! result. The service layer owns that boundary.

pub mod lock;
pub mod memory;

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::error::GatewayError;

pub use lock::StoreLockGuard;
pub use memory::MemoryStore;

/// Key-value store with per-key time-to-live and named locks.
///
/// Values cross the seam as [`serde_json::Value`]; the service layer owns
/// (de)serialization to typed structs. A distributed backend (e.g. Redis)
/// implements the same surface; [`MemoryStore`] covers tests and
/// single-process deployments.
pub trait ExpiringStore: fmt::Debug + Send + Sync {
    /// Reads the value at `key`, or `None` if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on backend failure.
    fn get(&self, key: &str) -> Result<Option<Value>, GatewayError>;

    /// Reads several keys in one round-trip, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on backend failure.
    fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Value>>, GatewayError>;

    /// Writes `value` at `key` with the given TTL, replacing any prior value.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on backend failure.
    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), GatewayError>;

    /// Deletes `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on backend failure.
    fn delete(&self, key: &str) -> Result<(), GatewayError>;

    /// Resets the TTL of `key`. Returns `false` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on backend failure.
    fn touch(&self, key: &str, ttl: Duration) -> Result<bool, GatewayError>;

    /// Returns `true` if `key` exists and has not expired.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on backend failure.
    fn contains(&self, key: &str) -> Result<bool, GatewayError>;

    /// Blocks until the named lock is acquired, up to `wait`.
    ///
    /// Prefer [`StoreLockGuard::acquire`], which pairs this with a
    /// guaranteed release on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::LockTimeout`] when `wait` elapses first.
    fn acquire_lock(&self, name: &str, wait: Duration) -> Result<(), GatewayError>;

    /// Releases the named lock. Releasing an unheld lock is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] on backend failure.
    fn release_lock(&self, name: &str) -> Result<(), GatewayError>;
}
