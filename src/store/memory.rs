//! In-process implementation of the expiring store.
//!
//! Backs single-process deployments and the test suite. Expiry is lazy:
//! a key past its deadline is treated as absent and dropped on the next
//! read that touches it. Named locks are plain in-process mutual exclusion
//! (a condvar-guarded set of held names); a multi-process deployment needs
//! a store whose locks are shared, which is exactly the seam
//! [`super::ExpiringStore`] leaves open.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::Value;

use super::ExpiringStore;
use crate::error::GatewayError;

/// A stored value with its expiry deadline.
#[derive(Debug, Clone)]
struct StoredEntry {
    value: Value,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory [`ExpiringStore`] with lazy TTL expiry and condvar-based
/// named locks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
    held_locks: Mutex<HashSet<String>>,
    lock_freed: Condvar,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys. Diagnostics only.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.len()
    }

    /// Returns `true` if the store holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExpiringStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, GatewayError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Value>>, GatewayError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            match entries.get(key) {
                Some(entry) if entry.is_expired(now) => {
                    entries.remove(key);
                    values.push(None);
                }
                Some(entry) => values.push(Some(entry.value.clone())),
                None => values.push(None),
            }
        }
        Ok(values)
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), GatewayError> {
        let entry = StoredEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), GatewayError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn touch(&self, key: &str, ttl: Duration) -> Result<bool, GatewayError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(false)
            }
            Some(entry) => {
                entry.expires_at = now + ttl;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn contains(&self, key: &str) -> Result<bool, GatewayError> {
        Ok(self.get(key)?.is_some())
    }

    fn acquire_lock(&self, name: &str, wait: Duration) -> Result<(), GatewayError> {
        let deadline = Instant::now() + wait;
        let mut held = self.held_locks.lock();
        while held.contains(name) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(GatewayError::LockTimeout(name.to_string()));
            }
            let _ = self.lock_freed.wait_for(&mut held, remaining);
        }
        held.insert(name.to_string());
        Ok(())
    }

    fn release_lock(&self, name: &str) -> Result<(), GatewayError> {
        let mut held = self.held_locks.lock();
        if held.remove(name) {
            drop(held);
            self.lock_freed.notify_all();
        }
        Ok(())
    }
}
