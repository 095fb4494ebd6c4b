//! Persistence collaborator: a keyed document store.
//!
//! The engine persists three collections (events, streaks, achievements)
//! plus the session-mode flag, each as one JSON document under a fixed key.
//! No schema beyond "round-trips the shapes losslessly" is required of a
//! backend, so the trait is a three-method kv contract.
//!
//! Durable writes always go through the background [`queue`]; synchronous
//! `save` calls only happen during `Engine::open`, before the queue owns the
//! store.

pub mod queue;
pub mod sqlite;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use queue::{QueueHealth, SaveQueue};
pub use sqlite::SqliteStore;

/// Store key: the completion event log (ground truth).
pub const KEY_EVENTS: &str = "events";
/// Store key: per-game streak aggregates (derived).
pub const KEY_STREAKS: &str = "streaks";
/// Store key: achievement progress (derived counters + latched unlocks).
pub const KEY_ACHIEVEMENTS: &str = "achievements";
/// Store key: the persisted session-mode flag.
pub const KEY_SESSION: &str = "session_mode";

/// Failure reported by a store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("corrupt value under key {key:?}: {message}")]
    Corrupt { key: String, message: String },
}

/// Keyed document store.
///
/// `Send + 'static` because the background queue moves the store onto its
/// worker thread.
pub trait Store: Send + 'static {
    fn save(&mut self, key: &str, json: &str) -> Result<(), StoreError>;
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Serialize `value` and save it under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    store: &mut dyn Store,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.save(key, &json)
}

/// Load and deserialize the value under `key`. `Ok(None)` when absent;
/// `Err(Corrupt)` when present but unparseable.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn Store,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.load(key)? {
        None => Ok(None),
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

/// In-memory store for tests and guest baselines. Cloning shares the
/// underlying map, so a test can keep a handle while the engine's queue owns
/// the "real" one — and count every write that lands.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
    saves: Arc<AtomicU64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, String>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Total `save` calls that reached this store, across all clones.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Direct read access for assertions.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.map().get(key).cloned()
    }
}

impl Store for MemoryStore {
    fn save(&mut self, key: &str, json: &str) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.map().insert(key.to_string(), json.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map().get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.map().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
