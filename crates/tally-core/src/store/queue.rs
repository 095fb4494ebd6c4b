//! Background write queue: fire-and-forget persistence and publishing.
//!
//! One worker thread consumes jobs from an ordered channel. The ordering is
//! the whole point: writes to the same store key can never reorder, so
//! last-write-wins is safe. Payloads are serialized *at enqueue time* — a
//! job scheduled before a session transition carries the data it was
//! scheduled with, never a view of later state.
//!
//! Failures never propagate. They are logged with their machine code and
//! counted in [`QueueHealth`], which the engine surfaces as a recoverable
//! app-level state; the in-memory aggregates remain the source of truth
//! until the next save lands.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use std::sync::mpsc;

use crate::error::ErrorCode;
use crate::publish::{Publisher, ShareSummary};
use crate::store::Store;

enum Job {
    Save { key: String, json: String },
    Remove { key: String },
    Publish(ShareSummary),
    Shutdown,
}

/// Shared failure counters for the background worker.
#[derive(Debug, Default)]
pub struct QueueHealth {
    failed_saves: AtomicU64,
    failed_publishes: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl QueueHealth {
    #[must_use]
    pub fn failed_saves(&self) -> u64 {
        self.failed_saves.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn failed_publishes(&self) -> u64 {
        self.failed_publishes.load(Ordering::SeqCst)
    }

    /// The most recent failure message, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        match self.last_error.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record_save_failure(&self, message: String) {
        self.failed_saves.fetch_add(1, Ordering::SeqCst);
        self.set_last(message);
    }

    fn record_publish_failure(&self, message: String) {
        self.failed_publishes.fetch_add(1, Ordering::SeqCst);
        self.set_last(message);
    }

    fn set_last(&self, message: String) {
        match self.last_error.lock() {
            Ok(mut guard) => *guard = Some(message),
            Err(poisoned) => *poisoned.into_inner() = Some(message),
        }
    }
}

/// Handle to the background worker. Dropping it detaches the worker (it
/// drains what it has and exits); [`SaveQueue::shutdown`] drains and joins.
#[derive(Debug)]
pub struct SaveQueue {
    tx: mpsc::Sender<Job>,
    handle: Option<JoinHandle<()>>,
    health: Arc<QueueHealth>,
}

impl SaveQueue {
    /// Move `store` and `publisher` onto a fresh worker thread.
    pub fn spawn<S, P>(mut store: S, publisher: P) -> io::Result<Self>
    where
        S: Store,
        P: Publisher,
    {
        let (tx, rx) = mpsc::channel::<Job>();
        let health = Arc::new(QueueHealth::default());
        let worker_health = Arc::clone(&health);

        let handle = thread::Builder::new()
            .name("tally-writer".to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    match job {
                        Job::Save { key, json } => {
                            if let Err(err) = store.save(&key, &json) {
                                tracing::error!(
                                    code = %ErrorCode::StoreSaveFailed,
                                    key = %key,
                                    error = %err,
                                    "background save failed"
                                );
                                worker_health.record_save_failure(err.to_string());
                            }
                        }
                        Job::Remove { key } => {
                            if let Err(err) = store.remove(&key) {
                                tracing::error!(
                                    code = %ErrorCode::StoreSaveFailed,
                                    key = %key,
                                    error = %err,
                                    "background remove failed"
                                );
                                worker_health.record_save_failure(err.to_string());
                            }
                        }
                        Job::Publish(summary) => {
                            if let Err(err) = publisher.publish(&summary) {
                                tracing::warn!(
                                    code = %ErrorCode::PublishFailed,
                                    game = %summary.game,
                                    error = %err,
                                    "share publish failed"
                                );
                                worker_health.record_publish_failure(err.to_string());
                            }
                        }
                        Job::Shutdown => break,
                    }
                }
            })?;

        Ok(Self {
            tx,
            handle: Some(handle),
            health,
        })
    }

    /// Enqueue a save of an already-serialized payload.
    pub fn save(&self, key: &str, json: String) {
        self.send(Job::Save {
            key: key.to_string(),
            json,
        });
    }

    /// Enqueue a key removal.
    pub fn remove(&self, key: &str) {
        self.send(Job::Remove {
            key: key.to_string(),
        });
    }

    /// Enqueue a publish.
    pub fn publish(&self, summary: ShareSummary) {
        self.send(Job::Publish(summary));
    }

    fn send(&self, job: Job) {
        if self.tx.send(job).is_err() {
            // Worker gone (shutdown or panic); in-memory state stays
            // authoritative and the failure is already logged/counted.
            tracing::debug!("background writer unavailable; job dropped");
        }
    }

    /// Shared failure counters.
    #[must_use]
    pub fn health(&self) -> Arc<QueueHealth> {
        Arc::clone(&self.health)
    }

    /// Drain every queued job and join the worker.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(Job::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SaveQueue {
    fn drop(&mut self) {
        // Detached shutdown: the worker drains pending jobs and exits, but
        // nobody waits for it.
        let _ = self.tx.send(Job::Shutdown);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::{NoopPublisher, PublishError};
    use crate::store::{MemoryStore, StoreError};

    #[test]
    fn saves_land_in_submission_order() {
        let store = MemoryStore::new();
        let observer = store.clone();
        let mut queue = SaveQueue::spawn(store, NoopPublisher).expect("spawn");

        queue.save("k", "1".to_string());
        queue.save("k", "2".to_string());
        queue.save("k", "3".to_string());
        queue.shutdown();

        // Ordered channel + single worker: the last submitted write wins.
        assert_eq!(observer.get("k"), Some("3".to_string()));
        assert_eq!(observer.save_count(), 3);
    }

    #[test]
    fn remove_is_ordered_with_saves() {
        let store = MemoryStore::new();
        let observer = store.clone();
        let mut queue = SaveQueue::spawn(store, NoopPublisher).expect("spawn");

        queue.save("k", "1".to_string());
        queue.remove("k");
        queue.shutdown();

        assert_eq!(observer.get("k"), None);
    }

    struct FailingStore;

    impl Store for FailingStore {
        fn save(&mut self, _key: &str, _json: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk full".to_string()))
        }
        fn load(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn save_failures_are_counted_not_propagated() {
        let mut queue = SaveQueue::spawn(FailingStore, NoopPublisher).expect("spawn");
        let health = queue.health();

        queue.save("k", "1".to_string());
        queue.save("k", "2".to_string());
        queue.shutdown();

        assert_eq!(health.failed_saves(), 2);
        assert!(health.last_error().is_some_and(|e| e.contains("disk full")));
    }

    struct FailingPublisher;

    impl Publisher for FailingPublisher {
        fn publish(&self, _summary: &ShareSummary) -> Result<(), PublishError> {
            Err(PublishError::Transport("offline".to_string()))
        }
    }

    #[test]
    fn publish_failures_are_counted_not_propagated() {
        use crate::calendar::Day;
        use crate::game::GameId;

        let mut queue = SaveQueue::spawn(MemoryStore::new(), FailingPublisher).expect("spawn");
        let health = queue.health();

        queue.publish(ShareSummary {
            game: GameId::new("gridword"),
            day: Day::from_num(1),
            current_streak: 1,
            best_streak: 1,
            unlocks: vec![],
        });
        queue.shutdown();

        assert_eq!(health.failed_publishes(), 1);
    }

    #[test]
    fn enqueue_after_shutdown_is_a_quiet_no_op() {
        let store = MemoryStore::new();
        let observer = store.clone();
        let mut queue = SaveQueue::spawn(store, NoopPublisher).expect("spawn");
        queue.shutdown();

        queue.save("k", "late".to_string());
        assert_eq!(observer.get("k"), None);
    }
}
