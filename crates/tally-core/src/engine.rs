//! The result reconciliation engine: the one owner of all aggregate state.
//!
//! Every mutation funnels through `&mut Engine` — validate, deduplicate,
//! update the streak ledger and achievement book, then hand durable writes
//! and publishes to the background queue. Bulk flows (open, import, delete)
//! never use the incremental paths: they rebuild every projection from the
//! event log, which is the sole source of truth.
//!
//! Session isolation is enforced here: in guest mode the engine operates on
//! a swapped-in blank world, and the persist/publish helpers refuse to
//! enqueue anything. The only write that may ever happen in guest mode is
//! the session flag itself.

use std::mem;

use thiserror::Error;

use crate::achievement::{AchievementBook, AchievementProgress, PersistedProgress, Unlock};
use crate::calendar::Clock;
use crate::dedup::{DuplicateIndex, DuplicateKind};
use crate::error::ErrorCode;
use crate::event::CompletionEvent;
use crate::game::GameId;
use crate::normalize::{completed_days, normalize};
use crate::publish::{PublishGate, Publisher, ShareSummary};
use crate::session::{HostSnapshot, SessionError, SessionMode};
use crate::store::{
    KEY_ACHIEVEMENTS, KEY_EVENTS, KEY_SESSION, KEY_STREAKS, SaveQueue, Store, StoreError,
    load_json, save_json,
};
use crate::streak::{StreakAggregate, StreakLedger};
use crate::validate::{ValidationError, validate};

/// Engine tunables, usually derived from [`crate::config::TrackerConfig`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub publish_cooldown_secs: u64,
    pub publish_enabled: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            publish_cooldown_secs: 10,
            publish_enabled: true,
        }
    }
}

/// Result of offering one event to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Recorded; carries any achievement tiers the event unlocked.
    Accepted { unlocks: Vec<Unlock> },
    /// A normal negative outcome, not an error: the result was already
    /// recorded.
    Duplicate(DuplicateKind),
}

impl SubmitOutcome {
    #[must_use]
    pub const fn accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Report from a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportReport {
    pub added: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub unlocks: Vec<Unlock>,
}

/// Failures that can escape the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("event log unreadable: {0}")]
    CorruptEventLog(String),
    #[error("session: {0}")]
    Session(#[from] SessionError),
    #[error("background writer failed to start: {0}")]
    Worker(String),
}

/// Snapshot of the engine's recoverable error state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineHealth {
    pub mode: SessionMode,
    pub failed_saves: u64,
    pub failed_publishes: u64,
    pub last_background_error: Option<String>,
}

/// The engine proper. Generic over the clock so tests pin time; the store
/// and publisher are moved onto the background worker at open.
pub struct Engine<C: Clock> {
    clock: C,
    options: EngineOptions,
    queue: SaveQueue,
    gate: PublishGate,

    events: Vec<CompletionEvent>,
    dup: DuplicateIndex,
    ledger: StreakLedger,
    achievements: AchievementBook,

    mode: SessionMode,
    snapshot: Option<HostSnapshot>,
}

impl<C: Clock> Engine<C> {
    /// Open the engine: load the event log, recover an interrupted guest
    /// session, rebuild every projection, normalize stale streaks, and start
    /// the background writer.
    ///
    /// An unreadable event log is the one load failure that propagates —
    /// the log is ground truth and nothing can be rebuilt without it.
    /// Unreadable *derived* state is repaired by rebuilding from the log.
    pub fn open<S, P>(
        mut store: S,
        clock: C,
        publisher: P,
        options: EngineOptions,
    ) -> Result<Self, EngineError>
    where
        S: Store,
        P: Publisher,
    {
        let events: Vec<CompletionEvent> = match load_json(&store, KEY_EVENTS) {
            Ok(events) => events.unwrap_or_default(),
            Err(err) => {
                tracing::error!(code = %ErrorCode::StoreLoadFailed, error = %err, "event log unreadable");
                return Err(EngineError::CorruptEventLog(err.to_string()));
            }
        };

        // Interrupted-session recovery: a persisted Guest flag means the
        // process died mid-session. Guest never writes durable state, so
        // forcing Host is lossless.
        match load_json::<SessionMode>(&store, KEY_SESSION) {
            Ok(Some(SessionMode::Guest)) => {
                tracing::warn!(
                    code = %ErrorCode::StaleGuestFlag,
                    "recovering interrupted guest session"
                );
                save_json(&mut store, KEY_SESSION, &SessionMode::Host)?;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(code = %ErrorCode::StoreLoadFailed, error = %err, "session flag unreadable; forcing host");
                save_json(&mut store, KEY_SESSION, &SessionMode::Host)?;
            }
        }

        let achievements = match load_json::<Vec<PersistedProgress>>(&store, KEY_ACHIEVEMENTS) {
            Ok(Some(persisted)) => AchievementBook::from_persisted(persisted),
            Ok(None) => AchievementBook::factory(),
            Err(err) => {
                tracing::warn!(
                    code = %ErrorCode::CorruptAggregates,
                    error = %err,
                    "achievement progress unreadable; starting from factory tiers"
                );
                AchievementBook::factory()
            }
        };

        // Derived streak state is never trusted over the log: rebuild, and
        // only use the persisted copy to notice drift.
        let persisted_streaks = match load_json::<StreakLedger>(&store, KEY_STREAKS) {
            Ok(ledger) => ledger,
            Err(err) => {
                tracing::warn!(
                    code = %ErrorCode::CorruptAggregates,
                    error = %err,
                    "streak aggregates unreadable; rebuilding from the event log"
                );
                None
            }
        };

        let queue = SaveQueue::spawn(store, publisher)
            .map_err(|e| EngineError::Worker(e.to_string()))?;

        let mut engine = Self {
            gate: PublishGate::new(options.publish_cooldown_secs),
            clock,
            options,
            queue,
            events,
            dup: DuplicateIndex::new(),
            ledger: StreakLedger::with_known_games(),
            achievements,
            mode: SessionMode::Host,
            snapshot: None,
        };

        engine.rebuild_projections();
        engine.normalize();
        // Drift check on the normalization-stable fields only: totals never
        // change outside a play, so a persisted copy that disagrees means a
        // save was lost or the store was edited. The rebuilt values win
        // either way.
        if let Some(previous) = persisted_streaks {
            for aggregate in engine.ledger.iter() {
                let stale = previous.get(&aggregate.game).is_some_and(|p| {
                    p.total_played != aggregate.total_played
                        || p.total_completed != aggregate.total_completed
                });
                if stale {
                    tracing::warn!(
                        code = %ErrorCode::CorruptAggregates,
                        game = %aggregate.game,
                        "persisted streak totals disagree with the event log; using rebuilt values"
                    );
                }
            }
        }
        engine.persist_aggregates();
        Ok(engine)
    }

    // -- incremental path ---------------------------------------------------

    /// Offer one completion event to the engine.
    ///
    /// `Err` means the event was malformed and dropped. `Ok(Duplicate(_))`
    /// is the normal negative outcome. `Ok(Accepted { .. })` means the log
    /// and every aggregate were updated, saves were queued (host mode), and
    /// a share summary may have been queued.
    pub fn submit(&mut self, event: CompletionEvent) -> Result<SubmitOutcome, ValidationError> {
        validate(&event)?;
        let day = self.clock.day_of(event.played_at_ms);

        // Drift guard: a duplicate index that disagrees with the log is
        // rebuilt wholesale before it is consulted.
        if self.dup.id_count() != self.events.len() {
            tracing::warn!(
                code = %ErrorCode::DuplicateIndexDrift,
                index = self.dup.id_count(),
                log = self.events.len(),
                "duplicate index drift; rebuilding from the event log"
            );
            self.dup.rebuild(&self.events, &self.clock);
        }

        if let Some(kind) = self.dup.check(&event, day) {
            tracing::debug!(game = %event.game, kind = %kind, "duplicate submission rejected");
            return Ok(SubmitOutcome::Duplicate(kind));
        }

        self.dup.insert(&event, day);
        self.ledger.entry(&event.game).apply(&event, day);
        let unlocks = self.achievements.apply_one(&event, day, &self.ledger);
        self.events.push(event.clone());

        self.persist_all();
        self.maybe_publish(&event.game, &unlocks);

        Ok(SubmitOutcome::Accepted { unlocks })
    }

    // -- bulk paths ---------------------------------------------------------

    /// Rebuild every projection from the event log, normalize, persist.
    /// Returns tiers newly unlocked by the replay.
    pub fn rebuild_all(&mut self) -> Vec<Unlock> {
        let unlocks = self.rebuild_projections();
        self.normalize();
        self.persist_all();
        unlocks
    }

    /// Delete one event by id. Deletion invalidates every incremental
    /// assumption, so the log is replayed afterwards.
    pub fn delete_event(&mut self, id: &str) -> bool {
        let Some(pos) = self.events.iter().position(|e| e.id == id) else {
            return false;
        };
        let removed = self.events.remove(pos);
        tracing::info!(game = %removed.game, id = %removed.id, "event deleted; replaying log");
        self.rebuild_all();
        true
    }

    /// Bulk-import events (e.g. from an export file). Invalid events are
    /// skipped with a warning, duplicates are counted, and the whole log is
    /// replayed at the end.
    pub fn import(&mut self, incoming: Vec<CompletionEvent>) -> ImportReport {
        let mut report = ImportReport::default();

        for event in incoming {
            if let Err(err) = validate(&event) {
                tracing::warn!(code = %ErrorCode::ValidationFailed, error = %err, "skipping invalid import row");
                report.invalid += 1;
                continue;
            }
            let day = self.clock.day_of(event.played_at_ms);
            if self.dup.check(&event, day).is_some() {
                report.duplicates += 1;
                continue;
            }
            self.dup.insert(&event, day);
            self.events.push(event);
            report.added += 1;
        }

        if report.added > 0 {
            report.unlocks = self.rebuild_all();
        }
        report
    }

    /// Break streaks that went stale while the app was closed. Persists only
    /// when something actually broke.
    pub fn normalize(&mut self) -> Vec<GameId> {
        let completed = completed_days(&self.events, &self.clock);
        let broken = normalize(&mut self.ledger, &completed, self.clock.today());
        if !broken.is_empty() {
            self.persist_aggregates();
        }
        broken
    }

    // -- session isolation --------------------------------------------------

    /// Enter guest mode: snapshot the host world and swap in a blank one.
    /// No durable write happens beyond the session flag.
    pub fn enter_guest(&mut self) -> Result<(), SessionError> {
        if self.mode == SessionMode::Guest {
            return Err(SessionError::AlreadyGuest);
        }

        self.snapshot = Some(HostSnapshot {
            events: mem::take(&mut self.events),
            ledger: mem::replace(&mut self.ledger, StreakLedger::with_known_games()),
            achievements: mem::take(&mut self.achievements),
        });
        self.dup = DuplicateIndex::new();
        self.mode = SessionMode::Guest;
        self.persist_mode();
        tracing::info!("entered guest session");
        Ok(())
    }

    /// Exit guest mode, optionally exporting the guest's events as a JSON
    /// blob for hand-off. Every guest mutation is discarded; the host world
    /// is restored verbatim.
    pub fn exit_guest(&mut self, export: bool) -> Result<Option<String>, SessionError> {
        if self.mode != SessionMode::Guest {
            return Err(SessionError::NotGuest);
        }

        let exported = if export {
            match serde_json::to_string_pretty(&self.events) {
                Ok(blob) => Some(blob),
                Err(err) => {
                    tracing::error!(error = %err, "guest export serialization failed");
                    None
                }
            }
        } else {
            None
        };

        match self.snapshot.take() {
            Some(snapshot) => {
                self.events = snapshot.events;
                self.ledger = snapshot.ledger;
                self.achievements = snapshot.achievements;
            }
            None => {
                // Can only happen if a caller fabricated the mode; fall back
                // to an empty host world rather than keep guest data.
                self.events = Vec::new();
                self.ledger = StreakLedger::with_known_games();
                self.achievements = AchievementBook::factory();
            }
        }
        self.dup.rebuild(&self.events, &self.clock);
        self.mode = SessionMode::Host;
        self.persist_mode();
        tracing::info!(exported = exported.is_some(), "exited guest session");
        Ok(exported)
    }

    // -- queries ------------------------------------------------------------

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn streak(&self, game: &GameId) -> Option<&StreakAggregate> {
        self.ledger.get(game)
    }

    #[must_use]
    pub fn streaks(&self) -> &StreakLedger {
        &self.ledger
    }

    #[must_use]
    pub fn achievements(&self) -> &[AchievementProgress] {
        self.achievements.progress()
    }

    #[must_use]
    pub fn events(&self) -> &[CompletionEvent] {
        &self.events
    }

    /// The full event log as pretty JSON, for export.
    pub fn export_events(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.events)
    }

    /// Recoverable error state: background failures never surface anywhere
    /// else.
    #[must_use]
    pub fn health(&self) -> EngineHealth {
        let health = self.queue.health();
        EngineHealth {
            mode: self.mode,
            failed_saves: health.failed_saves(),
            failed_publishes: health.failed_publishes(),
            last_background_error: health.last_error(),
        }
    }

    /// Drain the background queue and join its worker. Dropping the engine
    /// without calling this detaches the worker instead.
    pub fn shutdown(mut self) {
        self.queue.shutdown();
    }

    // -- internals ----------------------------------------------------------

    /// Replay the event log into fresh projections. Shared by open, import,
    /// and delete. Returns newly unlocked tiers.
    fn rebuild_projections(&mut self) -> Vec<Unlock> {
        self.ledger = StreakLedger::rebuild_all(&self.events, &self.clock);
        self.dup.rebuild(&self.events, &self.clock);
        for aggregate in self.ledger.iter() {
            if !aggregate.is_consistent() {
                tracing::warn!(
                    code = %ErrorCode::StreakInvariantViolation,
                    game = %aggregate.game,
                    "rebuilt aggregate violates invariants"
                );
            }
        }
        self.achievements.recompute(&self.events, &self.clock)
    }

    fn persist_all(&self) {
        if self.mode == SessionMode::Guest {
            return;
        }
        self.enqueue_save(KEY_EVENTS, serde_json::to_string(&self.events));
        self.persist_aggregates();
    }

    fn persist_aggregates(&self) {
        if self.mode == SessionMode::Guest {
            return;
        }
        self.enqueue_save(KEY_STREAKS, serde_json::to_string(&self.ledger));
        self.enqueue_save(
            KEY_ACHIEVEMENTS,
            serde_json::to_string(&self.achievements.to_persisted()),
        );
    }

    /// The session flag is the single write allowed in either mode: it is
    /// what makes an interrupted guest session detectable.
    fn persist_mode(&self) {
        self.enqueue_save(KEY_SESSION, serde_json::to_string(&self.mode));
    }

    fn enqueue_save(&self, key: &str, json: Result<String, serde_json::Error>) {
        match json {
            Ok(json) => self.queue.save(key, json),
            Err(err) => {
                tracing::error!(code = %ErrorCode::StoreSaveFailed, key = %key, error = %err, "serialization failed; save skipped");
            }
        }
    }

    fn maybe_publish(&mut self, game: &GameId, unlocks: &[Unlock]) {
        if self.mode == SessionMode::Guest || !self.options.publish_enabled {
            return;
        }
        let now = self.clock.now_ms();
        if !self.gate.admit(game, now) {
            tracing::debug!(game = %game, "publish debounced");
            return;
        }
        let Some(aggregate) = self.ledger.get(game) else {
            return;
        };
        self.queue.publish(ShareSummary {
            game: game.clone(),
            day: self.clock.day_of(now),
            current_streak: aggregate.current_streak,
            best_streak: aggregate.best_streak,
            unlocks: unlocks.to_vec(),
        });
    }
}
