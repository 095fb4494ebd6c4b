//! Streak ledger: one aggregate per game, derived from the event log.
//!
//! Two ways to arrive at an aggregate:
//!
//! - [`StreakAggregate::apply`] — incremental, one new event at a time.
//!   Assumes chronological arrival; bulk flows must not use it.
//! - [`rebuild`] — sort the game's events by date and fold `apply` from an
//!   empty aggregate. This replay is the authoritative definition;
//!   incremental update is an optimization that must agree with it for
//!   chronologically ordered input (property-tested in `tests/`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calendar::{Clock, Day};
use crate::event::CompletionEvent;
use crate::game::{GameId, KNOWN_GAMES};

/// Per-game streak and totals aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakAggregate {
    pub game: GameId,
    /// Length in days of the running streak; 0 when broken.
    pub current_streak: u32,
    /// Longest streak ever observed.
    pub best_streak: u32,
    /// Every recorded play, completed or not.
    pub total_played: u32,
    /// Completed plays only.
    pub total_completed: u32,
    /// Calendar day of the most recent play (any outcome).
    pub last_played_day: Option<Day>,
    /// First day of the running streak; None exactly when the streak is 0.
    pub streak_start_day: Option<Day>,
}

impl StreakAggregate {
    /// The empty aggregate every game starts from.
    #[must_use]
    pub const fn empty(game: GameId) -> Self {
        Self {
            game,
            current_streak: 0,
            best_streak: 0,
            total_played: 0,
            total_completed: 0,
            last_played_day: None,
            streak_start_day: None,
        }
    }

    /// Fold one event into the aggregate. `day` is the event's calendar day
    /// as derived by the engine's clock.
    pub fn apply(&mut self, event: &CompletionEvent, day: Day) {
        self.total_played += 1;

        if event.completed {
            self.total_completed += 1;

            if self.current_streak == 0 {
                self.current_streak = 1;
                self.streak_start_day = Some(day);
            } else {
                // current_streak > 0 implies a prior play exists.
                let gap = self.last_played_day.map_or(i64::MAX, |last| last.days_until(day));
                if gap == 1 {
                    self.current_streak += 1;
                } else if gap != 0 {
                    // Either a missed day or out-of-order arrival: the run
                    // restarts here.
                    self.current_streak = 1;
                    self.streak_start_day = Some(day);
                }
            }
            self.best_streak = self.best_streak.max(self.current_streak);
        } else {
            // A recorded failure breaks the run but still counts as a play.
            self.current_streak = 0;
            self.streak_start_day = None;
        }

        self.last_played_day = Some(day);
    }

    /// Break the running streak, leaving totals, best streak, and the
    /// last-played day untouched.
    pub fn break_streak(&mut self) {
        self.current_streak = 0;
        self.streak_start_day = None;
    }

    /// Whether the aggregate satisfies its structural invariants.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.total_completed <= self.total_played
            && (self.current_streak > 0) == self.streak_start_day.is_some()
    }
}

/// Replay all of one game's events into a fresh aggregate.
///
/// Events are sorted by ascending timestamp first (stable, so same-instant
/// events keep log order) — bulk imports arrive in whatever order the export
/// file had.
#[must_use]
pub fn rebuild(game: &GameId, events: &[&CompletionEvent], clock: &dyn Clock) -> StreakAggregate {
    let mut ordered: Vec<&CompletionEvent> = events.to_vec();
    ordered.sort_by_key(|e| e.played_at_ms);

    let mut aggregate = StreakAggregate::empty(game.clone());
    for event in ordered {
        aggregate.apply(event, clock.day_of(event.played_at_ms));
    }
    aggregate
}

/// The full set of per-game aggregates.
///
/// A `BTreeMap` keyed by game id so serialization order is deterministic.
/// Aggregates are created empty for every known game and reset, never
/// removed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreakLedger {
    by_game: BTreeMap<GameId, StreakAggregate>,
}

impl StreakLedger {
    /// An empty ledger seeded with an empty aggregate for every game in the
    /// registry.
    #[must_use]
    pub fn with_known_games() -> Self {
        let mut ledger = Self::default();
        for spec in KNOWN_GAMES {
            let id = GameId::new(spec.id);
            ledger
                .by_game
                .insert(id.clone(), StreakAggregate::empty(id));
        }
        ledger
    }

    #[must_use]
    pub fn get(&self, game: &GameId) -> Option<&StreakAggregate> {
        self.by_game.get(game)
    }

    /// The aggregate for `game`, created empty on first touch (games outside
    /// the registry still get tracked).
    pub fn entry(&mut self, game: &GameId) -> &mut StreakAggregate {
        self.by_game
            .entry(game.clone())
            .or_insert_with(|| StreakAggregate::empty(game.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreakAggregate> {
        self.by_game.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StreakAggregate> {
        self.by_game.values_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_game.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_game.is_empty()
    }

    /// Rebuild every aggregate from the event log: known games keep a row
    /// even with no events; unknown games appearing in the log get rows too.
    #[must_use]
    pub fn rebuild_all(events: &[CompletionEvent], clock: &dyn Clock) -> Self {
        let mut per_game: BTreeMap<GameId, Vec<&CompletionEvent>> = BTreeMap::new();
        for event in events {
            per_game.entry(event.game.clone()).or_default().push(event);
        }

        let mut ledger = Self::with_known_games();
        for (game, game_events) in &per_game {
            let aggregate = rebuild(game, game_events, clock);
            ledger.by_game.insert(game.clone(), aggregate);
        }
        ledger
    }
}

impl<'a> IntoIterator for &'a StreakLedger {
    type Item = &'a StreakAggregate;
    type IntoIter = std::collections::btree_map::Values<'a, GameId, StreakAggregate>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_game.values()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
