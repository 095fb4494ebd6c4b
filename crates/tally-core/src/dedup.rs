//! Duplicate index: rejects re-submission of an already-recorded result.
//!
//! The index is a derived cache over the event log, never an independent
//! source of truth. It can be rebuilt from the log at any time, and the
//! engine *does* rebuild it (rather than patch it) whenever its id count
//! disagrees with the log length — partial-update drift is repaired
//! wholesale, the same way a corrupt projection is repaired by replay.
//!
//! Checks run in order and short-circuit on the first hit:
//!
//! 1. exact event-id match (a retry or resubmission),
//! 2. normalized puzzle-key match (`"1,234"` and `"1234"` are the same
//!    puzzle; the difficulty-keyed family composes `number-difficulty`),
//! 3. same-calendar-day fallback, only when the event carries no usable
//!    puzzle number.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::calendar::{Clock, Day};
use crate::event::CompletionEvent;
use crate::game::{GameId, GameSpec, PuzzleKeying};

/// Which check identified the event as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    /// The event id is already in the log.
    Id,
    /// The normalized puzzle key is already recorded for this game.
    PuzzleKey,
    /// No usable puzzle key, and the game already has a result on this
    /// calendar day.
    SameDay,
}

impl fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Id => "already recorded (same id)",
            Self::PuzzleKey => "already recorded (same puzzle)",
            Self::SameDay => "already recorded (same day)",
        };
        write!(f, "{s}")
    }
}

/// Puzzle-number sentinels that mean "no usable number".
const UNKNOWN_SENTINELS: &[&str] = &["unknown", "?", "-"];

/// Fallback difficulty segment when the difficulty-keyed family omits the
/// annotation.
const DIFFICULTY_ANY: &str = "any";

/// Normalize a raw puzzle-number annotation: strip ASCII thousands
/// separators and whitespace. Returns None when nothing usable remains.
fn normalize_puzzle_number(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    if UNKNOWN_SENTINELS
        .iter()
        .any(|s| cleaned.eq_ignore_ascii_case(s))
    {
        return None;
    }
    Some(cleaned)
}

/// Derive the duplicate key for an event, per its game's keying family.
/// None when the event has no usable puzzle number — the same-day fallback
/// applies instead.
#[must_use]
pub fn puzzle_key(event: &CompletionEvent) -> Option<String> {
    let number = normalize_puzzle_number(event.puzzle_annotation()?)?;
    match GameSpec::keying_for(&event.game) {
        PuzzleKeying::Bare => Some(number),
        PuzzleKeying::WithDifficulty => {
            let difficulty = event
                .difficulty_annotation()
                .map_or_else(|| DIFFICULTY_ANY.to_string(), str::to_lowercase);
            Some(format!("{number}-{difficulty}"))
        }
    }
}

/// The duplicate index proper: per-game key sets, per-game day sets, and the
/// global event-id set.
#[derive(Debug, Default, Clone)]
pub struct DuplicateIndex {
    ids: HashSet<String>,
    keys: HashMap<GameId, HashSet<String>>,
    days: HashMap<GameId, HashSet<Day>>,
}

impl DuplicateIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the ordered duplicate checks for `event` (whose calendar day the
    /// caller has already derived via the clock).
    #[must_use]
    pub fn check(&self, event: &CompletionEvent, day: Day) -> Option<DuplicateKind> {
        if self.ids.contains(&event.id) {
            return Some(DuplicateKind::Id);
        }
        match puzzle_key(event) {
            Some(key) => {
                if self
                    .keys
                    .get(&event.game)
                    .is_some_and(|set| set.contains(&key))
                {
                    return Some(DuplicateKind::PuzzleKey);
                }
            }
            None => {
                if self
                    .days
                    .get(&event.game)
                    .is_some_and(|set| set.contains(&day))
                {
                    return Some(DuplicateKind::SameDay);
                }
            }
        }
        None
    }

    /// Record an accepted event. Uses the same key derivation as [`check`].
    ///
    /// [`check`]: DuplicateIndex::check
    pub fn insert(&mut self, event: &CompletionEvent, day: Day) {
        self.ids.insert(event.id.clone());
        if let Some(key) = puzzle_key(event) {
            self.keys.entry(event.game.clone()).or_default().insert(key);
        }
        self.days.entry(event.game.clone()).or_default().insert(day);
    }

    /// Rebuild the whole index from the event log. The only repair path —
    /// drift is never patched entry-by-entry.
    pub fn rebuild(&mut self, events: &[CompletionEvent], clock: &dyn Clock) {
        self.ids.clear();
        self.keys.clear();
        self.days.clear();
        for event in events {
            self.insert(event, clock.day_of(event.played_at_ms));
        }
    }

    /// Number of distinct event ids in the index. The engine compares this
    /// against the log length to detect drift.
    #[must_use]
    pub fn id_count(&self) -> usize {
        self.ids.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
