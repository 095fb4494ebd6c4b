//! Tiered achievement progress, derived from the full event history.
//!
//! Each category is a monotonic aggregation over the log; tiers are ascending
//! thresholds that *latch*: the unlock timestamp is set by the first crossing
//! and never cleared, even when a later recompute (after deletions) lands on
//! a lower counter. The recomputable counter and the latch are deliberately
//! separate fields so replay can overwrite one and only ever set the other.
//!
//! Recompute is a left-to-right fold over events in ascending date order —
//! not a "final value" calculation — because `days_active` and
//! `daily_variety` depend on how events group into days, and because latch
//! timestamps belong to the crossing event, not to the recompute run.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calendar::{Clock, Day};
use crate::error::ErrorCode;
use crate::event::CompletionEvent;
use crate::game::{GameId, GameSpec};
use crate::streak::StreakLedger;

/// The fixed achievement categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    /// Count of recorded plays across all games.
    GamesPlayed,
    /// Count of completed plays at the family-perfect score.
    PerfectSolves,
    /// Count of distinct calendar days with at least one play.
    DaysActive,
    /// Maximum current-streak value ever observed across games.
    LongestStreak,
    /// Maximum count of distinct games played within one calendar day.
    DailyVariety,
}

impl AchievementKind {
    pub const ALL: [Self; 5] = [
        Self::GamesPlayed,
        Self::PerfectSolves,
        Self::DaysActive,
        Self::LongestStreak,
        Self::DailyVariety,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GamesPlayed => "games_played",
            Self::PerfectSolves => "perfect_solves",
            Self::DaysActive => "days_active",
            Self::LongestStreak => "longest_streak",
            Self::DailyVariety => "daily_variety",
        }
    }

    /// Parse a persisted kind string. None for kinds this build does not
    /// know — the caller skips them instead of failing the load.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }

    /// Factory tier thresholds, ascending.
    #[must_use]
    pub const fn default_thresholds(self) -> &'static [u32] {
        match self {
            Self::GamesPlayed => &[1, 10, 50, 100, 250, 500, 1000],
            Self::PerfectSolves => &[1, 5, 25, 100],
            Self::DaysActive => &[7, 30, 100, 365],
            Self::LongestStreak => &[3, 7, 30, 100, 365],
            Self::DailyVariety => &[2, 4, 6],
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::GamesPlayed => 0,
            Self::PerfectSolves => 1,
            Self::DaysActive => 2,
            Self::LongestStreak => 3,
            Self::DailyVariety => 4,
        }
    }
}

impl fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unlockable threshold within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementTier {
    pub threshold: u32,
    /// Set once, on the first crossing; never cleared by recompute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at_ms: Option<i64>,
}

/// Progress for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementProgress {
    pub kind: AchievementKind,
    /// Recomputable counter; may go down after deletions.
    pub progress: u32,
    /// Ascending tiers with latched unlock timestamps.
    pub tiers: Vec<AchievementTier>,
}

impl AchievementProgress {
    fn factory(kind: AchievementKind) -> Self {
        Self {
            kind,
            progress: 0,
            tiers: kind
                .default_thresholds()
                .iter()
                .map(|&threshold| AchievementTier {
                    threshold,
                    unlocked_at_ms: None,
                })
                .collect(),
        }
    }

    /// Number of tiers already unlocked.
    #[must_use]
    pub fn unlocked_count(&self) -> usize {
        self.tiers
            .iter()
            .filter(|t| t.unlocked_at_ms.is_some())
            .count()
    }
}

/// Emitted exactly once, the first time a tier's threshold is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unlock {
    pub kind: AchievementKind,
    pub threshold: u32,
    pub at_ms: i64,
}

/// Persisted shape: kinds as plain strings so state written by newer builds
/// (or legacy categories) loads without failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedProgress {
    pub kind: String,
    pub progress: u32,
    pub tiers: Vec<AchievementTier>,
}

/// All category progress plus the transient accumulators the incremental
/// path needs. Accumulators are derived state: they are rebuilt by
/// [`AchievementBook::recompute`], never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementBook {
    progress: Vec<AchievementProgress>,
    days_active: HashSet<Day>,
    variety_by_day: HashMap<Day, HashSet<GameId>>,
}

impl Default for AchievementBook {
    fn default() -> Self {
        Self::factory()
    }
}

impl AchievementBook {
    /// A fresh book with factory tiers and zero progress.
    #[must_use]
    pub fn factory() -> Self {
        Self {
            progress: AchievementKind::ALL
                .into_iter()
                .map(AchievementProgress::factory)
                .collect(),
            days_active: HashSet::new(),
            variety_by_day: HashMap::new(),
        }
    }

    /// Restore a book from persisted state. Unknown kinds are skipped with a
    /// warning; known kinds missing from the input keep factory defaults.
    #[must_use]
    pub fn from_persisted(persisted: Vec<PersistedProgress>) -> Self {
        let mut book = Self::factory();
        for entry in persisted {
            match AchievementKind::parse(&entry.kind) {
                Some(kind) => {
                    let slot = &mut book.progress[kind.index()];
                    slot.progress = entry.progress;
                    if !entry.tiers.is_empty() {
                        slot.tiers = entry.tiers;
                    }
                }
                None => {
                    tracing::warn!(
                        code = %ErrorCode::UnknownAchievementKind,
                        kind = %entry.kind,
                        "skipping unknown achievement category"
                    );
                }
            }
        }
        book
    }

    /// The persisted shape of this book.
    #[must_use]
    pub fn to_persisted(&self) -> Vec<PersistedProgress> {
        self.progress
            .iter()
            .map(|p| PersistedProgress {
                kind: p.kind.as_str().to_string(),
                progress: p.progress,
                tiers: p.tiers.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn progress(&self) -> &[AchievementProgress] {
        &self.progress
    }

    #[must_use]
    pub fn get(&self, kind: AchievementKind) -> &AchievementProgress {
        &self.progress[kind.index()]
    }

    /// Advance every category for one accepted event and return any tiers
    /// that crossed their threshold for the first time.
    ///
    /// `ledger` must already reflect the event (the streak update runs
    /// first), so `longest_streak` observes the post-event value.
    pub fn apply_one(
        &mut self,
        event: &CompletionEvent,
        day: Day,
        ledger: &StreakLedger,
    ) -> Vec<Unlock> {
        self.bump(AchievementKind::GamesPlayed, 1);

        if event.completed && GameSpec::score_rule_for(&event.game).is_perfect(event.score) {
            self.bump(AchievementKind::PerfectSolves, 1);
        }

        self.days_active.insert(day);
        let days = u32::try_from(self.days_active.len()).unwrap_or(u32::MAX);
        self.raise(AchievementKind::DaysActive, days);

        if let Some(aggregate) = ledger.get(&event.game) {
            self.raise(AchievementKind::LongestStreak, aggregate.current_streak);
        }

        let variety = self.variety_by_day.entry(day).or_default();
        variety.insert(event.game.clone());
        let variety = u32::try_from(variety.len()).unwrap_or(u32::MAX);
        self.raise(AchievementKind::DailyVariety, variety);

        self.collect_unlocks(event.played_at_ms)
    }

    /// Full recompute: reset every counter (never a latch), then fold the
    /// log in ascending date order, replaying streaks in a scratch ledger so
    /// `longest_streak` sees every intermediate value.
    ///
    /// Returns tiers newly crossed by the replay (e.g. after an import).
    pub fn recompute(&mut self, events: &[CompletionEvent], clock: &dyn Clock) -> Vec<Unlock> {
        for p in &mut self.progress {
            p.progress = 0;
        }
        self.days_active.clear();
        self.variety_by_day.clear();

        let mut ordered: Vec<&CompletionEvent> = events.iter().collect();
        ordered.sort_by_key(|e| e.played_at_ms);

        let mut scratch = StreakLedger::default();
        let mut unlocks = Vec::new();
        for event in ordered {
            let day = clock.day_of(event.played_at_ms);
            scratch.entry(&event.game).apply(event, day);
            unlocks.extend(self.apply_one(event, day, &scratch));
        }
        unlocks
    }

    fn bump(&mut self, kind: AchievementKind, by: u32) {
        let slot = &mut self.progress[kind.index()];
        slot.progress = slot.progress.saturating_add(by);
    }

    fn raise(&mut self, kind: AchievementKind, to: u32) {
        let slot = &mut self.progress[kind.index()];
        slot.progress = slot.progress.max(to);
    }

    fn collect_unlocks(&mut self, at_ms: i64) -> Vec<Unlock> {
        let mut unlocks = Vec::new();
        for p in &mut self.progress {
            for tier in &mut p.tiers {
                if tier.unlocked_at_ms.is_none() && p.progress >= tier.threshold {
                    tier.unlocked_at_ms = Some(at_ms);
                    unlocks.push(Unlock {
                        kind: p.kind,
                        threshold: tier.threshold,
                        at_ms,
                    });
                }
            }
        }
        unlocks
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedClock;
    use std::collections::BTreeMap;

    fn event(game: &str, day: i32, completed: bool, score: Option<u32>) -> CompletionEvent {
        CompletionEvent {
            id: format!("blake3:{game}-{day}-{score:?}"),
            game: GameId::new(game),
            played_at_ms: FixedClock::noon_ms(day),
            score,
            max_attempts: 6,
            completed,
            annotations: BTreeMap::new(),
            raw_text: "raw".to_string(),
        }
    }

    fn replayed(events: &[CompletionEvent]) -> (AchievementBook, Vec<Unlock>) {
        let mut book = AchievementBook::factory();
        let unlocks = book.recompute(events, &FixedClock::at_day(50));
        (book, unlocks)
    }

    #[test]
    fn first_play_unlocks_first_games_played_tier() {
        let (book, unlocks) = replayed(&[event("gridword", 1, true, Some(3))]);
        assert_eq!(book.get(AchievementKind::GamesPlayed).progress, 1);
        assert!(unlocks
            .iter()
            .any(|u| u.kind == AchievementKind::GamesPlayed && u.threshold == 1));
    }

    #[test]
    fn unlock_is_emitted_once() {
        let mut book = AchievementBook::factory();
        let first = book.apply_one(
            &event("gridword", 1, true, Some(3)),
            Day::from_num(1),
            &StreakLedger::default(),
        );
        let second = book.apply_one(
            &event("gridword", 2, true, Some(3)),
            Day::from_num(2),
            &StreakLedger::default(),
        );
        assert!(first.iter().any(|u| u.threshold == 1));
        assert!(!second.iter().any(|u| u.threshold == 1));
    }

    #[test]
    fn perfect_solves_follow_family_rules() {
        let events = vec![
            event("gridword", 1, true, Some(1)),  // guess family: perfect
            event("gridword", 2, true, Some(2)),  // not perfect
            event("sudoku", 3, true, Some(0)),    // hint family: perfect
            event("minicross", 4, true, Some(0)), // timed: never perfect
            event("gridword", 5, false, Some(1)), // failed: never perfect
        ];
        let (book, _) = replayed(&events);
        assert_eq!(book.get(AchievementKind::PerfectSolves).progress, 2);
    }

    #[test]
    fn days_active_counts_distinct_days() {
        let events = vec![
            event("gridword", 1, true, None),
            event("hexspell", 1, true, None),
            event("gridword", 2, false, None),
        ];
        let (book, _) = replayed(&events);
        assert_eq!(book.get(AchievementKind::DaysActive).progress, 2);
    }

    #[test]
    fn daily_variety_is_max_distinct_games_in_one_day() {
        let events = vec![
            event("gridword", 1, true, None),
            event("hexspell", 1, true, None),
            event("gridword", 1, true, None), // same game again: no change
            event("sudoku", 2, true, None),
        ];
        let (book, _) = replayed(&events);
        assert_eq!(book.get(AchievementKind::DailyVariety).progress, 2);
    }

    #[test]
    fn longest_streak_observes_intermediate_values() {
        // A 3-day run later broken: final current streak is 1, but the
        // category saw 3 during replay.
        let events = vec![
            event("gridword", 1, true, None),
            event("gridword", 2, true, None),
            event("gridword", 3, true, None),
            event("gridword", 7, true, None),
        ];
        let (book, _) = replayed(&events);
        assert_eq!(book.get(AchievementKind::LongestStreak).progress, 3);
    }

    #[test]
    fn latch_survives_lower_recompute() {
        let ten: Vec<CompletionEvent> = (1..=10)
            .map(|d| event("gridword", d, true, Some(3)))
            .collect();
        let mut book = AchievementBook::factory();
        book.recompute(&ten, &FixedClock::at_day(50));
        assert!(book.get(AchievementKind::GamesPlayed).tiers[1]
            .unlocked_at_ms
            .is_some());

        // Deletion shrinks the log to 7 events; the tier stays unlocked.
        let seven = &ten[..7];
        let unlocks = book.recompute(seven, &FixedClock::at_day(50));
        let games = book.get(AchievementKind::GamesPlayed);
        assert_eq!(games.progress, 7);
        assert!(games.tiers[1].unlocked_at_ms.is_some());
        assert!(!unlocks.iter().any(|u| u.threshold == 10));
    }

    #[test]
    fn recompute_preserves_original_unlock_timestamps() {
        let events: Vec<CompletionEvent> =
            (1..=3).map(|d| event("gridword", d, true, None)).collect();
        let mut book = AchievementBook::factory();
        book.recompute(&events, &FixedClock::at_day(50));
        let stamped = book.get(AchievementKind::GamesPlayed).tiers[0].unlocked_at_ms;
        assert_eq!(stamped, Some(FixedClock::noon_ms(1)));

        // Replaying again must not restamp.
        book.recompute(&events, &FixedClock::at_day(90));
        assert_eq!(
            book.get(AchievementKind::GamesPlayed).tiers[0].unlocked_at_ms,
            stamped
        );
    }

    #[test]
    fn unknown_persisted_kind_is_skipped() {
        let persisted = vec![
            PersistedProgress {
                kind: "games_played".to_string(),
                progress: 42,
                tiers: vec![AchievementTier {
                    threshold: 1,
                    unlocked_at_ms: Some(123),
                }],
            },
            PersistedProgress {
                kind: "galaxy_brain".to_string(),
                progress: 9,
                tiers: vec![],
            },
        ];
        let book = AchievementBook::from_persisted(persisted);
        assert_eq!(book.get(AchievementKind::GamesPlayed).progress, 42);
        // The unknown kind neither crashed the load nor displaced a slot.
        assert_eq!(book.progress().len(), AchievementKind::ALL.len());
    }

    #[test]
    fn persist_roundtrip() {
        let (book, _) = replayed(&[event("gridword", 1, true, Some(1))]);
        let json = serde_json::to_string(&book.to_persisted()).expect("serialize");
        let back: Vec<PersistedProgress> = serde_json::from_str(&json).expect("deserialize");
        let restored = AchievementBook::from_persisted(back);
        assert_eq!(restored.progress(), book.progress());
    }

    #[test]
    fn thresholds_ascend() {
        for kind in AchievementKind::ALL {
            let t = kind.default_thresholds();
            assert!(t.windows(2).all(|w| w[0] < w[1]), "{kind} tiers not ascending");
        }
    }
}
