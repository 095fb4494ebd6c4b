//! Publish collaborator: best-effort outbound share summaries.
//!
//! Publishing is strictly fire-and-forget. A failed publish is logged and
//! counted, never surfaced to the user and never allowed to block or fail a
//! submission. The per-game cool-down gate is a debounce against bursts of
//! submissions (paste five share texts in a row), not a correctness
//! mechanism.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::achievement::Unlock;
use crate::calendar::Day;
use crate::game::GameId;

/// What the engine hands to the publish sink after an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSummary {
    pub game: GameId,
    pub day: Day,
    pub current_streak: u32,
    pub best_streak: u32,
    /// Tiers unlocked by the submission, if any.
    pub unlocks: Vec<Unlock>,
}

/// Why a publish failed. The engine only ever logs these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("publish rejected: {0}")]
    Rejected(String),
    #[error("publish transport failed: {0}")]
    Transport(String),
}

/// Outbound publish sink. Implementations own their own timeout and retry
/// policy; errors must come back as [`PublishError`], never as panics.
pub trait Publisher: Send + 'static {
    fn publish(&self, summary: &ShareSummary) -> Result<(), PublishError>;
}

/// Discards every summary. The default for tests and for users who disable
/// publishing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, _summary: &ShareSummary) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Logs each summary at info level. What the CLI wires in; a real frontend
/// would substitute its notification/social sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&self, summary: &ShareSummary) -> Result<(), PublishError> {
        tracing::info!(
            game = %summary.game,
            day = %summary.day,
            current_streak = summary.current_streak,
            unlocks = summary.unlocks.len(),
            "share summary"
        );
        Ok(())
    }
}

/// Per-game cool-down gate. `admit` answers "may this game publish now?" and
/// records the admission time when it says yes.
#[derive(Debug, Clone)]
pub struct PublishGate {
    cooldown_ms: i64,
    last_by_game: HashMap<GameId, i64>,
}

impl PublishGate {
    #[must_use]
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown_ms: i64::try_from(cooldown_secs)
                .unwrap_or(i64::MAX)
                .saturating_mul(1_000),
            last_by_game: HashMap::new(),
        }
    }

    /// Admit at most one publish per game per cool-down window.
    pub fn admit(&mut self, game: &GameId, now_ms: i64) -> bool {
        let admitted = self
            .last_by_game
            .get(game)
            .is_none_or(|last| now_ms.saturating_sub(*last) >= self.cooldown_ms);
        if admitted {
            self.last_by_game.insert(game.clone(), now_ms);
        }
        admitted
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_admits_first_then_debounces() {
        let mut gate = PublishGate::new(10);
        let game = GameId::new("gridword");
        assert!(gate.admit(&game, 1_000));
        assert!(!gate.admit(&game, 5_000));
        assert!(!gate.admit(&game, 10_999));
        assert!(gate.admit(&game, 11_000));
    }

    #[test]
    fn gate_is_per_game() {
        let mut gate = PublishGate::new(10);
        assert!(gate.admit(&GameId::new("gridword"), 1_000));
        assert!(gate.admit(&GameId::new("hexspell"), 1_000));
    }

    #[test]
    fn rejected_admission_does_not_extend_the_window() {
        let mut gate = PublishGate::new(10);
        let game = GameId::new("gridword");
        assert!(gate.admit(&game, 0));
        assert!(!gate.admit(&game, 9_999));
        // The window still measures from the admitted publish at t=0.
        assert!(gate.admit(&game, 10_000));
    }

    #[test]
    fn zero_cooldown_admits_everything() {
        let mut gate = PublishGate::new(0);
        let game = GameId::new("gridword");
        assert!(gate.admit(&game, 5));
        assert!(gate.admit(&game, 5));
    }
}
