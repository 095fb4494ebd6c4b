//! Structural validation of completion events.
//!
//! Runs before anything touches the engine: a rejected event is dropped and
//! never enters the log, the duplicate index, or any aggregate. Validation is
//! pure — no clocks, no stores, no logging side effects.
//!
//! The score bound depends on the game's family ([`ScoreRule`]), looked up in
//! the registry; the families are distinct rules, not one parameterized
//! formula.

use thiserror::Error;

use crate::event::CompletionEvent;
use crate::game::{GameSpec, ScoreRule};

/// Why an event was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("event has an empty game identifier")]
    EmptyGameId,

    #[error("event has an empty id")]
    EmptyEventId,

    #[error("event for {game} has empty raw share text")]
    EmptyRawText { game: String },

    #[error("score {score} out of range for {game} ({rule:?}, bound {max_attempts})")]
    ScoreOutOfRange {
        game: String,
        score: u32,
        max_attempts: u32,
        rule: ScoreRule,
    },
}

/// Validate one event. Ok means the event may be offered to the duplicate
/// index; Err names the first rule that failed.
pub fn validate(event: &CompletionEvent) -> Result<(), ValidationError> {
    if event.game.is_empty() {
        return Err(ValidationError::EmptyGameId);
    }
    if event.id.is_empty() {
        return Err(ValidationError::EmptyEventId);
    }
    if event.raw_text.is_empty() {
        return Err(ValidationError::EmptyRawText {
            game: event.game.to_string(),
        });
    }
    if let Some(score) = event.score {
        let rule = GameSpec::score_rule_for(&event.game);
        if !rule.admits(score, event.max_attempts) {
            return Err(ValidationError::ScoreOutOfRange {
                game: event.game.to_string(),
                score,
                max_attempts: event.max_attempts,
                rule,
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
