//! Game registry: score-rule families and duplicate-key composition.
//!
//! Per-game behavior differences (how a score is bounded, how a puzzle key is
//! derived) are modeled as closed enums selected by a fixed lookup table —
//! never as string-equality chains scattered through the engine. Adding a
//! game means adding one [`GameSpec`] row; the compiler checks every match
//! over the family tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a daily puzzle game (stable lowercase slug).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Wrap a raw identifier. Identifiers are compared case-sensitively;
    /// producers are expected to use lowercase slugs.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How a game's numeric score is bounded.
///
/// These are family groupings, not one formula: an elapsed-time score has no
/// upper bound, a guess count must use at least one guess, a hint count may
/// legitimately be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRule {
    /// Guess-based games: `1 <= score <= max_attempts`.
    Guesses,
    /// Elapsed-time games: any non-negative score.
    Timed,
    /// Hint/backtrack-count games: `0 <= score <= max_attempts`.
    Hints,
    /// Score and attempt bound are the same derived quantity:
    /// `score == max_attempts`.
    StepBound,
}

impl ScoreRule {
    /// Whether `score` is acceptable under this rule given the event's
    /// attempt bound. `max_attempts` is unsigned, so the `>= 0` half of the
    /// timed/hint rules is structural.
    #[must_use]
    pub const fn admits(self, score: u32, max_attempts: u32) -> bool {
        match self {
            Self::Guesses => score >= 1 && score <= max_attempts,
            Self::Timed => true,
            Self::Hints => score <= max_attempts,
            Self::StepBound => score == max_attempts,
        }
    }

    /// Whether a completed event with this score counts as a perfect solve
    /// for the `perfect_solves` achievement category.
    #[must_use]
    pub const fn is_perfect(self, score: Option<u32>) -> bool {
        match self {
            Self::Guesses => matches!(score, Some(1)),
            Self::Hints => matches!(score, Some(0)),
            Self::Timed | Self::StepBound => false,
        }
    }
}

/// How an event's duplicate key is composed from its annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleKeying {
    /// The normalized puzzle number alone identifies the day's puzzle.
    Bare,
    /// The game publishes several sub-puzzles per calendar puzzle,
    /// distinguished by a difficulty annotation; the key is
    /// `"<number>-<difficulty>"`.
    WithDifficulty,
}

/// One row of the game registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub score_rule: ScoreRule,
    pub keying: PuzzleKeying,
}

/// The known-game table. Order is display order; lookups are by id.
pub const KNOWN_GAMES: &[GameSpec] = &[
    GameSpec {
        id: "gridword",
        name: "Gridword",
        score_rule: ScoreRule::Guesses,
        keying: PuzzleKeying::Bare,
    },
    GameSpec {
        id: "hexspell",
        name: "Hexspell",
        score_rule: ScoreRule::Guesses,
        keying: PuzzleKeying::Bare,
    },
    GameSpec {
        id: "quartet",
        name: "Quartet",
        score_rule: ScoreRule::Hints,
        keying: PuzzleKeying::Bare,
    },
    GameSpec {
        id: "minicross",
        name: "Minicross",
        score_rule: ScoreRule::Timed,
        keying: PuzzleKeying::Bare,
    },
    GameSpec {
        id: "speedsum",
        name: "Speedsum",
        score_rule: ScoreRule::Timed,
        keying: PuzzleKeying::Bare,
    },
    GameSpec {
        id: "sudoku",
        name: "Sudoku",
        score_rule: ScoreRule::Hints,
        keying: PuzzleKeying::WithDifficulty,
    },
    GameSpec {
        id: "ladder",
        name: "Ladder",
        score_rule: ScoreRule::StepBound,
        keying: PuzzleKeying::Bare,
    },
];

impl GameSpec {
    /// Look up the registry row for a game id.
    #[must_use]
    pub fn lookup(id: &GameId) -> Option<&'static Self> {
        KNOWN_GAMES.iter().find(|spec| spec.id == id.as_str())
    }

    /// The score rule for a game; unknown games fall back to the guess rule,
    /// the most common family.
    #[must_use]
    pub fn score_rule_for(id: &GameId) -> ScoreRule {
        Self::lookup(id).map_or(ScoreRule::Guesses, |spec| spec.score_rule)
    }

    /// The duplicate-key composition for a game; unknown games use the bare
    /// puzzle number.
    #[must_use]
    pub fn keying_for(id: &GameId) -> PuzzleKeying {
        Self::lookup(id).map_or(PuzzleKeying::Bare, |spec| spec.keying)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
