//! The completion event: one recorded instance of a user finishing (or
//! failing) a daily puzzle.
//!
//! Events are immutable and append-only — the event log is the only source
//! of truth in tally. Every aggregate (duplicate index, streak ledger,
//! achievement progress) is a derived projection that can be rebuilt from the
//! log at any time. Events are created by whatever collaborator parses
//! external input (the CLI, an importer); the engine never mutates one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::GameId;

/// Annotation key: the puzzle's published number (e.g. `"1234"` or the
/// share-text form `"1,234"`).
pub const ANNOTATION_PUZZLE: &str = "puzzle";

/// Annotation key: sub-puzzle difficulty for games that publish several
/// puzzles per calendar day (e.g. `"easy"`, `"medium"`, `"hard"`).
pub const ANNOTATION_DIFFICULTY: &str = "difficulty";

/// Annotation key: elapsed solve time in seconds, for timed games.
pub const ANNOTATION_ELAPSED: &str = "elapsed";

/// One recorded completion of a daily puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Unique identifier. Content-derived (`blake3:<hex>`) when built via
    /// [`CompletionEvent::derive_id`]; treated as opaque by the engine.
    pub id: String,

    /// The game this result belongs to.
    pub game: GameId,

    /// When the puzzle was played, in milliseconds since the Unix epoch.
    pub played_at_ms: i64,

    /// Numeric result, when the game has one. Meaning is family-specific:
    /// guesses used, elapsed seconds, hints taken, or steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,

    /// Attempt bound the score is measured against. Zero for unbounded games.
    pub max_attempts: u32,

    /// Whether the puzzle was actually solved. Failed attempts are recorded
    /// too — they advance totals and break streaks.
    pub completed: bool,

    /// Free-form key/value annotations (see the `ANNOTATION_*` keys).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// The raw share text this event was parsed from. Kept verbatim for
    /// re-parsing and export.
    pub raw_text: String,
}

impl CompletionEvent {
    /// Derive a content-addressed identifier for an event about to be
    /// recorded: a BLAKE3 hash over the game id, timestamp, and raw text.
    ///
    /// Resubmitting the same share text for the same play therefore produces
    /// the same id, which the duplicate index rejects structurally.
    #[must_use]
    pub fn derive_id(game: &GameId, played_at_ms: i64, raw_text: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(game.as_str().as_bytes());
        hasher.update(&played_at_ms.to_le_bytes());
        hasher.update(raw_text.as_bytes());
        format!("blake3:{}", hasher.finalize().to_hex())
    }

    /// The `puzzle` annotation, if present.
    #[must_use]
    pub fn puzzle_annotation(&self) -> Option<&str> {
        self.annotations.get(ANNOTATION_PUZZLE).map(String::as_str)
    }

    /// The `difficulty` annotation, if present.
    #[must_use]
    pub fn difficulty_annotation(&self) -> Option<&str> {
        self.annotations
            .get(ANNOTATION_DIFFICULTY)
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
