//! Session isolation: host mode, guest mode, and the persisted flag.
//!
//! Guest mode lets a temporary user play against an isolated in-memory copy
//! of the world. The contract is absolute: while the flag says Guest, no
//! store write (beyond the flag itself) and no publish may fire. Guest state
//! lives and dies in memory — which is exactly why crash recovery is just
//! "force the flag back to Host": the durable host data was never touched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::achievement::AchievementBook;
use crate::event::CompletionEvent;
use crate::streak::StreakLedger;

/// Which world the engine is mutating. Persisted under its own store key so
/// an interrupted guest session is detectable at the next startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Host,
    Guest,
}

impl SessionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Guest => "guest",
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Invalid session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("already in a guest session")]
    AlreadyGuest,
    #[error("not in a guest session")]
    NotGuest,
}

/// Point-in-time copy of the host world, held in memory for the duration of
/// one guest session and restored verbatim on exit.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSnapshot {
    pub events: Vec<CompletionEvent>,
    pub ledger: StreakLedger,
    pub achievements: AchievementBook,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionMode::Guest).expect("serialize"),
            "\"guest\""
        );
        let back: SessionMode = serde_json::from_str("\"host\"").expect("deserialize");
        assert_eq!(back, SessionMode::Host);
    }

    #[test]
    fn unknown_mode_fails_deserialization() {
        assert!(serde_json::from_str::<SessionMode>("\"root\"").is_err());
    }
}
