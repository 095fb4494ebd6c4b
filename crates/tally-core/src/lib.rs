//! tally-core: the result reconciliation engine behind tally.
//!
//! The event log is the only source of truth. The duplicate index, the
//! streak ledger, and the achievement book are derived projections — cheap
//! to keep incrementally, and always rebuildable by replaying the log.
//!
//! # Conventions
//!
//! - **Errors**: typed enums (`thiserror`) at module boundaries, machine
//!   codes via [`error::ErrorCode`], `anyhow::Result` only in frontends.
//! - **Logging**: `tracing` macros with structured fields; failures carry
//!   their `code`.
//! - **Time**: everything goes through [`calendar::Clock`]; production uses
//!   [`calendar::SystemClock`], tests pin [`calendar::FixedClock`].

pub mod achievement;
pub mod calendar;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod event;
pub mod game;
pub mod lock;
pub mod normalize;
pub mod publish;
pub mod session;
pub mod store;
pub mod streak;
pub mod validate;

pub use achievement::{AchievementBook, AchievementKind, AchievementProgress, Unlock};
pub use calendar::{Clock, Day, FixedClock, SystemClock};
pub use dedup::{DuplicateIndex, DuplicateKind};
pub use engine::{Engine, EngineError, EngineHealth, EngineOptions, ImportReport, SubmitOutcome};
pub use error::ErrorCode;
pub use event::CompletionEvent;
pub use game::{GameId, GameSpec, PuzzleKeying, ScoreRule};
pub use publish::{LogPublisher, NoopPublisher, Publisher, ShareSummary};
pub use session::{SessionError, SessionMode};
pub use store::{MemoryStore, SqliteStore, Store};
pub use streak::{StreakAggregate, StreakLedger};
pub use validate::{ValidationError, validate};
