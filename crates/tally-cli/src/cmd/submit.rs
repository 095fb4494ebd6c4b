use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context as _, Result};
use chrono::{Local, NaiveDate, TimeZone};
use clap::Args;
use serde::Serialize;

use tally_core::engine::{Engine, SubmitOutcome};
use tally_core::event::{ANNOTATION_DIFFICULTY, ANNOTATION_PUZZLE};
use tally_core::{Clock, CompletionEvent, GameId, SystemClock, Unlock};

use crate::output::{self, OutputMode};

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Game identifier (e.g. gridword, minicross, sudoku).
    pub game: String,

    /// Raw share text; synthesized from the flags when omitted.
    pub raw: Option<String>,

    /// Numeric result (guesses used, elapsed seconds, hints taken).
    #[arg(long)]
    pub score: Option<u32>,

    /// Attempt bound the score is measured against.
    #[arg(long, default_value_t = 6)]
    pub max_attempts: u32,

    /// Record the play as failed (streak-breaking).
    #[arg(long)]
    pub failed: bool,

    /// Calendar date of the play (YYYY-MM-DD); defaults to today.
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,

    /// The puzzle's published number (used for duplicate detection).
    #[arg(long)]
    pub puzzle: Option<String>,

    /// Sub-puzzle difficulty for games that publish several per day.
    #[arg(long)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitReport {
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejected: Option<String>,
    unlocks: Vec<Unlock>,
}

/// Execute `tally submit`: build a completion event from the flags and offer
/// it to the engine.
///
/// # Errors
///
/// Returns an error for an unparseable `--date` or a validation failure
/// (malformed event). A duplicate is a normal outcome, not an error.
pub fn run_submit(
    args: &SubmitArgs,
    mode: OutputMode,
    engine: &mut Engine<SystemClock>,
) -> Result<()> {
    let game = GameId::new(args.game.as_str());
    let played_at_ms = match args.date.as_deref() {
        Some(raw) => parse_local_date_ms(raw)?,
        None => SystemClock.now_ms(),
    };

    let raw_text = args.raw.clone().unwrap_or_else(|| {
        // Manual entry has no share text; synthesize a stable one so the
        // content-derived id still dedupes retries of the same invocation.
        let score = args
            .score
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        format!("{game} {score}/{} on {played_at_ms}", args.max_attempts)
    });

    let mut annotations = BTreeMap::new();
    if let Some(puzzle) = &args.puzzle {
        annotations.insert(ANNOTATION_PUZZLE.to_string(), puzzle.clone());
    }
    if let Some(difficulty) = &args.difficulty {
        annotations.insert(ANNOTATION_DIFFICULTY.to_string(), difficulty.clone());
    }

    let event = CompletionEvent {
        id: CompletionEvent::derive_id(&game, played_at_ms, &raw_text),
        game,
        played_at_ms,
        score: args.score,
        max_attempts: args.max_attempts,
        completed: !args.failed,
        annotations,
        raw_text,
    };

    let outcome = engine
        .submit(event)
        .context("completion event failed validation")?;

    let report = match outcome {
        SubmitOutcome::Accepted { unlocks } => SubmitReport {
            accepted: true,
            rejected: None,
            unlocks,
        },
        SubmitOutcome::Duplicate(kind) => SubmitReport {
            accepted: false,
            rejected: Some(kind.to_string()),
            unlocks: vec![],
        },
    };

    output::render(mode, &report, |report, w| {
        if report.accepted {
            writeln!(w, "recorded")?;
            for unlock in &report.unlocks {
                writeln!(w, "unlocked: {} {}", unlock.kind, unlock.threshold)?;
            }
        } else if let Some(reason) = &report.rejected {
            writeln!(w, "rejected: {reason}")?;
        }
        Ok(())
    })
}

/// Parse a `YYYY-MM-DD` date as local noon, in epoch milliseconds.
fn parse_local_date_ms(raw: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date {raw:?}, expected YYYY-MM-DD"))?;
    let naive = date
        .and_hms_opt(12, 0, 0)
        .context("date out of range")?;
    let local = Local
        .from_local_datetime(&naive)
        .single()
        .context("ambiguous local time")?;
    Ok(local.timestamp_millis())
}
