use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;

use tally_core::engine::Engine;
use tally_core::{CompletionEvent, SystemClock};

use crate::output::{self, OutputMode};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON file containing an array of completion events (as written by
    /// `tally export`).
    pub file: PathBuf,
}

/// Execute `tally import`: bulk-load events and replay the log.
pub fn run_import(
    args: &ImportArgs,
    mode: OutputMode,
    engine: &mut Engine<SystemClock>,
) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let events: Vec<CompletionEvent> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;

    let report = engine.import(events);

    output::render(mode, &report, |report, w| {
        writeln!(
            w,
            "imported {} ({} duplicates, {} invalid)",
            report.added, report.duplicates, report.invalid
        )?;
        for unlock in &report.unlocks {
            writeln!(w, "unlocked: {} {}", unlock.kind, unlock.threshold)?;
        }
        Ok(())
    })
}
