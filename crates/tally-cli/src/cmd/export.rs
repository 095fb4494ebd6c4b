use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;

use tally_core::SystemClock;
use tally_core::engine::Engine;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Write to a file instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Execute `tally export`: dump the event log as pretty JSON.
pub fn run_export(args: &ExportArgs, engine: &Engine<SystemClock>) -> Result<()> {
    let blob = engine.export_events().context("serialize event log")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, blob)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("exported {} events to {}", engine.events().len(), path.display());
        }
        None => println!("{blob}"),
    }
    Ok(())
}
