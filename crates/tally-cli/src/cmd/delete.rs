use anyhow::Result;
use clap::Args;

use tally_core::SystemClock;
use tally_core::engine::Engine;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Event id to delete (`blake3:...`, see `tally export`).
    pub id: String,
}

/// Execute `tally delete`: remove one event and replay the log.
pub fn run_delete(args: &DeleteArgs, engine: &mut Engine<SystemClock>) -> Result<()> {
    if engine.delete_event(&args.id) {
        println!("deleted {}; aggregates rebuilt", args.id);
        Ok(())
    } else {
        anyhow::bail!("no event with id {}", args.id);
    }
}
