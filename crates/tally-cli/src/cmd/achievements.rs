use std::io::Write;

use anyhow::Result;
use clap::Args;

use tally_core::SystemClock;
use tally_core::engine::Engine;

use crate::output::{self, OutputMode};

#[derive(Args, Debug)]
pub struct AchievementsArgs {
    /// Show locked tiers as well as unlocked ones.
    #[arg(long)]
    pub all: bool,
}

/// Execute `tally achievements`: print tiered progress per category.
pub fn run_achievements(
    args: &AchievementsArgs,
    mode: OutputMode,
    engine: &Engine<SystemClock>,
) -> Result<()> {
    let progress = engine.achievements();

    output::render(mode, &progress, |progress, w| {
        for category in *progress {
            writeln!(
                w,
                "{} — {} ({} of {} tiers unlocked)",
                category.kind,
                category.progress,
                category.unlocked_count(),
                category.tiers.len()
            )?;
            for tier in &category.tiers {
                match tier.unlocked_at_ms {
                    Some(_) => writeln!(w, "  [x] {}", tier.threshold)?,
                    None if args.all => writeln!(w, "  [ ] {}", tier.threshold)?,
                    None => {}
                }
            }
        }
        Ok(())
    })
}
