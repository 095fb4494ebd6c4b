use std::io::Write;

use anyhow::Result;
use clap::Args;

use tally_core::engine::Engine;
use tally_core::{GameId, StreakAggregate, SystemClock};

use crate::output::{self, OutputMode};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Limit output to one game.
    #[arg(long)]
    pub game: Option<String>,

    /// Include games with no recorded plays.
    #[arg(long)]
    pub all: bool,
}

/// Execute `tally stats`: print streak aggregates.
pub fn run_stats(
    args: &StatsArgs,
    mode: OutputMode,
    engine: &Engine<SystemClock>,
) -> Result<()> {
    let aggregates: Vec<&StreakAggregate> = match &args.game {
        Some(game) => engine.streak(&GameId::new(game.as_str())).into_iter().collect(),
        None => engine
            .streaks()
            .iter()
            .filter(|a| args.all || a.total_played > 0)
            .collect(),
    };

    output::render(mode, &aggregates, |aggregates, w| {
        for agg in aggregates.iter() {
            writeln!(
                w,
                "{:<12} streak {:>3} (best {:>3})  played {:>4}  completed {:>4}  last {}",
                agg.game.as_str(),
                agg.current_streak,
                agg.best_streak,
                agg.total_played,
                agg.total_completed,
                agg.last_played_day
                    .map_or_else(|| "never".to_string(), |d| d.to_string()),
            )?;
        }
        if aggregates.is_empty() {
            writeln!(w, "no plays recorded")?;
        }
        Ok(())
    })
}
