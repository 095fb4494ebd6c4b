use anyhow::Result;

use tally_core::SystemClock;
use tally_core::engine::Engine;

/// Execute `tally rebuild`: replay the event log into fresh projections,
/// proving the derived state is disposable.
pub fn run_rebuild(engine: &mut Engine<SystemClock>) -> Result<()> {
    let unlocks = engine.rebuild_all();
    println!(
        "rebuild: events={} games={} new_unlocks={}",
        engine.events().len(),
        engine.streaks().len(),
        unlocks.len()
    );
    Ok(())
}
