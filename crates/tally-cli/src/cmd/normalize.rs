use anyhow::Result;

use tally_core::SystemClock;
use tally_core::engine::Engine;

/// Execute `tally normalize`: break streaks that went stale while the app
/// was closed. Open already normalizes; this command exists to re-run the
/// pass explicitly (e.g. from a nightly cron).
pub fn run_normalize(engine: &mut Engine<SystemClock>) -> Result<()> {
    let broken = engine.normalize();
    if broken.is_empty() {
        println!("all streaks current");
    } else {
        for game in &broken {
            println!("streak broken: {game}");
        }
    }
    Ok(())
}
