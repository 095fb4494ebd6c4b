//! Property tests for the streak ledger: replay (`rebuild`) is the
//! authoritative definition, and the incremental fold must agree with it for
//! chronologically ordered input.

use std::collections::BTreeMap;

use proptest::prelude::*;

use tally_core::calendar::{Clock, FixedClock};
use tally_core::event::CompletionEvent;
use tally_core::game::GameId;
use tally_core::streak::{StreakAggregate, rebuild};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Generated plays: a day number and an outcome per event.
fn arb_plays() -> impl Strategy<Value = Vec<(i32, bool)>> {
    prop::collection::vec((0i32..90, any::<bool>()), 0..50)
}

/// Events with unique timestamps: the index doubles as an intra-day offset,
/// so sorting by timestamp is total and deterministic.
fn build_events(plays: &[(i32, bool)]) -> Vec<CompletionEvent> {
    plays
        .iter()
        .enumerate()
        .map(|(idx, (day, completed))| CompletionEvent {
            id: format!("blake3:prop-{idx}"),
            game: GameId::new("gridword"),
            played_at_ms: i64::from(*day) * MILLIS_PER_DAY + idx as i64,
            score: None,
            max_attempts: 6,
            completed: *completed,
            annotations: BTreeMap::new(),
            raw_text: format!("play {idx}"),
        })
        .collect()
}

fn fold_incrementally(events: &[&CompletionEvent]) -> StreakAggregate {
    let clock = FixedClock::at_day(0);
    let mut aggregate = StreakAggregate::empty(GameId::new("gridword"));
    for event in events {
        aggregate.apply(event, clock.day_of(event.played_at_ms));
    }
    aggregate
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(1000))]

    /// Folding chronologically ordered events incrementally equals replaying
    /// them through `rebuild`.
    #[test]
    fn incremental_fold_matches_rebuild(plays in arb_plays()) {
        let mut events = build_events(&plays);
        events.sort_by_key(|e| e.played_at_ms);
        let refs: Vec<&CompletionEvent> = events.iter().collect();

        let incremental = fold_incrementally(&refs);
        let rebuilt = rebuild(&GameId::new("gridword"), &refs, &FixedClock::at_day(0));

        prop_assert_eq!(incremental, rebuilt);
    }

    /// `rebuild` sorts its input: reversing the arrival order (the classic
    /// out-of-order import) yields the identical aggregate.
    #[test]
    fn rebuild_is_arrival_order_insensitive(plays in arb_plays()) {
        let events = build_events(&plays);
        let forward: Vec<&CompletionEvent> = events.iter().collect();
        let backward: Vec<&CompletionEvent> = events.iter().rev().collect();

        let clock = FixedClock::at_day(0);
        let a = rebuild(&GameId::new("gridword"), &forward, &clock);
        let b = rebuild(&GameId::new("gridword"), &backward, &clock);

        prop_assert_eq!(a, b);
    }

    /// Structural invariants hold after any replay.
    #[test]
    fn rebuild_preserves_invariants(plays in arb_plays()) {
        let events = build_events(&plays);
        let refs: Vec<&CompletionEvent> = events.iter().collect();
        let aggregate = rebuild(&GameId::new("gridword"), &refs, &FixedClock::at_day(0));

        prop_assert!(aggregate.is_consistent());
        prop_assert!(aggregate.best_streak >= aggregate.current_streak);
        prop_assert!(aggregate.total_played >= aggregate.total_completed);
        if aggregate.total_played > 0 {
            prop_assert!(aggregate.last_played_day.is_some());
        }
    }
}
