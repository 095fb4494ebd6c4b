//! Streak normalization: break streaks that went stale while the app was
//! closed.
//!
//! Mere elapsed time does not break a streak — a missing *day* does. A streak
//! whose last play was N days ago survives normalization exactly when every
//! calendar day strictly between the last play and the reference day has at
//! least one completed event for that game (the user may have imported
//! results recorded elsewhere).
//!
//! The walk is O(days since last play) per at-risk game against a per-game
//! day set built once in O(total completed events) — never a rescan of the
//! event list per day.

use std::collections::{HashMap, HashSet};

use crate::calendar::{Clock, Day};
use crate::event::CompletionEvent;
use crate::game::GameId;
use crate::streak::StreakLedger;

/// Build the per-game set of calendar days that have at least one completed
/// event. One pass over the log.
#[must_use]
pub fn completed_days(
    events: &[CompletionEvent],
    clock: &dyn Clock,
) -> HashMap<GameId, HashSet<Day>> {
    let mut days: HashMap<GameId, HashSet<Day>> = HashMap::new();
    for event in events.iter().filter(|e| e.completed) {
        days.entry(event.game.clone())
            .or_default()
            .insert(clock.day_of(event.played_at_ms));
    }
    days
}

/// Break every streak with a day gap between its last play and `today`
/// (exclusive). Returns the games whose streaks were broken — only those
/// need a persistence write.
pub fn normalize(
    ledger: &mut StreakLedger,
    completed: &HashMap<GameId, HashSet<Day>>,
    today: Day,
) -> Vec<GameId> {
    let mut broken = Vec::new();

    for aggregate in ledger.iter_mut() {
        if aggregate.current_streak == 0 {
            continue;
        }
        let Some(last) = aggregate.last_played_day else {
            // current_streak > 0 without a last-played day is an invariant
            // violation; treat the streak as stale.
            aggregate.break_streak();
            broken.push(aggregate.game.clone());
            continue;
        };

        if has_gap(&aggregate.game, completed, last, today) {
            tracing::debug!(
                game = %aggregate.game,
                last_played = %last,
                reference = %today,
                "breaking stale streak"
            );
            aggregate.break_streak();
            broken.push(aggregate.game.clone());
        }
    }

    broken
}

/// Whether any day strictly between `last` and `today` lacks a completed
/// event for `game`.
fn has_gap(
    game: &GameId,
    completed: &HashMap<GameId, HashSet<Day>>,
    last: Day,
    today: Day,
) -> bool {
    if last.days_until(today) <= 1 {
        // Played today or yesterday relative to the reference: no room for
        // a gap.
        return false;
    }
    let days = completed.get(game);
    let mut day = last.next();
    while day < today {
        if !days.is_some_and(|set| set.contains(&day)) {
            return true;
        }
        day = day.next();
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedClock;
    use std::collections::BTreeMap;

    fn event(game: &str, day: i32, completed: bool) -> CompletionEvent {
        CompletionEvent {
            id: format!("blake3:{game}-{day}"),
            game: GameId::new(game),
            played_at_ms: FixedClock::noon_ms(day),
            score: None,
            max_attempts: 6,
            completed,
            annotations: BTreeMap::new(),
            raw_text: "raw".to_string(),
        }
    }

    fn ledger_from(events: &[CompletionEvent]) -> StreakLedger {
        StreakLedger::rebuild_all(events, &FixedClock::at_day(0))
    }

    #[test]
    fn gap_breaks_streak_and_keeps_best() {
        // The app last ran on day 2 (current streak 2). Completed events
        // exist for days 1, 2, 4 — day 3 is missing — and the reference day
        // is 5. The gap at day 3 breaks the streak; best and totals stay.
        let through_day_2 = vec![event("gridword", 1, true), event("gridword", 2, true)];
        let mut ledger = ledger_from(&through_day_2);

        let all_events = vec![
            event("gridword", 1, true),
            event("gridword", 2, true),
            event("gridword", 4, true),
        ];
        let clock = FixedClock::at_day(5);
        let completed = completed_days(&all_events, &clock);

        let broken = normalize(&mut ledger, &completed, Day::from_num(5));

        assert_eq!(broken, vec![GameId::new("gridword")]);
        let agg = ledger.get(&GameId::new("gridword")).expect("aggregate");
        assert_eq!(agg.current_streak, 0);
        assert_eq!(agg.best_streak, 2);
        assert_eq!(agg.total_played, 2);
        assert_eq!(agg.last_played_day, Some(Day::from_num(2)));
        assert_eq!(agg.streak_start_day, None);
    }

    #[test]
    fn played_yesterday_survives() {
        let events = vec![event("gridword", 3, true), event("gridword", 4, true)];
        let mut ledger = ledger_from(&events);
        let clock = FixedClock::at_day(5);
        let completed = completed_days(&events, &clock);

        let broken = normalize(&mut ledger, &completed, Day::from_num(5));

        assert!(broken.is_empty());
        let agg = ledger.get(&GameId::new("gridword")).expect("aggregate");
        assert_eq!(agg.current_streak, 2);
    }

    #[test]
    fn played_today_survives() {
        let events = vec![event("gridword", 5, true)];
        let mut ledger = ledger_from(&events);
        let clock = FixedClock::at_day(5);
        let completed = completed_days(&events, &clock);

        assert!(normalize(&mut ledger, &completed, Day::from_num(5)).is_empty());
    }

    #[test]
    fn every_intervening_day_completed_survives_long_absence() {
        // Last incremental play day 2, but an import filled days 3..=6.
        let events = vec![
            event("gridword", 2, true),
            event("gridword", 3, true),
            event("gridword", 4, true),
            event("gridword", 5, true),
            event("gridword", 6, true),
        ];
        let mut ledger = ledger_from(&events);
        let clock = FixedClock::at_day(7);
        let completed = completed_days(&events, &clock);

        assert!(normalize(&mut ledger, &completed, Day::from_num(7)).is_empty());
        assert_eq!(
            ledger
                .get(&GameId::new("gridword"))
                .map(|a| a.current_streak),
            Some(5)
        );
    }

    #[test]
    fn incomplete_days_do_not_fill_gaps() {
        // Day 3 has only a failed attempt: still a gap.
        let events = vec![
            event("gridword", 2, true),
            event("gridword", 3, false),
            event("gridword", 4, true),
        ];
        let mut ledger = ledger_from(&events);
        let clock = FixedClock::at_day(6);
        let completed = completed_days(&events, &clock);

        // The rebuild already restarted the streak at day 4; a day-5 gap
        // before reference day 6 breaks it again.
        let broken = normalize(&mut ledger, &completed, Day::from_num(6));
        assert_eq!(broken, vec![GameId::new("gridword")]);
    }

    #[test]
    fn zero_streaks_are_untouched() {
        let events = vec![event("gridword", 1, false)];
        let mut ledger = ledger_from(&events);
        let clock = FixedClock::at_day(9);
        let completed = completed_days(&events, &clock);

        assert!(normalize(&mut ledger, &completed, Day::from_num(9)).is_empty());
    }

    #[test]
    fn games_are_independent() {
        let events = vec![
            event("gridword", 1, true),
            event("hexspell", 4, true),
        ];
        let mut ledger = ledger_from(&events);
        let clock = FixedClock::at_day(5);
        let completed = completed_days(&events, &clock);

        let broken = normalize(&mut ledger, &completed, Day::from_num(5));
        assert_eq!(broken, vec![GameId::new("gridword")]);
        assert_eq!(
            ledger
                .get(&GameId::new("hexspell"))
                .map(|a| a.current_streak),
            Some(1)
        );
    }
}
