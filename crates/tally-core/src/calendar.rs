//! Calendar days and the injectable clock collaborator.
//!
//! Streak semantics are defined over *consumer-local calendar days*, not raw
//! timestamps: two plays at 23:59 and 00:01 are one day apart even though
//! they are two minutes apart on the wall clock. [`Day`] is the unit all
//! streak and duplicate logic speaks; [`Clock`] is the only component allowed
//! to turn a timestamp into a [`Day`], so tests can pin the boundary.

use std::fmt;

use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Days from 0001-01-01 (CE) to 1970-01-01, per the proleptic Gregorian
/// calendar. Bridges chrono's `num_days_from_ce` and Unix-epoch day numbers.
const EPOCH_CE_DAYS: i32 = 719_163;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// One calendar day, counted from the Unix epoch in the consumer's local
/// timezone.
///
/// Stored as a plain day number so day arithmetic (`next`, `days_until`) is
/// integer arithmetic. Serialized as an ISO `YYYY-MM-DD` string so persisted
/// aggregates stay human-readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Day(i32);

impl Day {
    /// Construct from a raw epoch day number.
    #[must_use]
    pub const fn from_num(num: i32) -> Self {
        Self(num)
    }

    /// The raw epoch day number.
    #[must_use]
    pub const fn num(self) -> i32 {
        self.0
    }

    /// Construct from a civil date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.num_days_from_ce() - EPOCH_CE_DAYS)
    }

    /// The civil date, if representable.
    #[must_use]
    pub fn date(self) -> Option<NaiveDate> {
        NaiveDate::from_num_days_from_ce_opt(self.0 + EPOCH_CE_DAYS)
    }

    /// The following calendar day.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Signed distance in days from `self` to `other` (positive when `other`
    /// is later).
    #[must_use]
    pub const fn days_until(self, other: Self) -> i64 {
        other.0 as i64 - self.0 as i64
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date() {
            Some(date) => write!(f, "{date}"),
            None => write!(f, "day#{}", self.0),
        }
    }
}

impl Serialize for Day {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.date() {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => Err(serde::ser::Error::custom(format!(
                "day number {} out of civil range",
                self.0
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Day {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|e| D::Error::custom(format!("invalid day {raw:?}: {e}")))?;
        Ok(Self::from_date(date))
    }
}

/// Clock/calendar collaborator.
///
/// The engine never reads the system clock directly; everything that needs
/// "now" or a day boundary goes through this trait so tests can substitute
/// [`FixedClock`].
pub trait Clock: Send {
    /// Current wall time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// The consumer-local calendar day containing `ts_ms`.
    fn day_of(&self, ts_ms: i64) -> Day;

    /// The consumer-local calendar day containing `now_ms()`.
    fn today(&self) -> Day {
        self.day_of(self.now_ms())
    }
}

/// Production clock: wall time, local-timezone day boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn day_of(&self, ts_ms: i64) -> Day {
        DateTime::from_timestamp_millis(ts_ms).map_or(Day(ts_ms.div_euclid(MILLIS_PER_DAY) as i32), |utc| {
            Day::from_date(utc.with_timezone(&Local).date_naive())
        })
    }
}

/// Deterministic clock for tests: a pinned "now" and UTC day boundaries.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now_ms: i64,
}

impl FixedClock {
    /// Pin the clock at an absolute timestamp.
    #[must_use]
    pub const fn at_ms(now_ms: i64) -> Self {
        Self { now_ms }
    }

    /// Pin the clock at noon on the given epoch day.
    #[must_use]
    pub const fn at_day(day: i32) -> Self {
        Self {
            now_ms: day as i64 * MILLIS_PER_DAY + MILLIS_PER_DAY / 2,
        }
    }

    /// Noon (UTC) on the given epoch day, in epoch milliseconds. Handy for
    /// building test events that unambiguously land on `day`.
    #[must_use]
    pub const fn noon_ms(day: i32) -> i64 {
        day as i64 * MILLIS_PER_DAY + MILLIS_PER_DAY / 2
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms
    }

    fn day_of(&self, ts_ms: i64) -> Day {
        Day(ts_ms.div_euclid(MILLIS_PER_DAY) as i32)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_day_zero_is_1970_01_01() {
        let day = Day::from_num(0);
        assert_eq!(day.date(), NaiveDate::from_ymd_opt(1970, 1, 1));
    }

    #[test]
    fn date_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date");
        let day = Day::from_date(date);
        assert_eq!(day.date(), Some(date));
    }

    #[test]
    fn day_arithmetic() {
        let a = Day::from_num(100);
        let b = Day::from_num(103);
        assert_eq!(a.days_until(b), 3);
        assert_eq!(b.days_until(a), -3);
        assert_eq!(a.next(), Day::from_num(101));
    }

    #[test]
    fn day_serde_is_iso_string() {
        let day = Day::from_date(NaiveDate::from_ymd_opt(2026, 2, 28).expect("valid date"));
        let json = serde_json::to_string(&day).expect("serialize");
        assert_eq!(json, "\"2026-02-28\"");
        let back: Day = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, day);
    }

    #[test]
    fn day_deserialize_rejects_garbage() {
        assert!(serde_json::from_str::<Day>("\"not-a-date\"").is_err());
    }

    #[test]
    fn fixed_clock_day_boundaries_are_utc_midnight() {
        let clock = FixedClock::at_day(20);
        assert_eq!(clock.today(), Day::from_num(20));
        assert_eq!(clock.day_of(20 * MILLIS_PER_DAY), Day::from_num(20));
        assert_eq!(clock.day_of(20 * MILLIS_PER_DAY - 1), Day::from_num(19));
        assert_eq!(clock.day_of(21 * MILLIS_PER_DAY), Day::from_num(21));
    }

    #[test]
    fn fixed_clock_handles_pre_epoch() {
        let clock = FixedClock::at_ms(0);
        assert_eq!(clock.day_of(-1), Day::from_num(-1));
    }

    #[test]
    fn noon_ms_lands_inside_the_day() {
        let clock = FixedClock::at_day(0);
        assert_eq!(clock.day_of(FixedClock::noon_ms(42)), Day::from_num(42));
    }
}
