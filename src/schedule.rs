//! Wall-clock source and scheduled send time computation.

use chrono::{Local, NaiveDateTime, NaiveTime, Timelike};

use crate::error::DeliveryError;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Source of the current local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the machine's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Hour and minute at which a message should go out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTime {
    pub hour: u32,
    pub minute: u32,
}

impl ScheduledTime {
    /// Same hour, next minute.
    ///
    /// There is no carry: at `hh:59` this yields minute `60`, which the
    /// delivery side rejects as an invalid time.
    pub fn one_minute_after<T: Timelike>(now: &T) -> Self {
        Self {
            hour: now.hour(),
            minute: now.minute() + 1,
        }
    }
}

/// Seconds from `now` until the next occurrence of `target` (at second 0).
///
/// Targets earlier in the day than `now` wrap around to tomorrow.
pub fn seconds_until(now: NaiveTime, target: &ScheduledTime) -> Result<u64, DeliveryError> {
    let target_time = NaiveTime::from_hms_opt(target.hour, target.minute, 0).ok_or(
        DeliveryError::InvalidTime {
            hour: target.hour,
            minute: target.minute,
        },
    )?;

    let diff = (target_time - now).num_seconds();
    Ok(diff.rem_euclid(SECONDS_PER_DAY) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn test_one_minute_after() {
        let scheduled = ScheduledTime::one_minute_after(&at(14, 30, 12));
        assert_eq!(scheduled, ScheduledTime { hour: 14, minute: 31 });
    }

    #[test]
    fn test_one_minute_after_does_not_carry() {
        let scheduled = ScheduledTime::one_minute_after(&at(9, 59, 0));
        assert_eq!(scheduled, ScheduledTime { hour: 9, minute: 60 });

        let scheduled = ScheduledTime::one_minute_after(&at(23, 59, 59));
        assert_eq!(scheduled, ScheduledTime { hour: 23, minute: 60 });
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock(at(8, 0, 0));
        assert_eq!(clock.now(), at(8, 0, 0));
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_seconds_until_later_today() {
        let now = at(14, 30, 12).time();
        let target = ScheduledTime { hour: 14, minute: 31 };
        assert_eq!(seconds_until(now, &target).unwrap(), 48);
    }

    #[test]
    fn test_seconds_until_same_time() {
        let now = at(14, 31, 0).time();
        let target = ScheduledTime { hour: 14, minute: 31 };
        assert_eq!(seconds_until(now, &target).unwrap(), 0);
    }

    #[test]
    fn test_seconds_until_wraps_to_tomorrow() {
        let now = at(23, 59, 30).time();
        let target = ScheduledTime { hour: 0, minute: 0 };
        assert_eq!(seconds_until(now, &target).unwrap(), 30);

        let now = at(10, 0, 30).time();
        let target = ScheduledTime { hour: 10, minute: 0 };
        assert_eq!(seconds_until(now, &target).unwrap(), 86_370);
    }

    #[test]
    fn test_seconds_until_rejects_minute_60() {
        let now = at(9, 59, 10).time();
        let target = ScheduledTime::one_minute_after(&now);

        match seconds_until(now, &target) {
            Err(DeliveryError::InvalidTime { hour, minute }) => {
                assert_eq!(hour, 9);
                assert_eq!(minute, 60);
            }
            other => panic!("Expected InvalidTime, got {:?}", other),
        }
    }

    #[test]
    fn test_seconds_until_rejects_hour_24() {
        let now = at(12, 0, 0).time();
        let target = ScheduledTime { hour: 24, minute: 0 };
        assert!(seconds_until(now, &target).is_err());
    }

    proptest! {
        #[test]
        fn prop_one_minute_after_is_literal(h in 0u32..24, m in 0u32..60, s in 0u32..60) {
            let scheduled = ScheduledTime::one_minute_after(&at(h, m, s));
            prop_assert_eq!(scheduled.hour, h);
            prop_assert_eq!(scheduled.minute, m + 1);
        }

        #[test]
        fn prop_next_minute_is_within_a_minute(h in 0u32..24, m in 0u32..59, s in 0u32..60) {
            let now = at(h, m, s).time();
            let secs = seconds_until(now, &ScheduledTime::one_minute_after(&now)).unwrap();
            prop_assert_eq!(secs, u64::from(60 - s));
        }

        #[test]
        fn prop_seconds_until_is_within_a_day(
            h in 0u32..24, m in 0u32..60, s in 0u32..60, th in 0u32..24, tm in 0u32..60,
        ) {
            let secs = seconds_until(at(h, m, s).time(), &ScheduledTime { hour: th, minute: tm }).unwrap();
            prop_assert!(secs < SECONDS_PER_DAY as u64);
        }
    }
}
