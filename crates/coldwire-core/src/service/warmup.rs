//! Warmup daily-limit calculator.
//!
//! New mailbox identities must build sending reputation gradually or
//! spam filters punish them. The ramp is a fixed staircase keyed by how
//! many whole days have passed since the account's first real sending
//! traffic; from day five on the account runs at its own cap.

use chrono::{DateTime, NaiveTime, Utc};

use crate::account::SenderAccount;

/// Daily cap applied when an account does not set one.
pub const DEFAULT_MAX_PER_DAY: u32 = 50;

/// Day-by-day limits for the first days of sending. Day 0 is the first day.
const RAMP: [u32; 5] = [5, 10, 20, 30, 40];

/// Maximum messages `account` may send on the day containing `now`.
///
/// Pure: "now" is injected. Accounts without a warmup anchor get their
/// full cap immediately. Every ramp step is additionally capped at
/// `max_per_day`, which keeps the limit monotonically non-decreasing
/// even for accounts whose cap sits below a raw step value.
#[must_use]
pub fn daily_limit(account: &SenderAccount, now: DateTime<Utc>) -> u32 {
    let max = account.max_per_day.unwrap_or(DEFAULT_MAX_PER_DAY);
    let Some(start) = account.warmup_start_date else {
        return max;
    };

    // A start date in the future (clock skew) counts as day zero.
    let day = (now - start).num_days().max(0);
    usize::try_from(day)
        .ok()
        .and_then(|d| RAMP.get(d))
        .map_or(max, |step| (*step).min(max))
}

/// UTC midnight of the day containing `now`.
///
/// The whole engine counts "today" against this single boundary; mixing
/// day definitions would drift the quotas.
#[must_use]
pub fn start_of_day_utc(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn account_with_start(
        now: DateTime<Utc>,
        days_ago: i64,
        max_per_day: Option<u32>,
    ) -> SenderAccount {
        let mut account = SenderAccount::new("warm@example.com");
        account.warmup_start_date = Some(now - Duration::days(days_ago));
        account.max_per_day = max_per_day;
        account
    }

    #[test]
    fn test_no_warmup_start_returns_cap() {
        let account = SenderAccount::new("cold@example.com");
        assert_eq!(daily_limit(&account, Utc::now()), DEFAULT_MAX_PER_DAY);

        let account = SenderAccount::new("cold@example.com").with_max_per_day(80);
        assert_eq!(daily_limit(&account, Utc::now()), 80);
    }

    #[test]
    fn test_staircase() {
        let now = Utc::now();
        for (days_ago, expected) in [(0, 5), (1, 10), (2, 20), (3, 30), (4, 40), (5, 50), (90, 50)]
        {
            let account = account_with_start(now, days_ago, None);
            assert_eq!(daily_limit(&account, now), expected, "day {days_ago}");
        }
    }

    #[test]
    fn test_future_start_date_counts_as_day_zero() {
        let mut account = SenderAccount::new("skewed@example.com");
        account.warmup_start_date = Some(Utc::now() + Duration::days(2));
        assert_eq!(daily_limit(&account, Utc::now()), 5);
    }

    #[test]
    fn test_partial_days_floor() {
        let mut account = SenderAccount::new("warm@example.com");
        account.warmup_start_date = Some(Utc::now() - Duration::hours(36));
        // 1.5 days in is still day 1.
        assert_eq!(daily_limit(&account, Utc::now()), 10);
    }

    #[test]
    fn test_small_cap_clamps_the_ramp() {
        let now = Utc::now();
        // A cap below the raw step values must win on every day.
        for days_ago in 0..8 {
            let account = account_with_start(now, days_ago, Some(8));
            assert!(daily_limit(&account, now) <= 8, "day {days_ago}");
        }
        assert_eq!(daily_limit(&account_with_start(now, 0, Some(8)), now), 5);
        assert_eq!(daily_limit(&account_with_start(now, 1, Some(8)), now), 8);
    }

    #[test]
    fn test_start_of_day_utc() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let midnight = start_of_day_utc(now);
        assert_eq!(midnight, Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
    }

    proptest! {
        /// More days warming up never means a lower limit, and the limit
        /// never exceeds the cap.
        #[test]
        fn ramp_is_monotonic(d1 in 0i64..400, d2 in 0i64..400, max in 1u32..200) {
            prop_assume!(d1 <= d2);
            let now = Utc::now();
            let older = account_with_start(now, d2, Some(max));
            let newer = account_with_start(now, d1, Some(max));
            let newer_limit = daily_limit(&newer, now);
            let older_limit = daily_limit(&older, now);
            prop_assert!(newer_limit <= older_limit);
            prop_assert!(older_limit <= max);
        }

        /// From day five the account runs at its own cap.
        #[test]
        fn ramp_reaches_cap_by_day_five(days in 5i64..400, max in 1u32..200) {
            let now = Utc::now();
            let account = account_with_start(now, days, Some(max));
            prop_assert_eq!(daily_limit(&account, now), max);
        }
    }
}
