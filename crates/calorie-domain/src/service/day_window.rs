//! Day window calculation
//!
//! "Today" starts at the configured reset hour rather than midnight. Any
//! instant before today's reset belongs to the window that opened at
//! yesterday's reset, so with a reset hour of 4 a 01:30 snack counts toward
//! the previous day.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, TimeZone};

/// Highest valid reset hour
pub const MAX_RESET_HOUR: u32 = 23;

/// Start of the active day window for `now`.
///
/// Returns today at `reset_hour:00:00.000` local time when `now` is at or
/// after that instant, otherwise yesterday at the same wall-clock hour.
/// Hours above 23 are clamped.
pub fn day_window_start<Tz: TimeZone>(now: &DateTime<Tz>, reset_hour: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    let hour = reset_hour.min(MAX_RESET_HOUR);
    let today = now.date_naive();

    let today_reset = local_reset(&tz, today, hour);
    if *now >= today_reset {
        return today_reset;
    }

    match today.checked_sub_days(Days::new(1)) {
        Some(yesterday) => local_reset(&tz, yesterday, hour),
        None => today_reset,
    }
}

/// Resolve `date` at `hour:00` in `tz`.
///
/// Ambiguous local times (clocks falling back) take the earlier instant.
/// Times skipped by a forward transition move to the first valid hour after.
fn local_reset<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32) -> DateTime<Tz> {
    let mut naive = at_hour(date, hour);
    // DST gaps are at most a couple of hours; walk forward until one resolves
    for _ in 0..4 {
        if let Some(resolved) = tz.from_local_datetime(&naive).earliest() {
            return resolved;
        }
        naive += chrono::Duration::hours(1);
    }
    tz.from_utc_datetime(&at_hour(date, hour))
}

fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, 0, 0)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
}

/// True when `timestamp` falls in the window opened at `window_start`
pub fn in_window<Tz: TimeZone>(timestamp: &DateTime<Tz>, window_start: &DateTime<Tz>) -> bool {
    timestamp >= window_start
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Timelike, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_midnight_reset_is_start_of_day() {
        let start = day_window_start(&at(13, 45), 0);
        assert_eq!(start, at(0, 0));
    }

    #[test]
    fn test_after_reset_uses_today() {
        let start = day_window_start(&at(9, 0), 4);
        assert_eq!(start, at(4, 0));
    }

    #[test]
    fn test_before_reset_uses_yesterday() {
        let start = day_window_start(&at(1, 30), 4);
        assert_eq!(start, at(4, 0) - Duration::days(1));
    }

    #[test]
    fn test_exactly_at_reset_uses_today() {
        let start = day_window_start(&at(4, 0), 4);
        assert_eq!(start, at(4, 0));
    }

    #[test]
    fn test_late_reset_hour() {
        let start = day_window_start(&at(22, 59), 23);
        assert_eq!(start, at(23, 0) - Duration::days(1));
    }

    #[test]
    fn test_month_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap();
        let start = day_window_start(&now, 5);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 28, 5, 0, 0).unwrap());
    }

    #[test]
    fn test_uses_local_calendar_of_now() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        // 2026-06-15 02:00 in UTC+9 is still the 14th in UTC
        let now = tz.with_ymd_and_hms(2026, 6, 15, 2, 0, 0).unwrap();
        let start = day_window_start(&now, 0);
        assert_eq!(start, tz.with_ymd_and_hms(2026, 6, 15, 0, 0, 0).unwrap());
        assert_eq!(start.with_timezone(&Utc).hour(), 15);
    }

    #[test]
    fn test_out_of_range_hour_is_clamped() {
        let start = day_window_start(&at(23, 30), 40);
        assert_eq!(start, at(23, 0));
    }

    #[test]
    fn test_window_bounds_hold_for_every_hour() {
        let base = Utc.with_ymd_and_hms(2026, 6, 15, 0, 0, 0).unwrap();
        for reset_hour in 0..=23 {
            for minutes in (0..24 * 60).step_by(37) {
                let now = base + Duration::minutes(minutes);
                let start = day_window_start(&now, reset_hour);
                let today_reset = base + Duration::hours(i64::from(reset_hour));

                assert!(start <= now, "hour {reset_hour} at {now}");
                assert!(start > now - Duration::hours(48), "hour {reset_hour} at {now}");
                if now < today_reset {
                    assert_eq!(start, today_reset - Duration::days(1));
                } else {
                    assert_eq!(start, today_reset);
                }
            }
        }
    }

    #[test]
    fn test_in_window_is_inclusive() {
        let start = at(4, 0);
        assert!(in_window(&at(4, 0), &start));
        assert!(in_window(&at(23, 59), &start));
        assert!(!in_window(&at(3, 59), &start));
    }
}
