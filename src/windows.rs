//! Fixed-width time windows ending at a reference instant.
//!
//! Windows come out newest first (index 0 contains `now`); callers reverse
//! them before presenting a series.

use chrono::{DateTime, Days, Duration, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAYS: usize = 7;
pub const DEFAULT_MINUTES: usize = 30;

/// A local wall-clock time skipped by a DST jump is resolved to the first
/// valid instant after it, searching at most this far ahead.
const MAX_SKIPPED_MINUTES: i64 = 4 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowUnit {
    Day,
    Minute,
}

/// Timezone in which day windows start and end. Minute windows are always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBounds {
    /// `start <= t <= end`
    Inclusive,
    /// `start <= t < end`
    HalfOpen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bounds: WindowBounds,
    pub label: String,
}

impl TimeWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        match self.bounds {
            WindowBounds::Inclusive => self.start <= instant && instant <= self.end,
            WindowBounds::HalfOpen => self.start <= instant && instant < self.end,
        }
    }
}

/// Requested window counts arrive signed from clients; anything below one means no windows.
pub fn clamp_count(requested: i64) -> usize {
    usize::try_from(requested.max(0)).unwrap_or(usize::MAX)
}

/// Whether all `count` windows ending at `now` lie inside chrono's range.
///
/// Day windows get two extra days on either side so any UTC offset still
/// resolves. When this is false the generators return fewer windows than asked.
pub fn fits(unit: WindowUnit, count: usize, now: DateTime<Utc>) -> bool {
    let Ok(count) = u64::try_from(count) else {
        return false;
    };
    match unit {
        WindowUnit::Day => {
            let oldest = count
                .checked_add(2)
                .and_then(|days| now.checked_sub_days(Days::new(days)));
            oldest.is_some() && now.checked_add_days(Days::new(2)).is_some()
        }
        WindowUnit::Minute => i64::try_from(count)
            .ok()
            .and_then(Duration::try_minutes)
            .and_then(|span| now.checked_sub_signed(span))
            .is_some(),
    }
}

pub fn generate(
    unit: WindowUnit,
    count: usize,
    now: DateTime<Utc>,
    boundary: DayBoundary,
) -> Vec<TimeWindow> {
    match (unit, boundary) {
        (WindowUnit::Minute, _) => minute_windows(now, count),
        (WindowUnit::Day, DayBoundary::Local) => day_windows(now, count, &Local),
        (WindowUnit::Day, DayBoundary::Utc) => day_windows(now, count, &Utc),
    }
}

/// Calendar days in `tz`, from the day containing `now` backwards.
///
/// Each window covers `00:00:00.000` through `23:59:59.999` of its day,
/// both ends inclusive, and is labelled `"DD Mon"` from its start.
pub fn day_windows<Tz>(now: DateTime<Utc>, count: usize, tz: &Tz) -> Vec<TimeWindow>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let Some(today) = local_date(now, tz) else {
        return Vec::new();
    };

    (0..count)
        .map_while(|days_back| {
            let day = today.checked_sub_days(Days::new(days_back as u64))?;
            let start = resolve_local(tz, day.and_hms_opt(0, 0, 0)?, Fold::Earliest)?;
            let end = resolve_local(tz, day.and_hms_milli_opt(23, 59, 59, 999)?, Fold::Latest)?;

            Some(TimeWindow {
                label: start.with_timezone(tz).format("%d %b").to_string(),
                start,
                end,
                bounds: WindowBounds::Inclusive,
            })
        })
        .collect()
}

/// Sixty-second windows `[now - (i+1)m, now - i m)`, labelled `"HH:MM"` (UTC) from their start.
pub fn minute_windows(now: DateTime<Utc>, count: usize) -> Vec<TimeWindow> {
    (0..count)
        .map_while(|minutes_back| {
            let offset = Duration::try_minutes(i64::try_from(minutes_back).ok()?)?;
            let end = now.checked_sub_signed(offset)?;
            let start = end.checked_sub_signed(Duration::try_minutes(1)?)?;

            Some(TimeWindow {
                label: start.format("%H:%M").to_string(),
                start,
                end,
                bounds: WindowBounds::HalfOpen,
            })
        })
        .collect()
}

fn local_date<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Option<NaiveDate> {
    let utc = now.naive_utc();
    let offset = tz.offset_from_utc_datetime(&utc).fix();
    let shift = Duration::try_seconds(i64::from(offset.local_minus_utc()))?;
    utc.checked_add_signed(shift).map(|local| local.date())
}

#[derive(Clone, Copy)]
enum Fold {
    Earliest,
    Latest,
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, fold: Fold) -> Option<DateTime<Utc>> {
    let mapped = tz.from_local_datetime(&naive);
    let picked = match fold {
        Fold::Earliest => mapped.earliest(),
        Fold::Latest => mapped.latest(),
    };

    picked
        .or_else(|| {
            (1..=MAX_SKIPPED_MINUTES).find_map(|minutes| {
                let shifted = naive.checked_add_signed(Duration::try_minutes(minutes)?)?;
                tz.from_local_datetime(&shifted).earliest()
            })
        })
        .map(|instant| instant.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, LocalResult};

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_day_windows_newest_first() {
        let windows = day_windows(at("2024-06-10T12:00:00Z"), 3, &Utc);

        let labels: Vec<&str> = windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["10 Jun", "09 Jun", "08 Jun"]);
    }

    #[test]
    fn test_day_window_bounds() {
        let windows = day_windows(at("2024-06-10T12:00:00Z"), 2, &Utc);
        let yesterday = &windows[1];

        assert_eq!(yesterday.start, at("2024-06-09T00:00:00Z"));
        assert_eq!(yesterday.end, at("2024-06-09T23:59:59.999Z"));
        assert_eq!(yesterday.bounds, WindowBounds::Inclusive);

        assert!(yesterday.contains(at("2024-06-09T00:00:00Z")));
        assert!(yesterday.contains(at("2024-06-09T23:59:59.999Z")));
        assert!(!yesterday.contains(at("2024-06-10T00:00:00Z")));
        assert!(windows[0].contains(at("2024-06-10T00:00:00Z")));
    }

    #[test]
    fn test_day_windows_follow_timezone() {
        // 01:30 UTC on the 10th is still the 9th at UTC-5.
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let windows = day_windows(at("2024-06-10T01:30:00Z"), 1, &tz);

        assert_eq!(windows[0].label, "09 Jun");
        assert_eq!(windows[0].start, at("2024-06-09T05:00:00Z"));
        assert_eq!(windows[0].end, at("2024-06-10T04:59:59.999Z"));
    }

    #[test]
    fn test_day_windows_cross_month() {
        let windows = day_windows(at("2024-03-01T08:00:00Z"), 3, &Utc);
        let labels: Vec<&str> = windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["01 Mar", "29 Feb", "28 Feb"]);
    }

    #[test]
    fn test_minute_windows_half_open() {
        let now = at("2024-06-10T12:00:30Z");
        let windows = minute_windows(now, 2);

        let labels: Vec<&str> = windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["11:59", "11:58"]);

        assert_eq!(windows[0].start, at("2024-06-10T11:59:30Z"));
        assert_eq!(windows[0].end, now);
        assert_eq!(windows[1].end, windows[0].start);

        assert!(windows[0].contains(at("2024-06-10T11:59:30Z")));
        assert!(!windows[0].contains(now));
        assert!(!windows[1].contains(at("2024-06-10T11:59:30Z")));
    }

    #[test]
    fn test_windows_are_contiguous() {
        let windows = minute_windows(at("2024-06-10T12:00:30Z"), 30);
        assert_eq!(windows.len(), 30);
        for pair in windows.windows(2) {
            assert_eq!(pair[1].end, pair[0].start);
        }

        let days = day_windows(at("2024-06-10T12:00:00Z"), 7, &Utc);
        for pair in days.windows(2) {
            assert_eq!(pair[1].end + Duration::milliseconds(1), pair[0].start);
        }
    }

    #[test]
    fn test_zero_count_is_empty() {
        let now = at("2024-06-10T12:00:00Z");
        assert!(day_windows(now, 0, &Utc).is_empty());
        assert!(minute_windows(now, 0).is_empty());
        assert!(generate(WindowUnit::Day, 0, now, DayBoundary::Local).is_empty());
    }

    #[test]
    fn test_clamp_count() {
        assert_eq!(clamp_count(-3), 0);
        assert_eq!(clamp_count(0), 0);
        assert_eq!(clamp_count(7), 7);
        assert_eq!(clamp_count(i64::MAX), usize::try_from(i64::MAX).unwrap_or(usize::MAX));
    }

    #[test]
    fn test_day_windows_at_range_end_do_not_panic() {
        let east = FixedOffset::east_opt(3600).unwrap();
        let west = FixedOffset::west_opt(3600).unwrap();

        assert!(day_windows(DateTime::<Utc>::MAX_UTC, 2, &east).len() <= 2);
        assert!(day_windows(DateTime::<Utc>::MAX_UTC, 2, &west).len() <= 2);
        assert!(day_windows(DateTime::<Utc>::MIN_UTC, 2, &west).len() <= 2);
        assert!(minute_windows(DateTime::<Utc>::MIN_UTC, 2).is_empty());
    }

    #[test]
    fn test_fits() {
        let now = at("2024-06-10T12:00:30Z");
        assert!(fits(WindowUnit::Day, 7, now));
        assert!(fits(WindowUnit::Minute, 30, now));
        assert!(fits(WindowUnit::Day, 0, now));

        assert!(!fits(WindowUnit::Day, 1, DateTime::<Utc>::MAX_UTC));
        assert!(!fits(WindowUnit::Day, 7, DateTime::<Utc>::MIN_UTC));
        assert!(!fits(WindowUnit::Minute, 30, DateTime::<Utc>::MIN_UTC));
        assert!(!fits(WindowUnit::Minute, usize::MAX, now));
    }

    #[test]
    fn test_fitting_windows_have_requested_length() {
        let edge = DateTime::<Utc>::MIN_UTC + Duration::days(10);
        assert!(fits(WindowUnit::Day, 7, edge));
        assert_eq!(day_windows(edge, 7, &FixedOffset::west_opt(12 * 3600).unwrap()).len(), 7);
        assert_eq!(day_windows(edge, 7, &FixedOffset::east_opt(14 * 3600).unwrap()).len(), 7);
        assert!(fits(WindowUnit::Minute, 30, edge));
        assert_eq!(minute_windows(edge, 30).len(), 30);
    }

    /// UTC-3 with summer time at UTC-2. Clocks jump from 00:00 to 01:00 on
    /// 2024-03-10 and fall back from 00:00 to 23:00 on 2024-11-03, so
    /// midnight is skipped on one day and 23:xx repeats on another.
    #[derive(Debug, Clone, Copy)]
    struct MidnightDst;

    impl MidnightDst {
        fn standard() -> FixedOffset {
            FixedOffset::west_opt(3 * 3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::west_opt(2 * 3600).unwrap()
        }

        fn local(rfc3339_naive: &str) -> NaiveDateTime {
            NaiveDateTime::parse_from_str(rfc3339_naive, "%Y-%m-%dT%H:%M:%S").unwrap()
        }
    }

    impl TimeZone for MidnightDst {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            MidnightDst
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if *local < Self::local("2024-03-10T00:00:00") {
                LocalResult::Single(Self::standard())
            } else if *local < Self::local("2024-03-10T01:00:00") {
                LocalResult::None
            } else if *local < Self::local("2024-11-02T23:00:00") {
                LocalResult::Single(Self::summer())
            } else if *local < Self::local("2024-11-03T00:00:00") {
                LocalResult::Ambiguous(Self::summer(), Self::standard())
            } else {
                LocalResult::Single(Self::standard())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::local("2024-03-10T03:00:00") {
                Self::standard()
            } else if *utc < Self::local("2024-11-03T02:00:00") {
                Self::summer()
            } else {
                Self::standard()
            }
        }
    }

    #[test]
    fn test_skipped_midnight_starts_at_first_valid_instant() {
        let windows = day_windows(at("2024-03-10T12:00:00Z"), 2, &MidnightDst);

        assert_eq!(windows[0].label, "10 Mar");
        assert_eq!(windows[0].start, at("2024-03-10T03:00:00Z"));
        assert_eq!(windows[0].end, at("2024-03-11T01:59:59.999Z"));

        assert_eq!(windows[1].label, "09 Mar");
        assert_eq!(windows[1].start, at("2024-03-09T03:00:00Z"));
        assert_eq!(windows[1].end, at("2024-03-10T02:59:59.999Z"));
        assert_eq!(windows[1].end + Duration::milliseconds(1), windows[0].start);
    }

    #[test]
    fn test_repeated_hour_ends_at_latest_instant() {
        let windows = day_windows(at("2024-11-03T12:00:00Z"), 2, &MidnightDst);

        assert_eq!(windows[0].label, "03 Nov");
        assert_eq!(windows[0].start, at("2024-11-03T03:00:00Z"));

        assert_eq!(windows[1].label, "02 Nov");
        assert_eq!(windows[1].start, at("2024-11-02T02:00:00Z"));
        assert_eq!(windows[1].end, at("2024-11-03T02:59:59.999Z"));
        assert_eq!(windows[1].end + Duration::milliseconds(1), windows[0].start);
    }

    #[test]
    fn test_generate_dispatch() {
        let now = at("2024-06-10T12:00:30Z");
        let minutes = generate(WindowUnit::Minute, 5, now, DayBoundary::Utc);
        assert_eq!(minutes.len(), 5);
        assert!(minutes.iter().all(|w| w.bounds == WindowBounds::HalfOpen));

        let days = generate(WindowUnit::Day, 4, now, DayBoundary::Utc);
        assert_eq!(days.len(), 4);
        assert_eq!(days[0].label, "10 Jun");

        // Local boundary still yields one window per requested day.
        assert_eq!(generate(WindowUnit::Day, 4, now, DayBoundary::Local).len(), 4);
    }
}
