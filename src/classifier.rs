use chrono::{DateTime, Utc};

use crate::models::{CreatedAt, StatusRecord, TaskFlag, TimestampedRecord};
use crate::windows::TimeWindow;

/// Turns a raw `created_at` (epoch seconds) into an instant.
///
/// Fractional seconds are truncated to the millisecond. Returns `None` for
/// anything that is not a finite number or a numeric string, including the
/// empty string.
pub fn parse_created_at(raw: &CreatedAt) -> Option<DateTime<Utc>> {
    let seconds = match raw {
        CreatedAt::Seconds(number) => number.as_f64()?,
        CreatedAt::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            text.parse::<f64>().ok()?
        }
        CreatedAt::Other(_) => return None,
    };

    if !seconds.is_finite() {
        return None;
    }

    let millis = (seconds * 1000.0).trunc();
    if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

pub fn record_instant<R: TimestampedRecord>(record: &R) -> Option<DateTime<Utc>> {
    record.created_at().and_then(parse_created_at)
}

/// Per-outcome counts for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub success: usize,
    pub failure: usize,
    pub undefined: usize,
}

impl StatusCounts {
    pub fn record(&mut self, flag: TaskFlag) {
        match flag {
            TaskFlag::Success => self.success += 1,
            TaskFlag::Failure => self.failure += 1,
            TaskFlag::Unset => self.undefined += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failure + self.undefined
    }
}

/// Records whose `created_at` parsed, paired with their instant.
///
/// Parsing happens once here, so classifying against many windows does not
/// re-read timestamps. Records that fail to parse are only counted in
/// `excluded`.
pub struct ParsedRecords<'a, R> {
    entries: Vec<(DateTime<Utc>, &'a R)>,
    excluded: usize,
}

impl<'a, R: TimestampedRecord> ParsedRecords<'a, R> {
    pub fn parse(records: &'a [R]) -> Self {
        let entries: Vec<_> = records
            .iter()
            .filter_map(|record| record_instant(record).map(|instant| (instant, record)))
            .collect();
        let excluded = records.len() - entries.len();

        Self { entries, excluded }
    }

    pub fn excluded(&self) -> usize {
        self.excluded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a R> + '_ {
        self.entries.iter().map(|(_, record)| *record)
    }

    pub fn count_in(&self, window: &TimeWindow) -> usize {
        self.entries
            .iter()
            .filter(|(instant, _)| window.contains(*instant))
            .count()
    }
}

impl<'a, R: StatusRecord> ParsedRecords<'a, R> {
    pub fn count_by_status_in(&self, window: &TimeWindow) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for (instant, record) in &self.entries {
            if window.contains(*instant) {
                counts.record(record.flag());
            }
        }
        counts
    }
}

/// Number of records inside `window`.
pub fn count_in_window<R: TimestampedRecord>(records: &[R], window: &TimeWindow) -> usize {
    ParsedRecords::parse(records).count_in(window)
}

/// Records inside `window`, split by outcome.
pub fn count_by_status_in_window<R: StatusRecord>(
    records: &[R],
    window: &TimeWindow,
) -> StatusCounts {
    ParsedRecords::parse(records).count_by_status_in(window)
}
