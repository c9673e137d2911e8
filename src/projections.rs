use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{ParsedRecords, StatusCounts};
use crate::models::{
    BucketedCount, StatusBucketedCount, StatusRecord, TaskFlag, TimestampedRecord,
};
use crate::windows::{self, DayBoundary, TimeWindow, WindowUnit};


/// Reorders a newest-first series so the oldest point comes first.
pub fn chronological<T>(mut newest_first: Vec<T>) -> Vec<T> {
    newest_first.reverse();
    newest_first
}

/// Chart-ready points plus how many input records could not be placed on the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series<T> {
    pub points: Vec<T>,
    pub excluded: usize,
}

/// Projects timestamped records onto a fixed run of windows ending at `now`.
///
/// `now` is captured once when the bucketer is built; pass the same
/// bucketer (or the same `at(..)`) to keep several charts on one axis.
#[derive(Debug, Clone)]
pub struct Bucketer {
    unit: WindowUnit,
    count: usize,
    now: DateTime<Utc>,
    boundary: DayBoundary,
}

impl Bucketer {
    pub fn new(unit: WindowUnit, count: usize) -> Self {
        Self {
            unit,
            count,
            now: Utc::now(),
            boundary: DayBoundary::default(),
        }
    }

    pub fn daily(days: usize) -> Self {
        Self::new(WindowUnit::Day, days)
    }

    pub fn minutely(minutes: usize) -> Self {
        Self::new(WindowUnit::Minute, minutes)
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_day_boundary(mut self, boundary: DayBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn unit(&self) -> WindowUnit {
        self.unit
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Windows newest first.
    pub fn windows(&self) -> Vec<TimeWindow> {
        windows::generate(self.unit, self.count, self.now, self.boundary)
    }

    pub fn counts<R: TimestampedRecord>(&self, records: &[R]) -> Series<BucketedCount> {
        let parsed = ParsedRecords::parse(records);
        let newest_first: Vec<BucketedCount> = self
            .windows()
            .into_iter()
            .map(|window| BucketedCount {
                total: parsed.count_in(&window),
                name: window.label,
            })
            .collect();

        self.finish(newest_first, parsed.excluded())
    }

    pub fn status_counts<R: StatusRecord>(&self, records: &[R]) -> Series<StatusBucketedCount> {
        let parsed = ParsedRecords::parse(records);
        let newest_first: Vec<StatusBucketedCount> = self
            .windows()
            .into_iter()
            .map(|window| {
                let counts = parsed.count_by_status_in(&window);
                StatusBucketedCount {
                    name: window.label,
                    success: counts.success,
                    failure: counts.failure,
                    undefined: counts.undefined,
                }
            })
            .collect();

        self.finish(newest_first, parsed.excluded())
    }

    fn finish<T>(&self, newest_first: Vec<T>, excluded: usize) -> Series<T> {
        debug!(
            unit = ?self.unit,
            windows = newest_first.len(),
            excluded,
            "bucketed records"
        );
        Series {
            points: chronological(newest_first),
            excluded,
        }
    }
}

/// Records per local calendar day, oldest day first.
pub fn counts_per_day<R: TimestampedRecord>(
    records: &[R],
    days: usize,
    now: DateTime<Utc>,
) -> Vec<BucketedCount> {
    Bucketer::daily(days).at(now).counts(records).points
}

/// Tasks per local calendar day split by outcome, oldest day first.
pub fn task_counts_per_day_by_status<R: StatusRecord>(
    records: &[R],
    days: usize,
    now: DateTime<Utc>,
) -> Vec<StatusBucketedCount> {
    Bucketer::daily(days).at(now).status_counts(records).points
}

/// Records per minute, oldest minute first.
pub fn counts_per_minute<R: TimestampedRecord>(
    records: &[R],
    minutes: usize,
    now: DateTime<Utc>,
) -> Vec<BucketedCount> {
    Bucketer::minutely(minutes).at(now).counts(records).points
}

/// Tasks per minute split by outcome, oldest minute first.
pub fn task_counts_per_minute_by_status<R: StatusRecord>(
    records: &[R],
    minutes: usize,
    now: DateTime<Utc>,
) -> Vec<StatusBucketedCount> {
    Bucketer::minutely(minutes).at(now).status_counts(records).points
}

/// Overall task outcomes, independent of any window
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub statuses: Vec<StatusShare>,
    pub total: usize,
    /// `success / (success + failure)`; `None` until some task has an outcome.
    pub success_rate: Option<f64>,
    pub excluded: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusShare {
    pub status: String,
    pub count: usize,
    pub percentage: f64,
}

impl StatusBreakdown {
    pub fn from_tasks<R: StatusRecord>(records: &[R]) -> Self {
        let parsed = ParsedRecords::parse(records);
        let mut counts = StatusCounts::default();
        for record in parsed.iter() {
            counts.record(record.flag());
        }

        let total = counts.total();
        let mut statuses: Vec<StatusShare> = [
            (TaskFlag::Success, counts.success),
            (TaskFlag::Failure, counts.failure),
            (TaskFlag::Unset, counts.undefined),
        ]
        .into_iter()
        .map(|(flag, count)| StatusShare {
            status: flag.bucket_name().to_string(),
            count,
            percentage: if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 },
        })
        .collect();

        statuses.sort_by(|a, b| b.count.cmp(&a.count));

        let decided = counts.success + counts.failure;
        let success_rate = if decided > 0 {
            Some(counts.success as f64 / decided as f64)
        } else {
            None
        };

        Self {
            statuses,
            total,
            success_rate,
            excluded: parsed.excluded(),
        }
    }
}
