//! Time-bucketed chart series for the analytics dashboard.
//!
//! Turns lists of timestamped sessions and tasks into fixed-width day or
//! minute buckets, oldest first, ready for a charting library. The same
//! projections are served over HTTP by the `chart-series` binary.

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod projections;
pub mod windows;


pub use classifier::{parse_created_at, StatusCounts};
pub use models::{BucketedCount, Session, StatusBucketedCount, Task, TaskFlag};
pub use projections::{
    counts_per_day, counts_per_minute, task_counts_per_day_by_status,
    task_counts_per_minute_by_status, Bucketer, Series, StatusBreakdown,
};
pub use windows::{DayBoundary, TimeWindow, WindowUnit};
