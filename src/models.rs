use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::windows::WindowUnit;

/// `created_at` as the backend sends it: epoch seconds, as a number or a numeric string.
///
/// Anything else lands in `Other` so that one bad record never rejects the
/// whole payload; the classifier drops it instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatedAt {
    Seconds(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl From<i64> for CreatedAt {
    fn from(seconds: i64) -> Self {
        CreatedAt::Seconds(seconds.into())
    }
}

impl From<&str> for CreatedAt {
    fn from(text: &str) -> Self {
        CreatedAt::Text(text.to_string())
    }
}

/// Outcome flag of a task. Every raw value other than `"success"` and
/// `"failure"` (missing, null, `"undefined"`, anything new) is `Unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskFlag {
    Success,
    Failure,
    #[default]
    Unset,
}

impl TaskFlag {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("success") => TaskFlag::Success,
            Some("failure") => TaskFlag::Failure,
            _ => TaskFlag::Unset,
        }
    }

    /// Name of the chart bucket this flag is counted in.
    pub fn bucket_name(&self) -> &'static str {
        match self {
            TaskFlag::Success => "success",
            TaskFlag::Failure => "failure",
            TaskFlag::Unset => "undefined",
        }
    }
}

impl<'de> Deserialize<'de> for TaskFlag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(TaskFlag::from_raw(raw.as_ref().and_then(|v| v.as_str())))
    }
}

impl Serialize for TaskFlag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TaskFlag::Success => serializer.serialize_str("success"),
            TaskFlag::Failure => serializer.serialize_str("failure"),
            TaskFlag::Unset => serializer.serialize_none(),
        }
    }
}

/// Anything that can be placed on a timeline.
pub trait TimestampedRecord {
    fn created_at(&self) -> Option<&CreatedAt>;
}

/// A timestamped record that also carries an outcome flag.
pub trait StatusRecord: TimestampedRecord {
    fn flag(&self) -> TaskFlag;
}

/// Session as returned by the analytics backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<CreatedAt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TimestampedRecord for Session {
    fn created_at(&self) -> Option<&CreatedAt> {
        self.created_at.as_ref()
    }
}

/// Task as returned by the analytics backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<CreatedAt>,
    #[serde(default)]
    pub flag: TaskFlag,
}

impl TimestampedRecord for Task {
    fn created_at(&self) -> Option<&CreatedAt> {
        self.created_at.as_ref()
    }
}

impl StatusRecord for Task {
    fn flag(&self) -> TaskFlag {
        self.flag
    }
}

/// One chart point: records per window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketedCount {
    pub name: String,
    pub total: usize,
}

/// One chart point split by task outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBucketedCount {
    pub name: String,
    pub success: usize,
    pub failure: usize,
    pub undefined: usize,
}

impl StatusBucketedCount {
    pub fn total(&self) -> usize {
        self.success + self.failure + self.undefined
    }
}

/// Series request body
#[derive(Debug, Deserialize)]
pub struct SeriesRequest<R> {
    pub records: Vec<R>,
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub minutes: Option<i64>,
    /// Reference instant in epoch seconds; the server clock when absent.
    #[serde(default)]
    pub now: Option<i64>,
}

/// Series response body
#[derive(Debug, Serialize, Deserialize)]
pub struct SeriesResponse<T> {
    pub unit: WindowUnit,
    pub generated_at: DateTime<Utc>,
    pub series: Vec<T>,
    pub excluded: usize,
}

/// Breakdown request body
#[derive(Debug, Deserialize)]
pub struct BreakdownRequest {
    pub records: Vec<Task>,
}

/// API Response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}
