//! Status classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::ProgressRecord;

/// Lifecycle state of one enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    NotStarted,
    Active,
    AtRisk,
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "not-started",
            Status::Active => "active",
            Status::AtRisk => "at-risk",
            Status::Completed => "completed",
        }
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a progress record (or its absence). Total over every input.
///
/// Rules, first match wins:
/// 1. no record: not-started
/// 2. progress is 100: completed
/// 3. no recorded activity, or more than `stale_days` whole days idle: at-risk
/// 4. otherwise: active
pub fn classify(record: Option<&ProgressRecord>, now: DateTime<Utc>, stale_days: u32) -> Status {
    let Some(record) = record else {
        return Status::NotStarted;
    };
    if record.progress_percent() >= 100.0 {
        return Status::Completed;
    }
    match record.last_activity_at {
        None => Status::AtRisk,
        Some(last) if (now - last).num_days() > i64::from(stale_days) => Status::AtRisk,
        Some(_) => Status::Active,
    }
}

/// Derived view of one enrollment. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub status: Status,
    pub progress_percent: f64,
    pub days_since_enrollment: i64,
}

impl Classification {
    pub fn of(
        record: Option<&ProgressRecord>,
        enrolled_at: DateTime<Utc>,
        now: DateTime<Utc>,
        stale_days: u32,
    ) -> Self {
        Self {
            status: classify(record, now, stale_days),
            progress_percent: record.map_or(0.0, ProgressRecord::progress_percent),
            days_since_enrollment: (now - enrolled_at).num_days().max(0),
        }
    }
}
