use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Externally owned completion data for one (identity, unit) pair.
///
/// Values arrive from a store this system does not control, so
/// `overall_progress` may be out of range or NaN. Read it through
/// [`ProgressRecord::progress_percent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub overall_progress: f64,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_units: u32,
    #[serde(default)]
    pub total_units: u32,
    #[serde(default)]
    pub current_module: Option<String>,
}

impl ProgressRecord {
    pub fn new(overall_progress: f64, last_activity_at: Option<DateTime<Utc>>) -> Self {
        Self {
            overall_progress,
            last_activity_at,
            completed_units: 0,
            total_units: 0,
            current_module: None,
        }
    }

    pub fn with_units(mut self, completed: u32, total: u32) -> Self {
        self.completed_units = completed;
        self.total_units = total;
        self
    }

    pub fn with_current_module(mut self, module: impl Into<String>) -> Self {
        self.current_module = Some(module.into());
        self
    }

    /// Progress clamped to `[0, 100]`; NaN reads as 0.
    pub fn progress_percent(&self) -> f64 {
        normalize_percent(self.overall_progress)
    }
}

pub(crate) fn normalize_percent(raw: f64) -> f64 {
    if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) }
}
