//! Dashboard rows, summary statistics and ranking.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use seatwise_core::{MemberId, UnitId};

use crate::classify::Status;

/// One (member, enrollment) line of the administrator view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRow {
    pub member_id: MemberId,
    pub display_name: String,
    pub contact_address: String,
    pub job_title: Option<String>,
    pub unit_id: UnitId,
    pub unit_title: String,
    pub current_module: Option<String>,
    pub completed_units: u32,
    pub total_units: u32,
    pub progress_percent: f64,
    pub status: Status,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub enrolled_at: DateTime<Utc>,
    pub days_since_enrollment: i64,
    /// Progress could not be fetched; the row is shown as not-started and left
    /// out of the summary.
    pub data_unavailable: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_members: usize,
    pub active_members: usize,
    pub completed_count: usize,
    pub at_risk_count: usize,
    pub average_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub summary: Summary,
    pub rows: Vec<MemberRow>,
}

/// Summary statistics over rows whose data was available.
///
/// `total_members` is the number of active roster members enumerated, which
/// includes members without any enrollment.
pub fn summarize(total_members: usize, rows: &[MemberRow]) -> Summary {
    let available: Vec<&MemberRow> = rows.iter().filter(|r| !r.data_unavailable).collect();

    let active_members = available
        .iter()
        .filter(|r| r.status == Status::Active)
        .map(|r| r.member_id)
        .collect::<HashSet<_>>()
        .len();

    let average_progress = if available.is_empty() {
        0.0
    } else {
        available.iter().map(|r| r.progress_percent).sum::<f64>() / available.len() as f64
    };

    Summary {
        total_members,
        active_members,
        completed_count: available.iter().filter(|r| r.status == Status::Completed).count(),
        at_risk_count: available.iter().filter(|r| r.status == Status::AtRisk).count(),
        average_progress,
    }
}

/// Total order: at-risk first, then ascending progress, then member id, then
/// unit id.
pub fn compare_rows(a: &MemberRow, b: &MemberRow) -> Ordering {
    let a_risk = a.status == Status::AtRisk;
    let b_risk = b.status == Status::AtRisk;
    b_risk
        .cmp(&a_risk)
        .then_with(|| a.progress_percent.total_cmp(&b.progress_percent))
        .then_with(|| a.member_id.cmp(&b.member_id))
        .then_with(|| a.unit_id.cmp(&b.unit_id))
}

pub fn rank(rows: &mut [MemberRow]) {
    rows.sort_by(compare_rows);
}
