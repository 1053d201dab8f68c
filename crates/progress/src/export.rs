//! CSV rendering of dashboard rows (RFC 4180: CRLF line endings, fields quoted
//! only when they contain a comma, quote or line break).

use crate::view::MemberRow;

pub const CSV_HEADER: [&str; 13] = [
    "Member Name",
    "Email",
    "Job Title",
    "Unit",
    "Progress (%)",
    "Current Module",
    "Completed Units",
    "Total Units",
    "Status",
    "Last Activity",
    "Days Since Enrollment",
    "Enrolled At",
    "Data Unavailable",
];

/// Render rows in the given order, header first. An empty slice yields the
/// header line only.
pub fn to_csv(rows: &[MemberRow]) -> String {
    let mut out = String::new();
    push_record(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));
    for row in rows {
        push_record(
            &mut out,
            [
                row.display_name.clone(),
                row.contact_address.clone(),
                row.job_title.clone().unwrap_or_default(),
                row.unit_title.clone(),
                format!("{:.1}", row.progress_percent),
                row.current_module.clone().unwrap_or_default(),
                row.completed_units.to_string(),
                row.total_units.to_string(),
                row.status.to_string(),
                row.last_activity_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string()),
                row.days_since_enrollment.to_string(),
                row.enrolled_at.to_rfc3339(),
                row.data_unavailable.to_string(),
            ],
        );
    }
    out
}

fn push_record(out: &mut String, fields: impl IntoIterator<Item = String>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, &field);
    }
    out.push_str("\r\n");
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
