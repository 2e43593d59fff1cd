use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::tags;
use crate::time_entry::TimeEntry;

/// One flattened, display-ready row of the CSV report.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    /// Display name of the user; `None` when the user id is not in the
    /// fetched user set (a gap in the report, not an error).
    pub user: Option<String>,
    pub client: String,
    pub project: String,
    pub description: String,
    pub tag: String,
    /// Exactly `"Yes"` or `"No"`.
    pub billable: String,
    /// Date portion of the start timestamp, `YYYY-MM-DD`, local time zone.
    pub start_date: String,
    pub start: String,
    pub finish: String,
    /// Duration in hours, rounded half-up to two decimal places.
    pub duration_in_hours: f64,
}

/// Flattens raw time entries into report rows.
///
/// Rows come out in input order; nothing is dropped, reordered, or
/// deduplicated. The server already sorts entries ascending by start time.
pub fn build_report(
    entries: &[TimeEntry],
    user_names: &HashMap<String, String>,
    client_name: &str,
) -> Result<Vec<ReportRow>> {
    entries
        .iter()
        .map(|entry| {
            let started_at = DateTime::parse_from_rfc3339(&entry.started_at)
                .with_context(|| format!("Failed to parse start timestamp: {}", entry.started_at))?;

            Ok(ReportRow {
                user: user_names.get(&entry.user_id).cloned(),
                client: client_name.to_string(),
                project: entry.project.clone(),
                description: entry.description.clone(),
                tag: entry.tag_id.map(tags::label).unwrap_or("").to_string(),
                billable: if entry.billable { "Yes" } else { "No" }.to_string(),
                start_date: started_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d")
                    .to_string(),
                start: entry.started_at.clone(),
                finish: entry.finished_at.clone(),
                duration_in_hours: duration_hours(entry.duration),
            })
        })
        .collect()
}

/// Seconds to hours, rounded half-up to two decimal places.
fn duration_hours(seconds: i64) -> f64 {
    (seconds as f64 / 3600.0 * 100.0).round() / 100.0
}
