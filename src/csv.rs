use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::datetime;
use crate::report::ReportRow;

/// Column order of the report. Fixed; every row renders in this order.
pub const HEADERS: [&str; 10] = [
    "User",
    "Client",
    "Project",
    "Description",
    "Tag",
    "Billable?",
    "Start Date",
    "Start",
    "Finish",
    "Duration In Hours",
];

const LINE_TERMINATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Renders report rows as CSV text: header line plus one line per row,
/// joined by the platform line terminator, no trailing terminator.
///
/// String fields are sanitized by removing literal commas instead of
/// quoting. This is lossy but keeps the output byte-compatible with
/// previously generated reports.
pub fn render(rows: &[ReportRow]) -> String {
    let mut lines = vec![HEADERS.join(",")];
    lines.extend(rows.iter().map(|row| row_fields(row).join(",")));

    lines.join(LINE_TERMINATOR)
}

/// Writes the report for a client into `reports_dir` and returns the
/// written content together with the resolved path.
///
/// The directory must already exist; a missing directory propagates as an
/// I/O error, matching the no-fallback contract of the output path.
pub fn save(reports_dir: &Path, client_name: &str, rows: &[ReportRow]) -> Result<(String, PathBuf)> {
    let content = render(rows);
    let run_at = datetime::now().with_timezone(&Local);
    let path = reports_dir.join(file_name(client_name, &run_at));

    fs::write(&path, &content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok((content, path))
}

/// `<client name with whitespace runs replaced by hyphens>_<%Y%m%d-%H%M%S>.csv`
fn file_name(client_name: &str, run_at: &DateTime<Local>) -> String {
    let slug = client_name.split_whitespace().collect::<Vec<_>>().join("-");

    format!("{}_{}.csv", slug, run_at.format("%Y%m%d-%H%M%S"))
}

fn row_fields(row: &ReportRow) -> Vec<String> {
    vec![
        sanitize(row.user.as_deref().unwrap_or("")),
        sanitize(&row.client),
        sanitize(&row.project),
        sanitize(&row.description),
        sanitize(&row.tag),
        sanitize(&row.billable),
        sanitize(&row.start_date),
        sanitize(&row.start),
        sanitize(&row.finish),
        // Numeric field, minimal formatting: 1.5, 1.02, 8.
        format!("{}", row.duration_in_hours),
    ]
}

fn sanitize(value: &str) -> String {
    value.replace(',', "")
}
