use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use log::info;

use crate::csv;
use crate::datetime;
use crate::kubrick::KubrickRepository;
use crate::report::build_report;

/// Arguments of the report run.
#[derive(Debug, clap::Args)]
pub struct ReportArgs {
    #[clap(help = "Client name to report on (exact, case-sensitive match)")]
    pub client_name: String,

    #[clap(
        help = "Start date in the format YYYY-MM-DD (default: 7 days ago)",
        parse(try_from_str = parse_date),
    )]
    pub start_date: Option<NaiveDate>,

    #[clap(
        help = "End date in the format YYYY-MM-DD (default: yesterday)",
        parse(try_from_str = parse_date),
    )]
    pub end_date: Option<NaiveDate>,
}

/// How a run ended. The two guided outcomes are not errors: the process
/// exits normally after printing a message, without writing a file.
#[derive(Debug, PartialEq)]
pub enum ReportOutcome {
    /// The given client name matched none of the fetched clients.
    UnknownClient {
        given: String,
        available: Vec<String>,
    },
    /// The date range produced zero report rows.
    Empty,
    /// The report was written.
    Saved { content: String, path: PathBuf },
}

pub struct ReportCommand<'a, T: KubrickRepository> {
    repo: &'a T,
}

impl<'a, T: KubrickRepository> ReportCommand<'a, T> {
    /// Returns a new `ReportCommand`.
    ///
    /// # Arguments
    /// * `repo` - repository for the Kubrick reporting API
    pub fn new(repo: &'a T) -> Self {
        Self { repo }
    }

    /// Runs the report workflow: fetch reference data, resolve the client
    /// and date range, fetch the report, flatten it, and write the CSV
    /// into `reports_dir`.
    ///
    /// Transport and filesystem errors propagate; the unknown-client and
    /// empty-report cases come back as guided outcomes instead.
    pub async fn run(&self, args: ReportArgs, reports_dir: &Path) -> Result<ReportOutcome> {
        let (clients, users) = tokio::try_join!(self.repo.read_clients(), self.repo.read_users())
            .context("Failed to retrieve reference data")?;
        info!("Fetched {} clients and {} users.", clients.len(), users.len());

        let selected = clients
            .iter()
            .find(|client| client.name == args.client_name)
            .cloned();
        let Some(selected) = selected else {
            return Ok(ReportOutcome::UnknownClient {
                given: args.client_name,
                available: clients.into_iter().map(|client| client.name).collect(),
            });
        };

        let (start_date, end_date) = resolve_date_range(args.start_date, args.end_date);

        let time_entries = self
            .repo
            .read_time_entries(start_date, end_date, &selected.id)
            .await
            .context("Failed to retrieve time entries")?;
        info!("Time entries retrieved successfully.");

        let user_names: HashMap<String, String> = users
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect();
        let rows = build_report(&time_entries, &user_names, &selected.name)?;

        if rows.is_empty() {
            return Ok(ReportOutcome::Empty);
        }

        let (content, path) = csv::save(reports_dir, &selected.name, &rows)?;

        Ok(ReportOutcome::Saved { content, path })
    }
}

/// Fills in missing date bounds.
///
/// Each bound defaults independently at day granularity: the start to
/// seven days before today, the end to yesterday (today excluded), both
/// local calendar days. Logs which dates are effective and why.
fn resolve_date_range(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> (NaiveDate, NaiveDate) {
    let today = datetime::now().with_timezone(&Local).date_naive();
    let start = start_date.unwrap_or_else(|| today - Duration::days(7));
    let end = end_date.unwrap_or_else(|| today - Duration::days(1));

    match (start_date, end_date) {
        (None, None) => info!(
            "No start or end date given. Using date range {} to {}.",
            start, end
        ),
        (None, Some(_)) => info!("No start date given. Using date range {} to {}.", start, end),
        (Some(_), None) => info!("No end date given. Using date range {} to {}.", start, end),
        (Some(_), Some(_)) => info!("Using date range {} to {}.", start, end),
    }

    (start, end)
}

/// Parses a `YYYY-MM-DD` calendar date.
fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::{DateTime, NaiveDate};

    use super::{parse_date, resolve_date_range, ReportArgs, ReportCommand, ReportOutcome};
    use crate::datetime::mock_datetime;
    use crate::kubrick::MockKubrickRepository;
    use crate::time_entry::{Client, TimeEntry, User};

    fn args(client_name: &str, start: Option<&str>, end: Option<&str>) -> ReportArgs {
        ReportArgs {
            client_name: client_name.to_string(),
            start_date: start.map(|s| parse_date(s).unwrap()),
            end_date: end.map(|s| parse_date(s).unwrap()),
        }
    }

    fn dummy_clients() -> Vec<Client> {
        vec![
            Client {
                id: "c1".to_string(),
                name: "Acme Corp".to_string(),
            },
            Client {
                id: "c2".to_string(),
                name: "Globex".to_string(),
            },
        ]
    }

    fn dummy_entry() -> TimeEntry {
        TimeEntry {
            user_id: "u1".to_string(),
            project: "Website".to_string(),
            description: "Fix login".to_string(),
            tag_id: Some(2),
            billable: true,
            started_at: "2024-03-04T12:00:00.000Z".to_string(),
            finished_at: "2024-03-04T13:30:00.000Z".to_string(),
            duration: 5400,
        }
    }

    /// Midday UTC keeps the local date equal to the UTC date in the time
    /// zones the tests run in.
    fn set_today(date: &str) {
        let datetime = format!("{}T12:00:00+00:00", date);
        mock_datetime::set_mock_time(DateTime::parse_from_rfc3339(&datetime).unwrap().to_utc());
    }

    #[tokio::test]
    async fn test_run_unknown_client_lists_available_names() {
        let mut repo = MockKubrickRepository::new();
        repo.expect_read_clients()
            .times(1)
            .returning(|| Ok(dummy_clients()));
        repo.expect_read_users().times(1).returning(|| Ok(vec![]));
        repo.expect_read_time_entries().never();

        let command = ReportCommand::new(&repo);
        let outcome = command
            .run(args("Initech", None, None), Path::new("reports"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReportOutcome::UnknownClient {
                given: "Initech".to_string(),
                available: vec!["Acme Corp".to_string(), "Globex".to_string()],
            }
        );
    }

    /// Client matching is exact and case-sensitive.
    #[tokio::test]
    async fn test_run_client_match_is_case_sensitive() {
        let mut repo = MockKubrickRepository::new();
        repo.expect_read_clients()
            .times(1)
            .returning(|| Ok(dummy_clients()));
        repo.expect_read_users().times(1).returning(|| Ok(vec![]));
        repo.expect_read_time_entries().never();

        let command = ReportCommand::new(&repo);
        let outcome = command
            .run(args("acme corp", None, None), Path::new("reports"))
            .await
            .unwrap();

        assert!(matches!(outcome, ReportOutcome::UnknownClient { .. }));
    }

    #[tokio::test]
    async fn test_run_empty_report_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = MockKubrickRepository::new();
        repo.expect_read_clients()
            .times(1)
            .returning(|| Ok(dummy_clients()));
        repo.expect_read_users().times(1).returning(|| Ok(vec![]));
        repo.expect_read_time_entries()
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        let command = ReportCommand::new(&repo);
        let outcome = command
            .run(args("Acme Corp", Some("2024-03-01"), Some("2024-03-07")), dir.path())
            .await
            .unwrap();

        assert_eq!(outcome, ReportOutcome::Empty);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    /// Explicit dates and the resolved client id reach the repository
    /// unchanged.
    #[tokio::test]
    async fn test_run_passes_explicit_dates_and_client_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = MockKubrickRepository::new();
        repo.expect_read_clients()
            .times(1)
            .returning(|| Ok(dummy_clients()));
        repo.expect_read_users().times(1).returning(|| Ok(vec![]));
        repo.expect_read_time_entries()
            .withf(|start, end, client_id| {
                *start == NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
                    && *end == NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
                    && client_id == "c2"
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        let command = ReportCommand::new(&repo);
        let outcome = command
            .run(args("Globex", Some("2024-03-01"), Some("2024-03-07")), dir.path())
            .await
            .unwrap();

        assert_eq!(outcome, ReportOutcome::Empty);
    }

    #[tokio::test]
    async fn test_run_default_date_range() {
        set_today("2024-03-15");
        let mut repo = MockKubrickRepository::new();
        repo.expect_read_clients()
            .times(1)
            .returning(|| Ok(dummy_clients()));
        repo.expect_read_users().times(1).returning(|| Ok(vec![]));
        repo.expect_read_time_entries()
            .withf(|start, end, _| {
                *start == NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
                    && *end == NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        let command = ReportCommand::new(&repo);
        let outcome = command
            .run(args("Acme Corp", None, None), Path::new("reports"))
            .await
            .unwrap();

        assert_eq!(outcome, ReportOutcome::Empty);
        mock_datetime::clear_mock_time();
    }

    #[tokio::test]
    async fn test_run_saves_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = MockKubrickRepository::new();
        repo.expect_read_clients()
            .times(1)
            .returning(|| Ok(dummy_clients()));
        repo.expect_read_users().times(1).returning(|| {
            Ok(vec![User {
                id: "u1".to_string(),
                name: "Jane Doe".to_string(),
            }])
        });
        repo.expect_read_time_entries()
            .times(1)
            .returning(|_, _, _| Ok(vec![dummy_entry()]));

        let command = ReportCommand::new(&repo);
        let outcome = command
            .run(args("Acme Corp", Some("2024-03-01"), Some("2024-03-07")), dir.path())
            .await
            .unwrap();

        let ReportOutcome::Saved { content, path } = outcome else {
            panic!("expected Saved outcome");
        };
        assert!(path.starts_with(dir.path()));
        assert!(content.starts_with("User,Client,"));
        assert!(content.contains("Jane Doe,Acme Corp,Website,Fix login"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
    }

    /// Each missing bound defaults independently.
    #[test]
    fn test_resolve_date_range_defaults() {
        set_today("2024-03-15");
        let explicit = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let default_start = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let default_end = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();

        assert_eq!(resolve_date_range(None, None), (default_start, default_end));
        assert_eq!(
            resolve_date_range(Some(explicit), None),
            (explicit, default_end)
        );
        assert_eq!(
            resolve_date_range(None, Some(explicit)),
            (default_start, explicit)
        );
        assert_eq!(
            resolve_date_range(Some(explicit), Some(explicit)),
            (explicit, explicit)
        );
        mock_datetime::clear_mock_time();
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(parse_date("2024-3-1x").is_err());
        assert!(parse_date("not-a-date").is_err());
    }
}
