use std::env;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, SecondsFormat, TimeZone, Utc};
use log::info;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client as HttpClient,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::time_entry::{Client, TimeEntry, User};

const API_URL: &str = "https://api.kubrick.moove-it.com/graphql";

/// Single page ceiling of the paginated report. There is no multi-page
/// loop; result sets beyond this are silently truncated by the server's
/// pagination contract.
const REPORT_PAGE_SIZE: i64 = 1000;

const CLIENTS_QUERY: &str = "{
  clients {
    name
    id
  }
}";

const USERS_QUERY: &str = "{
  users {
    name
    id
  }
}";

const REPORT_QUERY: &str = "query TimeEntriesReport($input: ReportTimeEntryPaginatedInput!) {
  timeEntriesReportPaginated(input: $input) {
    timeEntries {
      userId
      project {
        name
      }
      description
      tagId
      billable
      startedAt
      finishedAt
      duration
    }
  }
}";

/// GraphQL request body.
#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    operation_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<serde_json::Value>,
}

/// GraphQL response envelope. Anything without a `data` field is a
/// malformed response and fails deserialization.
#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ClientsData {
    clients: Vec<Client>,
}

#[derive(Debug, Deserialize)]
struct UsersData {
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct ReportData {
    #[serde(rename = "timeEntriesReportPaginated")]
    time_entries_report_paginated: ReportPage,
}

#[derive(Debug, Deserialize)]
struct ReportPage {
    #[serde(rename = "timeEntries")]
    time_entries: Vec<RawTimeEntry>,
}

/// A time entry as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimeEntry {
    user_id: String,
    project: RawProject,
    description: String,
    tag_id: Option<i64>,
    billable: bool,
    started_at: String,
    finished_at: String,
    duration: i64,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    name: String,
}

/// Read operations against the Kubrick reporting API.
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait KubrickRepository {
    /// Lists all clients of the workspace.
    async fn read_clients(&self) -> Result<Vec<Client>>;

    /// Lists all users of the workspace.
    async fn read_users(&self) -> Result<Vec<User>>;

    /// Reads all time entries for a client between the start of
    /// `start_date` and the end of `end_date` (inclusive, local time zone),
    /// sorted ascending by start time.
    async fn read_time_entries(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        client_id: &str,
    ) -> Result<Vec<TimeEntry>>;
}

/// Client for the Kubrick GraphQL endpoint.
///
/// # Examples
///
/// ```ignore
/// let client = KubrickClient::new()?;
/// let clients = client.read_clients().await?;
/// ```
pub struct KubrickClient {
    client: HttpClient,
    endpoint: String,
    auth_token: String,
}

impl KubrickClient {
    /// Returns a new `KubrickClient`.
    ///
    /// Fails when the `AUTH_TOKEN` environment variable is not set. The
    /// token is sent verbatim as the `authorization` header on every call.
    pub fn new() -> Result<Self> {
        let auth_token = env::var("AUTH_TOKEN").context("AUTH_TOKEN must be set")?;

        Ok(Self {
            client: HttpClient::new(),
            endpoint: API_URL.to_string(),
            auth_token,
        })
    }

    #[cfg(test)]
    fn with_endpoint(endpoint: String, auth_token: String) -> Self {
        Self {
            client: HttpClient::new(),
            endpoint,
            auth_token,
        }
    }

    /// Performs one GraphQL request and unwraps the `data` envelope.
    ///
    /// Network errors and non-2xx statuses propagate; there is no retry.
    async fn request<T: DeserializeOwned>(&self, body: &GraphqlRequest<'_>) -> Result<T> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.auth_token)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Kubrick API at {}", self.endpoint))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<GraphqlResponse<T>>()
            .await
            .context("Failed to deserialize response")?;

        Ok(response.data)
    }
}

impl KubrickRepository for KubrickClient {
    async fn read_clients(&self) -> Result<Vec<Client>> {
        let data: ClientsData = self
            .request(&GraphqlRequest {
                query: CLIENTS_QUERY,
                operation_name: None,
                variables: None,
            })
            .await
            .context("Failed to get client list from Kubrick")?;

        Ok(data.clients)
    }

    async fn read_users(&self) -> Result<Vec<User>> {
        let data: UsersData = self
            .request(&GraphqlRequest {
                query: USERS_QUERY,
                operation_name: None,
                variables: None,
            })
            .await
            .context("Failed to get user list from Kubrick")?;

        Ok(data.users)
    }

    async fn read_time_entries(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        client_id: &str,
    ) -> Result<Vec<TimeEntry>> {
        let from = local_day_start(start_date)?.to_rfc3339_opts(SecondsFormat::Millis, true);
        let to = local_day_end(end_date)?.to_rfc3339_opts(SecondsFormat::Millis, true);

        let variables = json!({
            "input": {
                "filter": {
                    "userIds": null,
                    "clientIds": [client_id],
                    "projectIds": null,
                    "tagIds": null,
                    "description": null,
                    "from": from,
                    "to": to,
                },
                "skip": 0,
                "take": REPORT_PAGE_SIZE,
                "sortAttribute": "started_at",
                "sortDirection": "ASC",
            },
        });

        let data: ReportData = self
            .request(&GraphqlRequest {
                query: REPORT_QUERY,
                operation_name: Some("TimeEntriesReport"),
                variables: Some(variables),
            })
            .await
            .context("Failed to get time entries report from Kubrick")?;

        let raw_entries = data.time_entries_report_paginated.time_entries;
        info!("length of time entries: {}", raw_entries.len());

        let time_entries = raw_entries
            .into_iter()
            .map(|entry| TimeEntry {
                user_id: entry.user_id,
                project: entry.project.name,
                description: entry.description,
                tag_id: entry.tag_id,
                billable: entry.billable,
                started_at: entry.started_at,
                finished_at: entry.finished_at,
                duration: entry.duration,
            })
            .collect();

        Ok(time_entries)
    }
}

/// Start of the given day (00:00:00.000) in the local time zone, as UTC.
fn local_day_start(date: NaiveDate) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .context("Failed to set hour, minute, and second")?;
    let datetime = Local
        .from_local_datetime(&naive)
        .single()
        .with_context(|| format!("Failed to convert {} to DateTime<Local>", naive))?;

    Ok(datetime.to_utc())
}

/// End of the given day (23:59:59.999) in the local time zone, as UTC.
fn local_day_end(date: NaiveDate) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .context("Failed to set hour, minute, and second")?;
    let datetime = Local
        .from_local_datetime(&naive)
        .single()
        .with_context(|| format!("Failed to convert {} to DateTime<Local>", naive))?;

    Ok(datetime.to_utc())
}
