use serde::Deserialize;

/// A client as returned by the reporting API.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Client {
    pub id: String,
    pub name: String,
}

/// A user as returned by the reporting API. Only used to build the
/// user-id to display-name mapping.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// One tracked block of work for a client, as reported by the server.
///
/// `started_at` and `finished_at` keep the server's timestamp strings
/// untouched because the CSV output passes them through verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeEntry {
    pub user_id: String,
    pub project: String,
    pub description: String,
    pub tag_id: Option<i64>,
    pub billable: bool,
    pub started_at: String,
    pub finished_at: String,
    /// Duration in seconds.
    pub duration: i64,
}
