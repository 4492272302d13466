//! Typed requests against the agile REST API.
//!
//! Every method maps one endpoint family onto plain Rust values, normalizing
//! status, project and issue ids on the way in. The client keeps no state
//! between calls and never retries; backoff belongs to the [`Transport`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use boardsync_core::ids;

use crate::error::ClientError;
use crate::paginate::{paginate, Page, Termination};
use crate::transport::{Query, Transport, TransportResponse};

/// Statuses that an issue listing answers with when the board has no such
/// issue collection.
const NO_ISSUES: &[u16] = &[400, 404];
const NOT_FOUND: &[u16] = &[404];

const BOARD_ISSUE_FIELDS: &str = "id,project,status,sprint,closedSprints";
const SPRINT_STATES: &str = "future,active,closed";

// ---------------------------------------------------------------------------
// Decoded values
// ---------------------------------------------------------------------------

/// A board as listed by `/board`, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDescriptor {
    pub id: u64,
    pub name: String,
    /// Raw remote type, e.g. `scrum`, `kanban`, `simple`.
    pub board_type: String,
    /// Empty for orphaned boards.
    pub project_key: String,
    pub project_ref_id: String,
}

/// One column of `/board/{id}/configuration`, status ids normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub status_ids: Vec<String>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, status_ids: Vec<String>) -> Self {
        Self {
            name: name.into(),
            status_ids,
        }
    }
}

/// `backlog` or `issue` listing of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Backlog,
    Issue,
}

impl IssueKind {
    fn segment(self) -> &'static str {
        match self {
            IssueKind::Backlog => "backlog",
            IssueKind::Issue => "issue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSprint {
    pub goal: String,
    pub closed: bool,
}

/// An issue as seen through a board listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardIssue {
    pub ref_id: String,
    pub id: String,
    pub project_ref_id: String,
    pub project_id: String,
    pub status_id: String,
    /// Current sprint plus closed sprints, keyed by sprint id.
    pub sprints: BTreeMap<u64, IssueSprint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintSummary {
    pub id: u64,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintDetail {
    pub id: u64,
    pub name: String,
    pub goal: String,
    pub state: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub complete_date: Option<DateTime<Utc>>,
    pub origin_board_id: u64,
}

/// An issue as seen through `/sprint/{id}/issue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintIssue {
    pub ref_id: String,
    pub id: String,
    pub project_ref_id: String,
    pub project_id: String,
    pub status_id: String,
    /// Per-issue view of the sprint goal; may differ from the sprint detail.
    pub goal: String,
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    is_last: bool,
    #[serde(default, alias = "issues")]
    values: Vec<T>,
}

#[derive(Deserialize)]
struct WireBoard {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    board_type: String,
    #[serde(default)]
    location: Option<WireLocation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLocation {
    #[serde(default)]
    project_id: Option<u64>,
    #[serde(default)]
    project_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBoardConfig {
    #[serde(default)]
    column_config: WireColumnConfig,
}

#[derive(Deserialize, Default)]
struct WireColumnConfig {
    #[serde(default)]
    columns: Vec<WireColumn>,
}

#[derive(Deserialize)]
struct WireColumn {
    name: String,
    #[serde(default)]
    statuses: Vec<WireRef>,
}

#[derive(Deserialize, Default)]
struct WireRef {
    #[serde(default)]
    id: String,
}

#[derive(Deserialize)]
struct WireIssue<F> {
    id: String,
    fields: F,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBoardIssueFields {
    #[serde(default)]
    project: WireRef,
    #[serde(default)]
    status: WireRef,
    #[serde(default)]
    sprint: Option<WireIssueSprint>,
    #[serde(default)]
    closed_sprints: Vec<WireIssueSprint>,
}

#[derive(Deserialize)]
struct WireIssueSprint {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    goal: Option<String>,
}

#[derive(Deserialize)]
struct WireSprintIssueFields {
    #[serde(default)]
    project: WireRef,
    #[serde(default)]
    status: WireRef,
    #[serde(default)]
    sprint: Option<WireIssueSprint>,
}

#[derive(Deserialize)]
struct WireSprintSummary {
    id: u64,
    #[serde(default)]
    state: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSprintDetail {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    goal: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    complete_date: Option<String>,
    #[serde(default)]
    origin_board_id: u64,
}

#[derive(Deserialize)]
struct WireProbe {
    #[serde(default)]
    total: u64,
}

fn decode<T: DeserializeOwned>(path: &str, resp: TransportResponse) -> Result<T, ClientError> {
    if !resp.is_success() {
        let mut body = resp.body;
        if body.len() > 512 {
            let mut cut = 512;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(ClientError::Status {
            endpoint: path.to_string(),
            status: resp.status,
            body,
        });
    }
    serde_json::from_str(&resp.body).map_err(|source| ClientError::Decode {
        endpoint: path.to_string(),
        source,
    })
}

/// Parse a remote timestamp. Accepts RFC 3339 and the `+0200` offset form
/// the issue endpoints use; anything else is logged and dropped.
fn parse_remote_time(raw: Option<String>, field: &'static str, sprint: u64) -> Option<DateTime<Utc>> {
    let raw = raw.filter(|s| !s.is_empty())?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Some(ts.with_timezone(&Utc));
    }
    match DateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(sprint, field, value = %raw, error = %e, "unparseable sprint date");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Request helper for one customer's agile API.
#[derive(Clone)]
pub struct AgileClient {
    transport: Arc<dyn Transport>,
    customer_id: String,
    page_size: u32,
}

impl std::fmt::Debug for AgileClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgileClient")
            .field("customer_id", &self.customer_id)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl AgileClient {
    pub fn new(transport: Arc<dyn Transport>, customer_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            transport,
            customer_id: customer_id.into(),
            page_size: page_size.max(1),
        }
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    async fn send(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<TransportResponse, ClientError> {
        self.transport
            .get(path, query)
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: path.to_string(),
                source,
            })
    }

    /// Single GET decoded as `T`; any non-2xx status is an error.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ClientError> {
        let resp = self.send(path, query).await?;
        decode(path, resp)
    }

    /// Like [`AgileClient::get_json`], but statuses in `empty_on` yield `Ok(None)`.
    async fn get_json_or_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        empty_on: &[u16],
    ) -> Result<Option<T>, ClientError> {
        let resp = self.send(path, query).await?;
        if empty_on.contains(&resp.status) {
            tracing::debug!(endpoint = %path, status = resp.status, "treating response as empty");
            return Ok(None);
        }
        decode(path, resp).map(Some)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: String,
        mut query: Query,
        start_at: u64,
        empty_on: &[u16],
    ) -> Result<Option<Page<T>>, ClientError> {
        query.push(("maxResults".to_string(), self.page_size.to_string()));
        query.push(("startAt".to_string(), start_at.to_string()));
        let envelope: Option<Envelope<T>> =
            self.get_json_or_empty(&path, &query, empty_on).await?;
        Ok(envelope.map(|e| Page {
            items: e.values,
            is_last: e.is_last,
            total: e.total,
        }))
    }

    async fn get_all<T: DeserializeOwned>(
        &self,
        path: String,
        query: Query,
        termination: Termination,
        empty_on: &[u16],
    ) -> Result<Vec<T>, ClientError> {
        paginate(termination, |start_at| {
            self.get_page(path.clone(), query.clone(), start_at, empty_on)
        })
        .await
    }

    /// Every board visible to the credentials, in remote order.
    pub async fn list_boards(&self) -> Result<Vec<BoardDescriptor>, ClientError> {
        let started = std::time::Instant::now();
        let wire: Vec<WireBoard> = self
            .get_all("/board".to_string(), Vec::new(), Termination::IsLastFlag, &[])
            .await?;
        let boards: Vec<BoardDescriptor> = wire
            .into_iter()
            .map(|b| {
                let location = b.location.unwrap_or(WireLocation {
                    project_id: None,
                    project_key: None,
                });
                BoardDescriptor {
                    id: b.id,
                    name: b.name,
                    board_type: b.board_type,
                    project_key: location.project_key.unwrap_or_default(),
                    project_ref_id: location.project_id.map(|id| id.to_string()).unwrap_or_default(),
                }
            })
            .collect();
        tracing::debug!(
            len = boards.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "fetched agile boards"
        );
        Ok(boards)
    }

    /// Column configuration of a board, in remote order.
    pub async fn fetch_board_config(&self, board_id: u64) -> Result<Vec<RawColumn>, ClientError> {
        let path = format!("/board/{board_id}/configuration");
        let config: WireBoardConfig = self.get_json(&path, &[]).await?;
        let columns = config
            .column_config
            .columns
            .into_iter()
            .map(|c| RawColumn {
                name: c.name,
                status_ids: c
                    .statuses
                    .into_iter()
                    .map(|s| ids::issue_status_id(&self.customer_id, &s.id))
                    .collect(),
            })
            .collect::<Vec<_>>();
        tracing::debug!(board = board_id, len = columns.len(), "fetched agile board config");
        Ok(columns)
    }

    /// Backlog or full issue listing of a board. 400/404 mean "none".
    pub async fn fetch_board_issues(
        &self,
        board_id: u64,
        kind: IssueKind,
    ) -> Result<Vec<BoardIssue>, ClientError> {
        let started = std::time::Instant::now();
        let path = format!("/board/{board_id}/{}", kind.segment());
        let query = vec![("fields".to_string(), BOARD_ISSUE_FIELDS.to_string())];
        let wire: Vec<WireIssue<WireBoardIssueFields>> = self
            .get_all(path, query, Termination::RunningTotal, NO_ISSUES)
            .await?;
        let issues: Vec<BoardIssue> = wire
            .into_iter()
            .map(|issue| {
                let f = issue.fields;
                let mut sprints = BTreeMap::new();
                if let Some(s) = f.sprint {
                    sprints.insert(
                        s.id,
                        IssueSprint {
                            goal: s.goal.unwrap_or_default(),
                            closed: false,
                        },
                    );
                }
                for s in f.closed_sprints {
                    sprints.insert(
                        s.id,
                        IssueSprint {
                            goal: s.goal.unwrap_or_default(),
                            closed: true,
                        },
                    );
                }
                BoardIssue {
                    id: ids::issue_id(&self.customer_id, &issue.id),
                    project_id: ids::project_id(&self.customer_id, &f.project.id),
                    status_id: ids::issue_status_id(&self.customer_id, &f.status.id),
                    ref_id: issue.id,
                    project_ref_id: f.project.id,
                    sprints,
                }
            })
            .collect();
        tracing::debug!(
            board = board_id,
            kind = kind.segment(),
            len = issues.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "fetched agile board issues"
        );
        Ok(issues)
    }

    /// All sprints of a board in remote order, every state. 404 means "none".
    pub async fn list_sprints(&self, board_id: u64) -> Result<Vec<SprintSummary>, ClientError> {
        let path = format!("/board/{board_id}/sprint");
        let query = vec![("state".to_string(), SPRINT_STATES.to_string())];
        let wire: Vec<WireSprintSummary> = self
            .get_all(path, query, Termination::IsLastFlag, NOT_FOUND)
            .await?;
        Ok(wire
            .into_iter()
            .map(|s| SprintSummary {
                id: s.id,
                state: s.state,
            })
            .collect())
    }

    pub async fn fetch_sprint_detail(&self, sprint_id: u64) -> Result<SprintDetail, ClientError> {
        let path = format!("/sprint/{sprint_id}");
        let s: WireSprintDetail = self.get_json(&path, &[]).await?;
        Ok(SprintDetail {
            id: s.id,
            name: s.name,
            goal: s.goal.unwrap_or_default(),
            state: s.state,
            start_date: parse_remote_time(s.start_date, "startDate", sprint_id),
            end_date: parse_remote_time(s.end_date, "endDate", sprint_id),
            complete_date: parse_remote_time(s.complete_date, "completeDate", sprint_id),
            origin_board_id: s.origin_board_id,
        })
    }

    /// Issues of a sprint. 404 means "none".
    pub async fn fetch_sprint_issues(&self, sprint_id: u64) -> Result<Vec<SprintIssue>, ClientError> {
        let started = std::time::Instant::now();
        let path = format!("/sprint/{sprint_id}/issue");
        let wire: Vec<WireIssue<WireSprintIssueFields>> = self
            .get_all(path, Vec::new(), Termination::RunningTotal, NOT_FOUND)
            .await?;
        let issues: Vec<SprintIssue> = wire
            .into_iter()
            .map(|issue| {
                let f = issue.fields;
                SprintIssue {
                    id: ids::issue_id(&self.customer_id, &issue.id),
                    project_id: ids::project_id(&self.customer_id, &f.project.id),
                    status_id: ids::issue_status_id(&self.customer_id, &f.status.id),
                    goal: f.sprint.and_then(|s| s.goal).unwrap_or_default(),
                    ref_id: issue.id,
                    project_ref_id: f.project.id,
                }
            })
            .collect();
        tracing::debug!(
            sprint = sprint_id,
            len = issues.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "fetched agile sprint issues"
        );
        Ok(issues)
    }

    /// Does `board_ref_id` currently show the issue `issue_key`?
    pub async fn probe_board_membership(
        &self,
        board_ref_id: &str,
        issue_key: &str,
    ) -> Result<bool, ClientError> {
        let path = format!("/board/{board_ref_id}/issue");
        let query = vec![
            ("jql".to_string(), format!("issuekey={issue_key}")),
            ("maxResults".to_string(), "1".to_string()),
            ("fields".to_string(), "id".to_string()),
        ];
        let probe: Option<WireProbe> = self.get_json_or_empty(&path, &query, NO_ISSUES).await?;
        Ok(probe.map_or(false, |p| p.total > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_times_in_both_offset_forms() {
        let a = parse_remote_time(Some("2015-04-11T15:22:00.000+10:00".into()), "startDate", 1);
        let b = parse_remote_time(Some("2015-04-11T15:22:00.000+1000".into()), "startDate", 1);
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(parse_remote_time(Some(String::new()), "endDate", 1), None);
        assert_eq!(parse_remote_time(Some("yesterday".into()), "endDate", 1), None);
        assert_eq!(parse_remote_time(None, "endDate", 1), None);
    }

    #[test]
    fn envelope_reads_values_or_issues() {
        let boards: Envelope<WireSprintSummary> =
            serde_json::from_str(r#"{"isLast":true,"values":[{"id":1,"state":"active"}]}"#).unwrap();
        assert!(boards.is_last);
        assert_eq!(boards.values.len(), 1);

        let issues: Envelope<WireProbe> =
            serde_json::from_str(r#"{"total":3,"issues":[{"total":0}]}"#).unwrap();
        assert_eq!(issues.total, 3);
        assert_eq!(issues.values.len(), 1);
    }
}
