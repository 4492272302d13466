//! Canned agile API for integration tests.
//!
//! Responses are keyed by request path plus the `startAt` query value
//! (0 when absent). Every request is recorded so tests can assert call
//! counts; unrouted requests answer HTTP 500 so a missing fixture fails loudly.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use boardsync_agile::{
    AgileClient, Exporter, ExportSettings, MemorySink, Transport, TransportError,
    TransportResponse,
};
use boardsync_core::{CheckpointStore, MemoryCheckpointStore, Record};

pub const CUSTOMER: &str = "acme";
pub const WEBSITE: &str = "https://acme.atlassian.net";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

#[derive(Default)]
pub struct FixtureTransport {
    routes: Mutex<HashMap<(String, u64), TransportResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FixtureTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route_page(&self, path: &str, start_at: u64, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert((path.to_string(), start_at), TransportResponse::new(status, body.to_string()));
    }

    pub fn ok(&self, path: &str, body: Value) {
        self.route_page(path, 0, 200, body);
    }

    pub fn status(&self, path: &str, status: u16) {
        self.route_page(path, 0, status, json!({"errorMessages": ["fixture"]}));
    }

    /// Make every request sleep, so concurrent callers overlap.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            path: path.to_string(),
            query: query.to_vec(),
        });
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let start_at = query
            .iter()
            .find(|(k, _)| k == "startAt")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(0);
        let resp = self
            .routes
            .lock()
            .unwrap()
            .get(&(path.to_string(), start_at))
            .cloned()
            .unwrap_or_else(|| TransportResponse::new(500, format!("no fixture for {path}@{start_at}")));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(resp)
    }
}

// ---------------------------------------------------------------------------
// JSON builders (remote wire format)
// ---------------------------------------------------------------------------

pub fn board(id: u64, name: &str, board_type: &str, key: &str, project_id: u64) -> Value {
    json!({
        "id": id,
        "self": format!("{WEBSITE}/rest/agile/1.0/board/{id}"),
        "name": name,
        "type": board_type,
        "location": {"projectId": project_id, "projectKey": key}
    })
}

pub fn boards_page(values: Vec<Value>, is_last: bool) -> Value {
    json!({"maxResults": 100, "startAt": 0, "isLast": is_last, "values": values})
}

pub fn config(columns: &[(&str, &[&str])]) -> Value {
    let columns: Vec<Value> = columns
        .iter()
        .map(|(name, statuses)| {
            json!({
                "name": name,
                "statuses": statuses.iter().map(|s| json!({"id": s})).collect::<Vec<_>>()
            })
        })
        .collect();
    json!({"id": 1, "columnConfig": {"columns": columns}})
}

pub fn issue(id: &str, project: &str, status: &str) -> Value {
    json!({"id": id, "key": format!("APP-{id}"), "fields": {
        "project": {"id": project},
        "status": {"id": status}
    }})
}

pub fn sprint_issue(id: &str, project: &str, status: &str, goal: &str) -> Value {
    json!({"id": id, "key": format!("APP-{id}"), "fields": {
        "project": {"id": project},
        "status": {"id": status},
        "sprint": {"id": 0, "goal": goal}
    }})
}

pub fn issues_page(total: u64, issues: Vec<Value>) -> Value {
    json!({"startAt": 0, "maxResults": 100, "total": total, "issues": issues})
}

pub fn sprints_page(sprints: &[(u64, &str)], is_last: bool) -> Value {
    let values: Vec<Value> = sprints
        .iter()
        .map(|(id, state)| json!({"id": id, "state": state, "name": format!("Sprint {id}")}))
        .collect();
    json!({"maxResults": 50, "startAt": 0, "isLast": is_last, "values": values})
}

pub fn sprint_detail(id: u64, state: &str, origin_board: u64, goal: &str) -> Value {
    json!({
        "id": id,
        "state": state,
        "name": format!("Sprint {id}"),
        "goal": goal,
        "startDate": "2024-03-04T09:00:00.000Z",
        "endDate": "2024-03-18T09:00:00.000Z",
        "originBoardId": origin_board
    })
}

// ---------------------------------------------------------------------------
// Engine wiring
// ---------------------------------------------------------------------------

pub fn settings(historical: bool) -> ExportSettings {
    ExportSettings {
        customer_id: CUSTOMER.to_string(),
        integration_instance_id: Some("inst-1".to_string()),
        website_url: WEBSITE.to_string(),
        historical,
        board_concurrency: 10,
        probe_concurrency: 4,
    }
}

pub struct Harness {
    pub transport: Arc<FixtureTransport>,
    pub store: Arc<MemoryCheckpointStore>,
    pub sink: Arc<MemorySink>,
    pub exporter: Exporter,
}

pub fn harness(transport: Arc<FixtureTransport>, historical: bool) -> Harness {
    harness_with_store(transport, Arc::new(MemoryCheckpointStore::new()), historical)
}

pub fn harness_with_store(
    transport: Arc<FixtureTransport>,
    store: Arc<MemoryCheckpointStore>,
    historical: bool,
) -> Harness {
    let sink = Arc::new(MemorySink::new());
    let client = AgileClient::new(transport.clone(), CUSTOMER, 100);
    let exporter = Exporter::new(
        client,
        store.clone() as Arc<dyn CheckpointStore>,
        sink.clone(),
        settings(historical),
    );
    Harness {
        transport,
        store,
        sink,
        exporter,
    }
}

pub fn sprints(records: &[Record]) -> Vec<&boardsync_core::Sprint> {
    records
        .iter()
        .filter_map(|r| match r {
            Record::Sprint(s) => Some(s),
            _ => None,
        })
        .collect()
}

pub fn boards(records: &[Record]) -> Vec<&boardsync_core::Board> {
    records
        .iter()
        .filter_map(|r| match r {
            Record::Board(b) => Some(b),
            _ => None,
        })
        .collect()
}

pub fn kanbans(records: &[Record]) -> Vec<&boardsync_core::Kanban> {
    records
        .iter()
        .filter_map(|r| match r {
            Record::Kanban(k) => Some(k),
            _ => None,
        })
        .collect()
}
