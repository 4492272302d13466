//! Domain types for the agile export stream.
//!
//! Everything here is rebuilt from the remote service on each export pass;
//! records are serialized as JSON Lines with a `model` tag.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Board flavours the engine knows how to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardType {
    Scrum,
    Kanban,
}

impl BoardType {
    /// Parse the remote `type` field. Unsupported board types (e.g. "simple")
    /// yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scrum" => Some(BoardType::Scrum),
            "kanban" => Some(BoardType::Kanban),
            _ => None,
        }
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardType::Scrum => write!(f, "scrum"),
            BoardType::Kanban => write!(f, "kanban"),
        }
    }
}

/// Lifecycle state of a sprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintStatus {
    Future,
    Active,
    Closed,
}

impl SprintStatus {
    /// Case-insensitive parse of the remote `state` string.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "future" => Some(SprintStatus::Future),
            "active" => Some(SprintStatus::Active),
            "closed" => Some(SprintStatus::Closed),
            _ => None,
        }
    }

    pub fn is_closed(self) -> bool {
        self == SprintStatus::Closed
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SprintStatus::Future => write!(f, "future"),
            SprintStatus::Active => write!(f, "active"),
            SprintStatus::Closed => write!(f, "closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A named column and the (normalized) issue ids placed in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub issue_ids: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issue_ids: Vec::new(),
        }
    }
}

/// A scrum or kanban board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub ref_id: String,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_instance_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub board_type: BoardType,
    pub project_key: String,
    pub project_id: String,
    /// Column names, in remote configuration order.
    pub columns: Vec<String>,
    pub backlog_issue_ids: Vec<String>,
    pub url: String,
    pub active: bool,
}

/// A time-boxed scrum iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub ref_id: String,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_instance_id: Option<String>,
    pub name: String,
    pub goal: String,
    pub status: SprintStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
    /// Normalized id of the board this sprint was exported through.
    pub board_id: String,
    pub project_ids: Vec<String>,
    pub issue_ids: Vec<String>,
    pub columns: Vec<Column>,
    pub url: String,
    pub active: bool,
}

/// The continuous counterpart of a sprint; one per kanban board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kanban {
    pub id: String,
    pub ref_id: String,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_instance_id: Option<String>,
    pub board_id: String,
    pub issue_ids: Vec<String>,
    pub columns: Vec<Column>,
    pub project_ids: Vec<String>,
    pub url: String,
    pub active: bool,
}

/// One entry in the append-only output stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum Record {
    Board(Board),
    Sprint(Sprint),
    Kanban(Kanban),
}

impl Record {
    pub fn model(&self) -> &'static str {
        match self {
            Record::Board(_) => "board",
            Record::Sprint(_) => "sprint",
            Record::Kanban(_) => "kanban",
        }
    }

    pub fn ref_id(&self) -> &str {
        match self {
            Record::Board(b) => &b.ref_id,
            Record::Sprint(s) => &s.ref_id,
            Record::Kanban(k) => &k.ref_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprint_status_parse_is_case_insensitive() {
        assert_eq!(SprintStatus::parse("CLOSED"), Some(SprintStatus::Closed));
        assert_eq!(SprintStatus::parse("Active"), Some(SprintStatus::Active));
        assert_eq!(SprintStatus::parse("future"), Some(SprintStatus::Future));
        assert_eq!(SprintStatus::parse("archived"), None);
    }

    #[test]
    fn board_type_rejects_unsupported_kinds() {
        assert_eq!(BoardType::parse("scrum"), Some(BoardType::Scrum));
        assert_eq!(BoardType::parse("kanban"), Some(BoardType::Kanban));
        assert_eq!(BoardType::parse("simple"), None);
    }

    #[test]
    fn record_serializes_with_model_tag() {
        let record = Record::Kanban(Kanban {
            id: "k1".into(),
            ref_id: "7".into(),
            customer_id: "cust".into(),
            integration_instance_id: None,
            board_id: "b1".into(),
            issue_ids: vec!["i1".into()],
            columns: vec![Column::new("To Do")],
            project_ids: vec![],
            url: "https://example.test".into(),
            active: true,
        });
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["model"], "kanban");
        assert_eq!(json["ref_id"], "7");
        assert!(json.get("integration_instance_id").is_none());
    }
}
