//! Deterministic normalized identifiers.
//!
//! Every entity emitted downstream is keyed by a stable id derived from the
//! model name, the customer, the source system and the remote ref id, so that
//! re-exporting the same remote object always yields the same id.

use sha2::{Digest, Sha256};

/// Source system tag mixed into every id.
pub const REF_TYPE: &str = "jira";

/// Entity kinds that receive normalized ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    Board,
    Sprint,
    Kanban,
    Issue,
    IssueStatus,
    Project,
}

impl Model {
    pub fn as_str(self) -> &'static str {
        match self {
            Model::Board => "agile.Board",
            Model::Sprint => "agile.Sprint",
            Model::Kanban => "agile.Kanban",
            Model::Issue => "work.Issue",
            Model::IssueStatus => "work.IssueStatus",
            Model::Project => "work.Project",
        }
    }
}

/// Hash `model ‖ customer ‖ ref type ‖ ref id` into a 16 hex-char id.
pub fn entity_id(model: Model, customer_id: &str, ref_id: &str) -> String {
    let mut h = Sha256::new();
    h.update(model.as_str().as_bytes());
    h.update(b"\0");
    h.update(customer_id.as_bytes());
    h.update(b"\0");
    h.update(REF_TYPE.as_bytes());
    h.update(b"\0");
    h.update(ref_id.as_bytes());
    let mut digest = hex::encode(h.finalize());
    digest.truncate(16);
    digest
}

pub fn board_id(customer_id: &str, ref_id: &str) -> String {
    entity_id(Model::Board, customer_id, ref_id)
}

pub fn sprint_id(customer_id: &str, ref_id: &str) -> String {
    entity_id(Model::Sprint, customer_id, ref_id)
}

pub fn kanban_id(customer_id: &str, ref_id: &str) -> String {
    entity_id(Model::Kanban, customer_id, ref_id)
}

pub fn issue_id(customer_id: &str, ref_id: &str) -> String {
    entity_id(Model::Issue, customer_id, ref_id)
}

pub fn issue_status_id(customer_id: &str, ref_id: &str) -> String {
    entity_id(Model::IssueStatus, customer_id, ref_id)
}

pub fn project_id(customer_id: &str, ref_id: &str) -> String {
    entity_id(Model::Project, customer_id, ref_id)
}
