//! The seam between the engine and the network.
//!
//! Implementations own authentication, base-URL joining and rate-limit
//! backoff. Any HTTP status is returned as a [`TransportResponse`]; only
//! failures that produce no status at all are [`TransportError`]s.

use async_trait::async_trait;

use crate::error::TransportError;

/// Query string pairs, in the order they are sent.
pub type Query = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` (relative to the agile API base, e.g. `/board/7/sprint`).
    async fn get(&self, path: &str, query: &[(String, String)])
        -> Result<TransportResponse, TransportError>;
}
