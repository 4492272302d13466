use thiserror::Error;

use boardsync_core::CheckpointError;

/// Failure inside the HTTP transport before a status code was obtained.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rate limited by {url}; gave up after {attempts} attempts")]
    RateLimited { url: String, attempts: u32 },
}

/// A remote call failed. `endpoint` is the request path, which embeds the
/// board or sprint id involved.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("GET {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error("GET {endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("GET {endpoint} returned an undecodable body: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sink lock poisoned")]
    Poisoned,
}

/// Errors surfaced by an export run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("sprint {sprint} has unrecognized state '{state}'")]
    InvalidSprintState { sprint: u64, state: String },

    /// Wraps any failure inside one board's export task.
    #[error("board {board}: {source}")]
    Board {
        board: u64,
        #[source]
        source: Box<SyncError>,
    },

    #[error("board {board} not found on the remote service")]
    BoardNotFound { board: u64 },

    #[error("task failure: {0}")]
    Task(String),
}

impl SyncError {
    /// True when records may not have reached the output, directly or
    /// inside a board failure.
    pub fn is_sink_failure(&self) -> bool {
        match self {
            SyncError::Sink(_) => true,
            SyncError::Board { source, .. } => source.is_sink_failure(),
            _ => false,
        }
    }

    pub(crate) fn for_board(board: u64, source: SyncError) -> SyncError {
        match source {
            already @ SyncError::Board { .. } => already,
            other => SyncError::Board {
                board,
                source: Box::new(other),
            },
        }
    }
}
