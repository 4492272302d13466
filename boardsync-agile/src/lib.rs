//! boardsync agile engine: discovers boards on the remote agile service and
//! turns them into a stream of board, sprint and kanban records.
//!
//! Pipeline for one export run:
//! 1. [`client::AgileClient::list_boards`] → sort newest first → filter
//! 2. one [`board::export_board`] task per board on a bounded [`pool::WorkerPool`]
//! 3. per board: column layout → backlog → sprints or kanban → board record
//!
//! Cross-board sprint duplicates are suppressed by [`dedup::SprintClaims`];
//! closed sprints already exported in an earlier run are skipped through the
//! checkpoint store.

pub mod board;
pub mod client;
pub mod columns;
pub mod dedup;
pub mod error;
pub mod export;
pub mod kanban;
pub mod membership;
pub mod paginate;
pub mod pool;
pub mod sink;
pub mod sprint;
pub mod stats;
pub mod transport;
pub mod urls;

pub use client::AgileClient;
pub use error::{ClientError, SinkError, SyncError, TransportError};
pub use export::{ExportContext, ExportSettings, Exporter};
pub use membership::SearchScope;
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
pub use stats::{ExportStats, StatsSnapshot};
pub use transport::{Transport, TransportResponse};
