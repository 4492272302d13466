//! boardsync core library: agile domain types, checkpoint persistence, config.
//!
//! Public API surface:
//! - [`types`]: boards, sprints, kanbans and the emitted [`Record`] union
//! - [`ids`]: deterministic normalized identifiers
//! - [`checkpoint`]: [`CheckpointStore`] trait plus memory / file backends
//! - [`config`]: YAML export configuration
//! - [`error`]: [`CheckpointError`], [`ConfigError`]

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod ids;
pub mod types;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use config::{AuthConfig, ExportConfig};
pub use error::{CheckpointError, ConfigError};
pub use types::{
    Board, BoardType, Column, Kanban, Record, Sprint, SprintStatus,
};
