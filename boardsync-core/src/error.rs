//! Error types for boardsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from checkpoint store operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// I/O failure reading or writing the checkpoint file, with path context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint file exists but is not a valid checkpoint document.
    #[error("failed to parse checkpoint file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (save path).
    #[error("checkpoint JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored value does not have the shape the caller asked for.
    #[error("checkpoint key '{key}' holds an unexpected value: {source}")]
    UnexpectedValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Another thread panicked while holding the store lock.
    #[error("checkpoint store lock poisoned")]
    Poisoned,
}

/// All errors that can arise while loading the export configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`, so we cannot locate `~/.boardsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The file parsed but a field is unusable (empty customer id, bad URL, ...).
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub(crate) fn checkpoint_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CheckpointError {
    CheckpointError::Io {
        path: path.into(),
        source,
    }
}
