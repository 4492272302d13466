//! Export configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.boardsync/
//!   config.yaml          (export configuration)
//!   state/
//!     <customer_id>.json (checkpoint store, see `checkpoint`)
//! ```
//!
//! Like the checkpoint paths, every loader has an `_at(home)` form used by
//! tests and a no-arg wrapper that derives home from `dirs::home_dir()`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable that overrides the configured API secret.
pub const API_TOKEN_ENV: &str = "BOARDSYNC_API_TOKEN";

pub const DEFAULT_BOARD_CONCURRENCY: usize = 10;
pub const DEFAULT_PROBE_CONCURRENCY: usize = 4;
pub const MAX_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// 1. Types
// ---------------------------------------------------------------------------

/// Credentials the HTTP transport attaches to every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AuthConfig {
    Basic {
        username: String,
        #[serde(default)]
        api_token: String,
    },
    Bearer {
        #[serde(default)]
        token: String,
    },
}

impl AuthConfig {
    fn secret_mut(&mut self) -> &mut String {
        match self {
            AuthConfig::Basic { api_token, .. } => api_token,
            AuthConfig::Bearer { token } => token,
        }
    }

    fn secret(&self) -> &str {
        match self {
            AuthConfig::Basic { api_token, .. } => api_token,
            AuthConfig::Bearer { token } => token,
        }
    }
}

/// Everything one export run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_instance_id: Option<String>,
    /// Base URL of the agile REST API, e.g. `https://acme.atlassian.net/rest/agile/1.0`.
    pub api_url: String,
    /// Base URL used to build board / sprint web links. Defaults to the API host.
    #[serde(default)]
    pub website_url: String,
    pub auth: AuthConfig,
    #[serde(default = "default_board_concurrency")]
    pub board_concurrency: usize,
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Re-export closed sprints even if already checkpointed.
    #[serde(default)]
    pub historical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

fn default_board_concurrency() -> usize {
    DEFAULT_BOARD_CONCURRENCY
}

fn default_probe_concurrency() -> usize {
    DEFAULT_PROBE_CONCURRENCY
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

impl ExportConfig {
    /// Minimal config for a customer; everything else takes its default.
    pub fn new(customer_id: impl Into<String>, api_url: impl Into<String>, auth: AuthConfig) -> Self {
        Self {
            customer_id: customer_id.into(),
            integration_instance_id: None,
            api_url: api_url.into(),
            website_url: String::new(),
            auth,
            board_concurrency: DEFAULT_BOARD_CONCURRENCY,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            page_size: MAX_PAGE_SIZE,
            historical: false,
            state_dir: None,
        }
    }

    /// Fill defaults, clamp limits, and reject unusable values.
    ///
    /// `env_token` is the value of [`API_TOKEN_ENV`], if set; it replaces
    /// the configured secret.
    pub fn normalize(mut self, env_token: Option<String>) -> Result<Self, ConfigError> {
        if self.customer_id.trim().is_empty() {
            return Err(ConfigError::Invalid("customer_id must not be empty".into()));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        self.api_url = self.api_url.trim_end_matches('/').to_string();

        if self.website_url.is_empty() {
            self.website_url = origin_of(&self.api_url).to_string();
        }
        self.website_url = self.website_url.trim_end_matches('/').to_string();

        if let Some(token) = env_token.filter(|t| !t.is_empty()) {
            *self.auth.secret_mut() = token;
        }
        if self.auth.secret().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "no API secret configured; set it in the auth block or via {API_TOKEN_ENV}"
            )));
        }

        self.board_concurrency = self.board_concurrency.max(1);
        self.probe_concurrency = self.probe_concurrency.max(1);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        Ok(self)
    }

    /// Checkpoint directory: the configured `state_dir`, or `<home>/.boardsync/state`.
    pub fn state_dir_at(&self, home: &Path) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| boardsync_root_at(home).join("state"))
    }
}

/// `https://host/rest/agile/1.0` → `https://host`.
fn origin_of(url: &str) -> &str {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(i) => &url[..after_scheme + i],
        None => url,
    }
}

// ---------------------------------------------------------------------------
// 2. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.boardsync/`
pub fn boardsync_root_at(home: &Path) -> PathBuf {
    home.join(".boardsync")
}

/// `<home>/.boardsync/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    boardsync_root_at(home).join("config.yaml")
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load and normalize the config at an explicit path.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line context) if malformed YAML.
pub fn load_from(path: &Path, env_token: Option<String>) -> Result<ExportConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: ExportConfig = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    raw.normalize(env_token)
}

/// Load `<home>/.boardsync/config.yaml`.
pub fn load_at(home: &Path, env_token: Option<String>) -> Result<ExportConfig, ConfigError> {
    load_from(&config_path_at(home), env_token)
}

/// `load_at` convenience wrapper; reads the token override from the environment.
pub fn load() -> Result<ExportConfig, ConfigError> {
    load_at(&home()?, std::env::var(API_TOKEN_ENV).ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
