//! Blocking `ureq` transport bridged onto the async [`Transport`] seam.
//!
//! Each request runs on the blocking pool. HTTP 429 is retried after the
//! server's `Retry-After` (seconds), up to [`MAX_ATTEMPTS`] tries.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};

use boardsync_agile::{Transport, TransportError, TransportResponse};
use boardsync_core::{AuthConfig, ExportConfig};

pub const MAX_ATTEMPTS: u32 = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

pub struct UreqTransport {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
}

impl UreqTransport {
    pub fn from_config(cfg: &ExportConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("boardsync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: cfg.api_url.clone(),
            authorization: authorization_header(&cfg.auth),
        }
    }
}

pub fn authorization_header(auth: &AuthConfig) -> String {
    match auth {
        AuthConfig::Basic {
            username,
            api_token,
        } => {
            let raw = format!("{username}:{api_token}");
            format!("Basic {}", general_purpose::STANDARD.encode(raw))
        }
        AuthConfig::Bearer { token } => format!("Bearer {token}"),
    }
}

/// Seconds from a `Retry-After` header, clamped; falls back to one second.
pub fn retry_delay(header: Option<&str>) -> Duration {
    header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
        .min(MAX_RETRY_AFTER)
}

fn get_blocking(
    agent: &ureq::Agent,
    url: &str,
    authorization: &str,
    query: &[(String, String)],
) -> Result<TransportResponse, TransportError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let mut request = agent
            .get(url)
            .set("Authorization", authorization)
            .set("Accept", "application/json");
        for (k, v) in query {
            request = request.query(k, v);
        }

        match request.call() {
            Ok(resp) => {
                let status = resp.status();
                let body = resp.into_string().map_err(|source| TransportError::Body {
                    url: url.to_string(),
                    source,
                })?;
                return Ok(TransportResponse::new(status, body));
            }
            Err(ureq::Error::Status(429, resp)) => {
                if attempt >= MAX_ATTEMPTS {
                    return Err(TransportError::RateLimited {
                        url: url.to_string(),
                        attempts: attempt,
                    });
                }
                let wait = retry_delay(resp.header("Retry-After"));
                tracing::warn!(url, attempt, wait_ms = wait.as_millis() as u64, "rate limited; backing off");
                std::thread::sleep(wait);
            }
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                return Ok(TransportResponse::new(status, body));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(TransportError::Request {
                    url: url.to_string(),
                    message: err.to_string(),
                });
            }
        }
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let agent = self.agent.clone();
        let authorization = self.authorization.clone();
        let query = query.to_vec();
        let task_url = url.clone();
        tokio::task::spawn_blocking(move || get_blocking(&agent, &task_url, &authorization, &query))
            .await
            .map_err(|e| TransportError::Request {
                url,
                message: format!("blocking task failed: {e}"),
            })?
    }
}
