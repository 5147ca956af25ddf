use std::time::Duration;

use crate::retry::RetryConfig;

/// Client configuration for talking to `curio-api`.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Root URL of the API, without the `/api/v1` prefix.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl SyncConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `CURIO_API_URL`          | `http://localhost:3000` |
    /// | `SYNC_TIMEOUT_SECS`      | `10`                    |
    /// | `SYNC_RETRY_BACKOFF_MS`  | `500`                   |
    ///
    /// Unparseable numbers fall back to the default.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("CURIO_API_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let timeout_secs = env_u64("SYNC_TIMEOUT_SECS").unwrap_or(10);
        let backoff_ms = env_u64("SYNC_RETRY_BACKOFF_MS").unwrap_or(500);

        Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            retry: RetryConfig {
                backoff: Duration::from_millis(backoff_ms),
            },
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    match std::env::var(name).ok()?.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(name, error = %e, "Ignoring invalid sync setting");
            None
        }
    }
}
