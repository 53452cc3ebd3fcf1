use chrono::Duration;

use crate::draft_store::DEFAULT_DRAFT_TTL_MINUTES;

/// Client-side funnel configuration.
#[derive(Debug, Clone)]
pub struct FunnelConfig {
    /// Base URL of the lead API, without a trailing slash.
    pub api_base_url: String,
    /// Submission request timeout in seconds.
    pub request_timeout_secs: u64,
    /// How long a saved draft stays resumable.
    pub draft_ttl: Duration,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 30,
            draft_ttl: Duration::minutes(DEFAULT_DRAFT_TTL_MINUTES),
        }
    }
}

impl FunnelConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `GLASSLEAD_API_URL`            | `http://localhost:3000` |
    /// | `GLASSLEAD_REQUEST_TIMEOUT_SECS` | `30`                  |
    /// | `GLASSLEAD_DRAFT_TTL_MINUTES`  | `30`                    |
    ///
    /// Unparsable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_base_url = std::env::var("GLASSLEAD_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        let request_timeout_secs = std::env::var("GLASSLEAD_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let draft_ttl = std::env::var("GLASSLEAD_DRAFT_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|m| *m > 0)
            .map(Duration::minutes)
            .unwrap_or(defaults.draft_ttl);

        Self {
            api_base_url,
            request_timeout_secs,
            draft_ttl,
        }
    }
}
