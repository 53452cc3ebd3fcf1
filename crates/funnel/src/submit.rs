//! Lead submission transport.
//!
//! [`HttpLeadSubmitter`] posts the normalized payload to the lead API with
//! [`reqwest`]. It makes exactly one request per call; retrying is left to
//! the user.

use std::time::Duration;

use async_trait::async_trait;

use glasslead_core::payload::LeadPayload;
use glasslead_core::submission::LeadResponse;

use crate::config::FunnelConfig;

/// Header carrying the per-submit-action idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Path of the lead endpoint relative to the API base URL.
pub const LEADS_PATH: &str = "/api/v1/leads";

/// Errors from the submission transport.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The request never produced a response (network, DNS, TLS, timeout).
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx status with a body that is not a lead response.
    #[error("Lead API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A 2xx response whose body is not a lead response.
    #[error("Unexpected lead API response ({status}): {reason}")]
    Decode { status: u16, reason: String },
}

/// Sends a lead payload to the server.
#[async_trait]
pub trait LeadSubmitter: Send + Sync {
    async fn submit(
        &self,
        payload: &LeadPayload,
        idempotency_key: &str,
    ) -> Result<LeadResponse, SubmitError>;
}

/// HTTP client for the lead endpoint.
pub struct HttpLeadSubmitter {
    client: reqwest::Client,
    api_url: String,
}

impl HttpLeadSubmitter {
    /// * `api_url` - base URL, e.g. `https://api.example.com`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// Build from [`FunnelConfig`], applying its request timeout.
    pub fn from_config(config: &FunnelConfig) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.api_base_url.clone()))
    }
}

#[async_trait]
impl LeadSubmitter for HttpLeadSubmitter {
    /// Non-2xx responses whose body is still a lead response (validation
    /// failures, rate limiting) are returned as `Ok` with `ok: false` so the
    /// caller can surface field errors.
    async fn submit(
        &self,
        payload: &LeadPayload,
        idempotency_key: &str,
    ) -> Result<LeadResponse, SubmitError> {
        let response = self
            .client
            .post(format!("{}{LEADS_PATH}", self.api_url))
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str::<LeadResponse>(&body).map_err(|e| SubmitError::Decode {
                status: status.as_u16(),
                reason: e.to_string(),
            });
        }

        match serde_json::from_str::<LeadResponse>(&body) {
            Ok(mut parsed) => {
                parsed.ok = false;
                if parsed.error.is_none() && status.as_u16() == 429 {
                    parsed.error = Some("Too many requests".to_string());
                }
                Ok(parsed)
            }
            Err(_) => Err(SubmitError::Api {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// User-facing categories for a failed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionErrorKind {
    RateLimited,
    Network,
    Validation,
    Generic,
}

impl SubmissionErrorKind {
    /// Classify a failure message by its content.
    pub fn classify(message: &str) -> Self {
        let message = message.to_ascii_lowercase();

        if contains_any(&message, &["rate limit", "too many", "429"]) {
            Self::RateLimited
        } else if contains_any(&message, &[
            "network",
            "fetch",
            "connect",
            "timed out",
            "timeout",
            "dns",
            "sending request",
        ]) {
            Self::Network
        } else if contains_any(&message, &["validation", "invalid", "required"]) {
            Self::Validation
        } else {
            Self::Generic
        }
    }

    /// Actionable message shown above the step-3 form.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::RateLimited => {
                "You've submitted several requests in a short time. Please wait a minute and try again."
            }
            Self::Network => {
                "We couldn't reach our servers. Check your connection and try again."
            }
            Self::Validation => {
                "Some of your information needs attention. Please review the highlighted fields."
            }
            Self::Generic => {
                "Something went wrong while sending your request. Please try again or call us."
            }
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

impl SubmitError {
    pub fn kind(&self) -> SubmissionErrorKind {
        match self {
            Self::Network(_) => SubmissionErrorKind::Network,
            Self::Api { status: 429, .. } => SubmissionErrorKind::RateLimited,
            Self::Api { body, .. } => SubmissionErrorKind::classify(body),
            Self::Decode { .. } => SubmissionErrorKind::Generic,
        }
    }
}
