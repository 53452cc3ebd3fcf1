//! Webhook delivery for lead notifications.
//!
//! [`WebhookDelivery`] posts a [`FunnelEvent`] as JSON. Transport failures
//! and 5xx/429 answers are retried after 1 s, 2 s and 4 s; any other
//! non-2xx answer means the receiver rejected the event and is final.

use std::time::Duration;

use reqwest::StatusCode;

use crate::bus::FunnelEvent;

const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// Per-attempt timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Network, DNS, TLS or timeout failure.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

impl WebhookError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::HttpStatus(code) => {
                *code >= 500 || *code == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
        }
    }
}

pub struct WebhookDelivery {
    client: reqwest::Client,
}

impl WebhookDelivery {
    pub fn new() -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// POST `event` to `url`. Returns the last error once retries run out
    /// or the receiver rejects the event outright.
    pub async fn deliver(&self, url: &str, event: &FunnelEvent) -> Result<(), WebhookError> {
        let mut delays = RETRY_DELAYS_SECS.iter();
        let mut attempt = 1;

        loop {
            let err = match self.post(url, event).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            let delay = match delays.next() {
                Some(secs) if err.is_transient() => Duration::from_secs(*secs),
                _ => {
                    tracing::error!(
                        url,
                        attempt,
                        event_type = %event.event_type,
                        error = %err,
                        "Webhook delivery failed"
                    );
                    return Err(err);
                }
            };

            tracing::warn!(
                url,
                attempt,
                retry_in_secs = delay.as_secs(),
                error = %err,
                "Webhook delivery attempt failed"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn post(&self, url: &str, event: &FunnelEvent) -> Result<(), WebhookError> {
        let status = self.client.post(url).json(event).send().await?.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(WebhookError::HttpStatus(status.as_u16()))
        }
    }
}
