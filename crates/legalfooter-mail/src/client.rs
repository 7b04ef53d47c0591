//! HTTP client for the Resend email API.
//!
//! One `ResendClient` is built at startup and shared across requests. The
//! underlying `reqwest::Client` pools connections and enforces the request
//! timeout.

use std::time::Duration;

use reqwest::Response;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use crate::{
    error::{MailError, Result},
    mailer::SendReceipt,
    message::OutboundEmail,
};

/// Default Resend API base URL.
pub const DEFAULT_API_URL: &str = "https://api.resend.com";

/// Response bodies kept in error messages are cut to this many bytes.
const MAX_ERROR_BODY_SIZE: usize = 1024;

/// Configuration for the email client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL, without the `/emails` path.
    pub api_url: String,
    /// API key sent as a bearer token.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration for the public API with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("LegalFooter/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for `POST /emails`.
#[derive(Debug, Clone)]
pub struct ResendClient {
    client: reqwest::Client,
    config: ClientConfig,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    #[serde(default)]
    id: Option<String>,
}

impl ResendClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Configuration` if the API key is empty or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(MailError::configuration("API key is empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| MailError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Endpoint the client posts to.
    pub fn endpoint(&self) -> String {
        format!("{}/emails", self.config.api_url.trim_end_matches('/'))
    }

    /// Sends one email.
    ///
    /// # Errors
    ///
    /// - `Timeout` when the API does not answer within the configured timeout
    /// - `Network` for connection failures
    /// - `Rejected` for any non-2xx response
    pub async fn send_email(&self, email: &OutboundEmail) -> Result<SendReceipt> {
        let span = info_span!("send_email", recipients = email.to.len());

        async move {
            let start_time = std::time::Instant::now();
            tracing::debug!("Sending confirmation email");

            let response = match self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.config.api_key)
                .json(email)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        duration_ms = start_time.elapsed().as_millis(),
                        "Email request failed: {}",
                        e
                    );

                    if e.is_timeout() {
                        return Err(MailError::Timeout {
                            timeout_seconds: self.config.timeout.as_secs(),
                        });
                    }
                    if e.is_connect() {
                        return Err(MailError::network(format!("connection failed: {e}")));
                    }
                    return Err(MailError::network(e.to_string()));
                },
            };

            let receipt = Self::parse_response(response).await?;

            tracing::info!(
                message_id = receipt.message_id.as_deref().unwrap_or("unknown"),
                duration_ms = start_time.elapsed().as_millis(),
                "Confirmation email accepted"
            );

            Ok(receipt)
        }
        .instrument(span)
        .await
    }

    async fn parse_response(response: Response) -> Result<SendReceipt> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| MailError::network(e.to_string()))?;

        if !status.is_success() {
            let cut = bytes.len().min(MAX_ERROR_BODY_SIZE);
            return Err(MailError::Rejected {
                status_code: status.as_u16(),
                body: String::from_utf8_lossy(&bytes[..cut]).into_owned(),
            });
        }

        let message_id = serde_json::from_slice::<SendEmailResponse>(&bytes)
            .ok()
            .and_then(|parsed| parsed.id);

        Ok(SendReceipt { message_id })
    }
}
