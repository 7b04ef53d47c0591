//! Local stand-in for the Resend email API.

use std::time::Duration;

use legalfooter_mail::{ClientConfig, OutboundEmail, ResendClient};
use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// API key the mock expects clients to present.
pub const TEST_API_KEY: &str = "re_test_key";

/// Mock email API recording every request.
pub struct ResendMock {
    server: MockServer,
}

impl ResendMock {
    /// Starts a mock server with no routes mounted.
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Base URL to configure the client with.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Client pointed at this mock.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub fn client(&self) -> ResendClient {
        ResendClient::new(
            ClientConfig::new(TEST_API_KEY)
                .with_api_url(self.url())
                .with_timeout(Duration::from_secs(2)),
        )
        .expect("test client config is valid")
    }

    /// Accepts every email with an id.
    pub async fn accept(&self) {
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_test" })))
            .mount(&self.server)
            .await;
    }

    /// Answers every email with `status`.
    pub async fn reject(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({ "name": "application_error", "message": "rejected" })),
            )
            .mount(&self.server)
            .await;
    }

    /// Emails posted so far, decoded.
    pub async fn sent_emails(&self) -> Vec<OutboundEmail> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == "/emails")
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }
}
