//! Test infrastructure for the webhook service.
//!
//! `TestEnv` wires the real router to in-memory storage, a recording mailer
//! and a controllable clock, and signs requests with a known secret. Every
//! test gets its own environment, so there is nothing to clean up.

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::expect_used)]

use std::sync::Arc;

use axum::{body::Body, Router};
use http::{header, HeaderMap, Method, Request, StatusCode};
use legalfooter_api::{
    create_router, crypto::signature_header, AppState, EventProcessor, SignatureVerifier,
    WEBHOOK_PATH,
};
use legalfooter_core::{storage::mock::MockPolicyStore, Clock, TestClock};
use legalfooter_mail::{mailer::mock::MockMailer, Mailer};
use tower::ServiceExt;

pub mod fixtures;
pub mod resend;

pub use fixtures::CheckoutEventBuilder;
pub use resend::ResendMock;

/// Signing secret used by every test environment.
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Unix time the test clock starts at.
pub const TEST_EPOCH: u64 = 1_700_000_000;

/// Isolated environment around one router instance.
pub struct TestEnv {
    /// Records inserted by the pipeline
    pub store: MockPolicyStore,
    /// Emails handed to the mailer
    pub mailer: MockMailer,
    /// Clock shared with the verifier and health checks
    pub clock: TestClock,
    expose_verification_errors: bool,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    /// Creates an environment with healthy mocks at `TEST_EPOCH`.
    pub fn new() -> Self {
        Self {
            store: MockPolicyStore::new(),
            mailer: MockMailer::new(),
            clock: TestClock::at_unix(TEST_EPOCH),
            expose_verification_errors: true,
        }
    }

    /// Replaces verification reasons with a generic message.
    #[must_use]
    pub fn hiding_verification_errors(mut self) -> Self {
        self.expose_verification_errors = false;
        self
    }

    /// Application state backed by the recording mailer.
    pub fn state(&self) -> AppState {
        self.state_with_mailer(Arc::new(self.mailer.clone()))
    }

    /// Application state sending through `mailer` instead.
    pub fn state_with_mailer(&self, mailer: Arc<dyn Mailer>) -> AppState {
        let clock: Arc<dyn Clock> = Arc::new(self.clock.clone());
        let processor = EventProcessor::new(Arc::new(self.store.clone()), mailer);
        let verifier = SignatureVerifier::new(TEST_WEBHOOK_SECRET, Arc::clone(&clock))
            .expect("test secret is valid");

        AppState::new(processor, verifier, clock)
            .with_verification_errors_exposed(self.expose_verification_errors)
    }

    /// Router over `state()`.
    pub fn router(&self) -> Router {
        create_router(self.state())
    }

    /// Signature header for `payload` signed now.
    pub fn sign(&self, payload: &[u8]) -> String {
        self.sign_at(payload, self.clock.unix_timestamp())
    }

    /// Signature header for `payload` signed at `timestamp`.
    pub fn sign_at(&self, payload: &[u8], timestamp: i64) -> String {
        signature_header(payload, TEST_WEBHOOK_SECRET, timestamp).expect("test secret is valid")
    }

    /// POST to the webhook path with an optional signature header.
    pub fn webhook_request(payload: &[u8], signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(WEBHOOK_PATH)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }

        builder.body(Body::from(payload.to_vec())).expect("request is well-formed")
    }

    /// Delivers `payload` correctly signed.
    pub async fn deliver(&self, payload: &[u8]) -> TestResponse {
        let signature = self.sign(payload);
        self.send(Self::webhook_request(payload, Some(&signature))).await
    }

    /// Sends an arbitrary request through a fresh router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        TestResponse::from_router(self.router(), request).await
    }
}

/// Buffered response.
#[derive(Debug)]
pub struct TestResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Runs `request` through `router` and buffers the result.
    pub async fn from_router(router: Router, request: Request<Body>) -> Self {
        let response = router.oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable")
            .to_vec();

        Self { status, headers, body }
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("body is JSON")
    }
}
