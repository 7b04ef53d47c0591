//! Processing of verified events.
//!
//! A verified completion event becomes one policy record and, if the insert
//! succeeds, one confirmation email. Neither step is retried, and neither
//! failure changes the response the processor sees.

use std::sync::Arc;

use legalfooter_core::{
    storage::PolicyStore, CoreError, NewPolicy, PolicyRecord, StripeEvent, WebhookError,
};
use legalfooter_mail::{MailError, Mailer, NotificationRequest, DEFAULT_SENDER};
use tracing::{debug, error, info, instrument};

/// Result of sending the confirmation email.
#[derive(Debug, Clone)]
pub enum NotificationOutcome {
    /// The email API accepted the message.
    Sent {
        /// Provider message id, if returned
        message_id: Option<String>,
    },
    /// Rendering or sending failed.
    Failed {
        /// Cause of the failure
        error: MailError,
    },
}

/// Branch the pipeline took for one event.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// Event type is not handled; nothing was written or sent.
    Ignored {
        /// Type tag of the ignored event
        event_type: String,
    },
    /// A record was persisted and a notification attempted.
    Processed {
        /// The stored record
        record: PolicyRecord,
        /// What happened to the confirmation email
        notification: NotificationOutcome,
    },
    /// The insert failed; no email was attempted.
    PersistFailed {
        /// Storage error
        error: CoreError,
    },
}

impl WebhookOutcome {
    /// Short label for logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ignored { .. } => "ignored",
            Self::Processed { notification: NotificationOutcome::Sent { .. }, .. } => "notified",
            Self::Processed { notification: NotificationOutcome::Failed { .. }, .. } => {
                "notify_failed"
            },
            Self::PersistFailed { .. } => "persist_failed",
        }
    }

    /// The persisted record, if any.
    pub fn record(&self) -> Option<&PolicyRecord> {
        match self {
            Self::Processed { record, .. } => Some(record),
            _ => None,
        }
    }
}

/// Runs the persist-then-notify steps for verified events.
#[derive(Clone)]
pub struct EventProcessor {
    store: Arc<dyn PolicyStore>,
    mailer: Arc<dyn Mailer>,
    sender: String,
}

impl EventProcessor {
    /// Creates a processor sending from the default sender.
    pub fn new(store: Arc<dyn PolicyStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer, sender: DEFAULT_SENDER.to_string() }
    }

    /// Overrides the sender address.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Store used for inserts, shared with the health check.
    pub fn store(&self) -> Arc<dyn PolicyStore> {
        Arc::clone(&self.store)
    }

    /// Processes one verified event.
    ///
    /// Never fails: downstream errors are logged with their code and
    /// reported in the outcome.
    #[instrument(
        name = "process_event",
        skip(self, event),
        fields(
            event_id = event.id.as_deref().unwrap_or("unknown"),
            event_type = %event.event_type,
        )
    )]
    pub async fn process(&self, event: &StripeEvent) -> WebhookOutcome {
        if !event.is_checkout_completed() {
            debug!("Ignoring unhandled event type");
            return WebhookOutcome::Ignored { event_type: event.event_type.clone() };
        }

        let session = event.checkout_session();
        let policy = NewPolicy::from_session(&session);

        debug!(
            session_id = policy.policy_id.as_deref().unwrap_or("none"),
            has_email = policy.email.is_some(),
            has_domain = policy.domain.is_some(),
            "Extracted checkout fields"
        );

        let record = match self.store.insert_policy(policy).await {
            Ok(record) => record,
            Err(e) => {
                let err = WebhookError::Persistence(e.clone());
                error!(code = err.code(), error = %err, "Failed to persist policy");
                return WebhookOutcome::PersistFailed { error: e };
            },
        };

        info!(record_id = %record.id, "Policy persisted");

        let notification = self.notify(&record).await;
        WebhookOutcome::Processed { record, notification }
    }

    async fn notify(&self, record: &PolicyRecord) -> NotificationOutcome {
        let result = match NotificationRequest::from_record(record).render(&self.sender) {
            Ok(email) => self.mailer.send(email).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(receipt) => {
                info!(
                    record_id = %record.id,
                    message_id = receipt.message_id.as_deref().unwrap_or("unknown"),
                    "Confirmation email sent"
                );
                NotificationOutcome::Sent { message_id: receipt.message_id }
            },
            Err(e) => {
                let err = WebhookError::Notification(e.to_string());
                error!(code = err.code(), record_id = %record.id, error = %err, "Failed to send confirmation email");
                NotificationOutcome::Failed { error: e }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use legalfooter_core::storage::mock::MockPolicyStore;
    use legalfooter_mail::mailer::mock::MockMailer;
    use serde_json::json;
    use tracing::{
        field::{Field, Visit},
        Event, Level, Subscriber,
    };
    use tracing_subscriber::{
        layer::{Context, SubscriberExt},
        util::SubscriberInitExt,
        Layer,
    };

    use super::*;

    /// Collects ERROR events as `code=<code> <message>` lines.
    #[derive(Clone, Default)]
    struct ErrorCapture {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl ErrorCapture {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    #[derive(Default)]
    struct ErrorFields {
        code: String,
        message: String,
    }

    impl Visit for ErrorFields {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "code" {
                self.code = value.to_string();
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.message = format!("{value:?}");
            }
        }
    }

    impl<S: Subscriber> Layer<S> for ErrorCapture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != Level::ERROR {
                return;
            }
            let mut fields = ErrorFields::default();
            event.record(&mut fields);
            self.lines.lock().unwrap().push(format!("code={} {}", fields.code, fields.message));
        }
    }

    fn processor(store: &MockPolicyStore, mailer: &MockMailer) -> EventProcessor {
        EventProcessor::new(Arc::new(store.clone()), Arc::new(mailer.clone()))
    }

    fn event(event_type: &str, object: serde_json::Value) -> StripeEvent {
        let body = json!({ "id": "evt_1", "type": event_type, "data": { "object": object } });
        StripeEvent::from_slice(body.to_string().as_bytes()).unwrap()
    }

    fn completed_session() -> serde_json::Value {
        json!({
            "id": "cs_test_1",
            "customer": "cus_1",
            "customer_details": { "email": "owner@example.com" },
            "custom_fields": [
                { "key": "protecteddomain", "type": "text", "text": { "value": "example.com" } }
            ]
        })
    }

    #[tokio::test]
    async fn other_event_types_are_ignored() {
        let (store, mailer) = (MockPolicyStore::new(), MockMailer::new());

        let outcome =
            processor(&store, &mailer).process(&event("invoice.paid", completed_session())).await;

        assert!(matches!(outcome, WebhookOutcome::Ignored { ref event_type } if event_type == "invoice.paid"));
        assert_eq!(store.insert_attempts().await, 0);
        assert_eq!(mailer.attempt_count().await, 0);
    }

    #[tokio::test]
    async fn completion_persists_then_notifies() {
        let (store, mailer) = (MockPolicyStore::new(), MockMailer::new());

        let outcome = processor(&store, &mailer)
            .process(&event("checkout.session.completed", completed_session()))
            .await;

        assert_eq!(outcome.label(), "notified");
        let record = outcome.record().unwrap();
        assert_eq!(record.email.as_deref(), Some("owner@example.com"));
        assert_eq!(record.domain.as_deref(), Some("example.com"));
        assert_eq!(record.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(record.policy_id.as_deref(), Some("cs_test_1"));

        let sent = mailer.attempts().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["owner@example.com".to_string()]);
        assert!(sent[0].html.contains(&record.policy_number()));
    }

    #[tokio::test]
    async fn persistence_failure_skips_email() {
        let (store, mailer) = (MockPolicyStore::new(), MockMailer::new());
        store.inject_insert_error("connection refused").await;

        let outcome = processor(&store, &mailer)
            .process(&event("checkout.session.completed", completed_session()))
            .await;

        assert!(matches!(outcome, WebhookOutcome::PersistFailed { .. }));
        assert_eq!(mailer.attempt_count().await, 0);
    }

    #[tokio::test]
    async fn email_failure_is_reported_not_raised() {
        let (store, mailer) = (MockPolicyStore::new(), MockMailer::new());
        mailer.fail_with(MailError::Timeout { timeout_seconds: 10 }).await;

        let outcome = processor(&store, &mailer)
            .process(&event("checkout.session.completed", completed_session()))
            .await;

        assert_eq!(outcome.label(), "notify_failed");
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_is_logged_with_code() {
        let capture = ErrorCapture::default();
        let _guard = tracing_subscriber::registry().with(capture.clone()).set_default();
        let (store, mailer) = (MockPolicyStore::new(), MockMailer::new());
        store.inject_insert_error("connection refused").await;

        processor(&store, &mailer)
            .process(&event("checkout.session.completed", completed_session()))
            .await;

        let lines = capture.lines();
        assert_eq!(lines.len(), 1, "unexpected error events: {lines:?}");
        assert!(lines[0].starts_with("code=E2001 "), "got {}", lines[0]);
        assert!(lines[0].contains("Failed to persist policy"));
    }

    #[tokio::test]
    async fn email_failure_is_logged_with_code() {
        let capture = ErrorCapture::default();
        let _guard = tracing_subscriber::registry().with(capture.clone()).set_default();
        let (store, mailer) = (MockPolicyStore::new(), MockMailer::new());
        mailer.fail_with(MailError::Timeout { timeout_seconds: 10 }).await;

        processor(&store, &mailer)
            .process(&event("checkout.session.completed", completed_session()))
            .await;

        let lines = capture.lines();
        assert_eq!(lines.len(), 1, "unexpected error events: {lines:?}");
        assert!(lines[0].starts_with("code=E2002 "), "got {}", lines[0]);
        assert!(lines[0].contains("Failed to send confirmation email"));
    }

    #[tokio::test]
    async fn missing_recipient_is_logged_with_code() {
        let capture = ErrorCapture::default();
        let _guard = tracing_subscriber::registry().with(capture.clone()).set_default();
        let (store, mailer) = (MockPolicyStore::new(), MockMailer::new());

        processor(&store, &mailer)
            .process(&event("checkout.session.completed", json!({ "id": "cs_test_3" })))
            .await;

        assert!(capture.lines().iter().any(|line| line.starts_with("code=E2002 ")));
    }

    #[tokio::test]
    async fn successful_delivery_logs_no_errors() {
        let capture = ErrorCapture::default();
        let _guard = tracing_subscriber::registry().with(capture.clone()).set_default();
        let (store, mailer) = (MockPolicyStore::new(), MockMailer::new());

        processor(&store, &mailer)
            .process(&event("checkout.session.completed", completed_session()))
            .await;

        assert!(capture.lines().is_empty());
    }

    #[tokio::test]
    async fn missing_email_skips_send() {
        let (store, mailer) = (MockPolicyStore::new(), MockMailer::new());

        let outcome = processor(&store, &mailer)
            .process(&event("checkout.session.completed", json!({ "id": "cs_test_2" })))
            .await;

        match outcome {
            WebhookOutcome::Processed {
                notification: NotificationOutcome::Failed { error: MailError::MissingRecipient { .. } },
                ..
            } => {},
            other => panic!("expected missing recipient, got {other:?}"),
        }
        assert_eq!(store.records().await.len(), 1);
        assert_eq!(mailer.attempt_count().await, 0);
    }

    #[tokio::test]
    async fn custom_sender_is_used() {
        let (store, mailer) = (MockPolicyStore::new(), MockMailer::new());

        processor(&store, &mailer)
            .with_sender("Policies <policies@example.com>")
            .process(&event("checkout.session.completed", completed_session()))
            .await;

        assert_eq!(mailer.attempts().await[0].from, "Policies <policies@example.com>");
    }
}
