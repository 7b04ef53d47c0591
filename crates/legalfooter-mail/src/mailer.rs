//! The send-one capability the webhook pipeline depends on.

use std::{future::Future, pin::Pin};

use crate::{client::ResendClient, error::Result, message::OutboundEmail};

/// Acknowledgment from the email service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    /// Provider message id, when the response carried one.
    pub message_id: Option<String>,
}

/// Sends rendered emails.
///
/// Implementations own their connection and credential lifecycle and are
/// shared across requests behind an `Arc`.
pub trait Mailer: Send + Sync + 'static {
    /// Sends one email.
    fn send(&self, email: OutboundEmail)
        -> Pin<Box<dyn Future<Output = Result<SendReceipt>> + Send + '_>>;
}

impl Mailer for ResendClient {
    fn send(
        &self,
        email: OutboundEmail,
    ) -> Pin<Box<dyn Future<Output = Result<SendReceipt>> + Send + '_>> {
        Box::pin(async move { self.send_email(&email).await })
    }
}

pub mod mock {
    //! In-memory mailer for tests.
    //!
    //! Records every send attempt, including failed ones, and can be told to
    //! fail sends to simulate an email outage.

    use std::{future::Future, pin::Pin, sync::Arc};

    use tokio::sync::RwLock;

    use super::{Mailer, SendReceipt};
    use crate::{
        error::{MailError, Result},
        message::OutboundEmail,
    };

    /// Mock mailer capturing outgoing emails.
    #[derive(Clone, Default)]
    pub struct MockMailer {
        attempts: Arc<RwLock<Vec<OutboundEmail>>>,
        failure: Arc<RwLock<Option<MailError>>>,
    }

    impl MockMailer {
        /// Creates a mailer that accepts every email.
        pub fn new() -> Self {
            Self::default()
        }

        /// Fails every subsequent send with the given error.
        pub async fn fail_with(&self, error: MailError) {
            *self.failure.write().await = Some(error);
        }

        /// Every email passed to `send`, in order.
        pub async fn attempts(&self) -> Vec<OutboundEmail> {
            self.attempts.read().await.clone()
        }

        /// Number of send attempts.
        pub async fn attempt_count(&self) -> usize {
            self.attempts.read().await.len()
        }
    }

    impl Mailer for MockMailer {
        fn send(
            &self,
            email: OutboundEmail,
        ) -> Pin<Box<dyn Future<Output = Result<SendReceipt>> + Send + '_>> {
            Box::pin(async move {
                let position = {
                    let mut attempts = self.attempts.write().await;
                    attempts.push(email);
                    attempts.len()
                };

                if let Some(error) = self.failure.read().await.clone() {
                    return Err(error);
                }

                Ok(SendReceipt { message_id: Some(format!("mock-{position}")) })
            })
        }
    }
}
