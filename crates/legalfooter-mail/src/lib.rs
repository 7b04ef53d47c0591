//! Confirmation email rendering and delivery.
//!
//! A persisted policy becomes a `NotificationRequest`, which renders into an
//! `OutboundEmail` and is handed to a `Mailer`. Production uses
//! `ResendClient`; tests use `mailer::mock::MockMailer`.
//!
//! # Example
//!
//! ```no_run
//! use legalfooter_mail::{ClientConfig, Mailer, NotificationRequest, ResendClient};
//! use legalfooter_core::RecordId;
//!
//! # async fn example() -> legalfooter_mail::Result<()> {
//! let client = ResendClient::new(ClientConfig::new("re_123"))?;
//! let email = NotificationRequest {
//!     recipient: Some("owner@example.com".into()),
//!     domain: Some("example.com".into()),
//!     record_id: RecordId::new(),
//! }
//! .render("LegalFooter <onboarding@resend.dev>")?;
//!
//! client.send(email).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod mailer;
pub mod message;

pub use client::{ClientConfig, ResendClient};
pub use error::{MailError, Result};
pub use mailer::{Mailer, SendReceipt};
pub use message::{NotificationRequest, OutboundEmail, CONFIRMATION_SUBJECT, DEFAULT_SENDER};
