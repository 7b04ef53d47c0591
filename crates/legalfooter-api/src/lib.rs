//! LegalFooter HTTP API.
//!
//! Receives Stripe checkout webhooks on `POST /api/stripe-webhook`, verifies
//! their signature, records a policy and emails the purchaser.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod crypto;
pub mod handlers;
pub mod pipeline;
pub mod server;

pub use config::{Config, Secret};
pub use crypto::{SignatureError, SignatureVerifier};
pub use pipeline::{EventProcessor, NotificationOutcome, WebhookOutcome};
pub use server::{create_router, start_server, AppState, WEBHOOK_PATH};
