//! HTTP request handlers.
//!
//! - `webhook` - the Stripe checkout webhook
//! - `health` - health and liveness probes
//!
//! The webhook handler only ever answers 200, 400 or 405. Failures after
//! verification are logged with their `WebhookError` code and acknowledged
//! so the processor does not retry.

pub mod health;
pub mod webhook;

pub use health::{health_check, liveness_check};
pub use webhook::{method_not_allowed, stripe_webhook};
