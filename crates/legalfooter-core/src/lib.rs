//! Core domain models and event types.
//!
//! Provides the checkout event envelope, the policy record model, the error
//! taxonomy for the webhook pipeline, and the storage layer that persists
//! policies. The API and mail crates depend on these types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod models;
pub mod storage;
pub mod time;

pub use error::{CoreError, Result, WebhookError};
pub use events::{
    CheckoutSession, CustomField, StripeEvent, CHECKOUT_SESSION_COMPLETED, PROTECTED_DOMAIN_FIELD,
};
pub use models::{NewPolicy, PolicyRecord, RecordId};
pub use time::{Clock, RealClock, TestClock};
