//! Stripe event envelope and checkout session extraction.
//!
//! Only the envelope's `type` is required. Everything under `data.object` is
//! optional at every level: a session missing its customer details or custom
//! fields still yields a `CheckoutSession`, with the absent values as `None`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Event type fired when a customer finishes a checkout flow.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Custom field key carrying the protected domain.
pub const PROTECTED_DOMAIN_FIELD: &str = "protecteddomain";

/// A verified notification from the payment processor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Processor-assigned event identifier.
    #[serde(default)]
    pub id: Option<String>,

    /// Event type tag, e.g. `checkout.session.completed`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp of event creation.
    #[serde(default)]
    pub created: Option<i64>,

    /// Whether the event came from live mode.
    #[serde(default)]
    pub livemode: Option<bool>,

    /// Event payload.
    #[serde(default)]
    pub data: Option<EventData>,
}

/// The `data` member of an event.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventData {
    /// The object the event is about. Shape depends on the event type.
    #[serde(default)]
    pub object: Value,
}

impl StripeEvent {
    /// Parses an event envelope from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the body is not an object with a string
    /// `type`.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// Returns true for the checkout completion event.
    pub fn is_checkout_completed(&self) -> bool {
        self.event_type == CHECKOUT_SESSION_COMPLETED
    }

    /// Interprets `data.object` as a checkout session.
    ///
    /// Never fails. An object that does not match the session shape degrades
    /// to an empty session so the event is still recorded.
    pub fn checkout_session(&self) -> CheckoutSession {
        let Some(object) = self.data.as_ref().map(|data| &data.object) else {
            return CheckoutSession::default();
        };

        if object.is_null() {
            return CheckoutSession::default();
        }

        match CheckoutSession::deserialize(object) {
            Ok(session) => session,
            Err(e) => {
                warn!(
                    event_id = self.id.as_deref().unwrap_or("unknown"),
                    error = %e,
                    "Checkout session has unexpected shape, treating fields as absent"
                );
                CheckoutSession::default()
            },
        }
    }
}

/// A Stripe checkout session, as carried by the completion event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckoutSession {
    /// Session identifier (`cs_...`).
    #[serde(default)]
    pub id: Option<String>,

    /// Customer identifier. Accepts either the id string or an expanded
    /// customer object.
    #[serde(default, deserialize_with = "id_or_expanded")]
    pub customer: Option<String>,

    /// Details collected from the customer during checkout.
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,

    /// Custom fields configured on the checkout.
    #[serde(default)]
    pub custom_fields: Option<Vec<CustomField>>,
}

/// Customer details collected during checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomerDetails {
    /// Email address, when collected.
    #[serde(default)]
    pub email: Option<String>,

    /// Customer name, when collected.
    #[serde(default)]
    pub name: Option<String>,
}

/// A custom checkout field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomField {
    /// Field key.
    #[serde(default)]
    pub key: Option<String>,

    /// Field type (`text`, `numeric`, `dropdown`).
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,

    /// Value holder for text fields.
    #[serde(default)]
    pub text: Option<TextValue>,
}

/// The value holder of a text custom field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TextValue {
    /// Entered value.
    #[serde(default)]
    pub value: Option<String>,
}

impl CheckoutSession {
    /// Customer email from the collected details.
    pub fn customer_email(&self) -> Option<&str> {
        self.customer_details.as_ref()?.email.as_deref()
    }

    /// Text value of the first custom field with the given key.
    pub fn custom_field_value(&self, key: &str) -> Option<&str> {
        self.custom_fields
            .as_deref()?
            .iter()
            .find(|field| field.key.as_deref() == Some(key))?
            .text
            .as_ref()?
            .value
            .as_deref()
    }

    /// The domain the purchaser asked to protect.
    pub fn protected_domain(&self) -> Option<&str> {
        self.custom_field_value(PROTECTED_DOMAIN_FIELD)
    }
}

fn id_or_expanded<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(id)) => Some(id),
        Some(Value::Object(map)) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    })
}
