//! Checkout event builders.
//!
//! Produces event bodies shaped like the ones Stripe delivers for hosted
//! checkout, with a realistic default session that tests trim or override.

use legalfooter_core::{CHECKOUT_SESSION_COMPLETED, PROTECTED_DOMAIN_FIELD};
use serde_json::{json, Value};
use uuid::Uuid;

/// Default purchaser address.
pub const DEFAULT_EMAIL: &str = "owner@example.com";

/// Default protected domain.
pub const DEFAULT_DOMAIN: &str = "example.com";

/// Default customer id.
pub const DEFAULT_CUSTOMER: &str = "cus_test_123";

/// Builder for checkout webhook event bodies.
#[derive(Debug, Clone)]
pub struct CheckoutEventBuilder {
    event_id: String,
    event_type: String,
    session_id: Option<String>,
    customer: Option<Value>,
    email: Option<String>,
    custom_fields: Vec<Value>,
}

impl Default for CheckoutEventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutEventBuilder {
    /// Creates a completed checkout with an email and a protected domain.
    pub fn new() -> Self {
        Self {
            event_id: format!("evt_{}", Uuid::new_v4().simple()),
            event_type: CHECKOUT_SESSION_COMPLETED.to_string(),
            session_id: Some(format!("cs_test_{}", Uuid::new_v4().simple())),
            customer: Some(Value::String(DEFAULT_CUSTOMER.to_string())),
            email: Some(DEFAULT_EMAIL.to_string()),
            custom_fields: vec![text_field(PROTECTED_DOMAIN_FIELD, DEFAULT_DOMAIN)],
        }
    }

    /// Sets the event type tag.
    #[must_use]
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    /// Sets the event id.
    #[must_use]
    pub fn event_id(mut self, id: impl Into<String>) -> Self {
        self.event_id = id.into();
        self
    }

    /// Sets the checkout session id.
    #[must_use]
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Sets the purchaser email.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Removes `customer_details` entirely.
    #[must_use]
    pub fn without_email(mut self) -> Self {
        self.email = None;
        self
    }

    /// Replaces the protected domain field.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        self.custom_fields.retain(|f| f["key"] != PROTECTED_DOMAIN_FIELD);
        self.custom_fields.insert(0, text_field(PROTECTED_DOMAIN_FIELD, &domain));
        self
    }

    /// Removes the protected domain field.
    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.custom_fields.retain(|f| f["key"] != PROTECTED_DOMAIN_FIELD);
        self
    }

    /// Appends another text custom field.
    #[must_use]
    pub fn custom_field(mut self, key: &str, value: &str) -> Self {
        self.custom_fields.push(text_field(key, value));
        self
    }

    /// Delivers the customer as an expanded object rather than an id.
    #[must_use]
    pub fn expanded_customer(mut self, id: &str) -> Self {
        self.customer = Some(json!({ "id": id, "object": "customer" }));
        self
    }

    /// Builds the event as JSON.
    pub fn build(&self) -> Value {
        let mut session = json!({
            "id": self.session_id,
            "object": "checkout.session",
            "mode": "payment",
            "payment_status": "paid",
            "customer": self.customer,
            "custom_fields": self.custom_fields,
        });

        if let Some(email) = &self.email {
            session["customer_details"] = json!({ "email": email, "name": "Test Owner" });
        }

        json!({
            "id": self.event_id,
            "object": "event",
            "type": self.event_type,
            "created": 1_700_000_000,
            "livemode": false,
            "data": { "object": session },
        })
    }

    /// Builds the event as the raw bytes that get signed.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.build().to_string().into_bytes()
    }
}

fn text_field(key: &str, value: &str) -> Value {
    json!({
        "key": key,
        "type": "text",
        "label": { "type": "custom", "custom": key },
        "text": { "value": value },
    })
}
