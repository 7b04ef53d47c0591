//! Policy records and strongly-typed identifiers.
//!
//! A policy record is written once per checkout completion and never
//! modified afterwards. The record id is generated by the database at insert
//! time and returned in the same statement.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::CheckoutSession;

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type PgArgumentBuffer = sqlx::postgres::PgArgumentBuffer;
type EncodeResult =
    Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>>;
type BoxDynError = sqlx::error::BoxDynError;

/// Prefix of the policy number shown to purchasers.
pub const POLICY_NUMBER_PREFIX: &str = "LFP-";

/// Strongly-typed policy record identifier.
///
/// Assigned by the database (`gen_random_uuid()`) when the record is
/// inserted.
///
/// # Example
///
/// ```
/// use legalfooter_core::models::RecordId;
/// let id = RecordId::new();
/// assert!(id.policy_number().starts_with("LFP-"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Creates a new random record ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Policy number printed in the confirmation email.
    pub fn policy_number(&self) -> String {
        format!("{POLICY_NUMBER_PREFIX}{}", self.0)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for RecordId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for RecordId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for RecordId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Insert payload for a policy record.
///
/// Every column is nullable: an event with incomplete business data is still
/// recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPolicy {
    /// Purchaser email.
    pub email: Option<String>,
    /// Protected domain from the `protecteddomain` custom field.
    pub domain: Option<String>,
    /// Stripe customer identifier.
    pub stripe_customer_id: Option<String>,
    /// Stripe checkout session id, used as the external policy reference.
    pub policy_id: Option<String>,
}

impl NewPolicy {
    /// Extracts the insert payload from a completed checkout session.
    pub fn from_session(session: &CheckoutSession) -> Self {
        Self {
            email: session.customer_email().map(str::to_string),
            domain: session.protected_domain().map(str::to_string),
            stripe_customer_id: session.customer.clone(),
            policy_id: session.id.clone(),
        }
    }
}

/// A persisted policy record, as returned by the insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PolicyRecord {
    /// Generated record identifier.
    pub id: RecordId,
    /// Purchaser email.
    pub email: Option<String>,
    /// Protected domain.
    pub domain: Option<String>,
    /// Stripe customer identifier.
    pub stripe_customer_id: Option<String>,
    /// Stripe checkout session id.
    pub policy_id: Option<String>,
    /// Insert time, set by the database.
    pub created_at: DateTime<Utc>,
}

impl PolicyRecord {
    /// Builds a record from an insert payload with the given id and time.
    ///
    /// Used by storage implementations that generate ids themselves.
    pub fn from_new(id: RecordId, policy: NewPolicy, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            email: policy.email,
            domain: policy.domain,
            stripe_customer_id: policy.stripe_customer_id,
            policy_id: policy.policy_id,
            created_at,
        }
    }

    /// Policy number shown to the purchaser.
    pub fn policy_number(&self) -> String {
        self.id.policy_number()
    }
}
