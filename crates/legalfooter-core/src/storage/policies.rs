//! Repository for policy record operations.
//!
//! Records are insert-only. The insert returns the full row, including the
//! id generated by the database, in a single round trip.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{NewPolicy, PolicyRecord, RecordId},
};

/// Repository for policy records.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Inserts a policy and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails or a constraint is violated.
    pub async fn insert(&self, policy: &NewPolicy) -> Result<PolicyRecord> {
        let record = sqlx::query_as::<_, PolicyRecord>(
            r"
            INSERT INTO legalfooter_policies (email, domain, stripe_customer_id, policy_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, domain, stripe_customer_id, policy_id, created_at
            ",
        )
        .bind(&policy.email)
        .bind(&policy.domain)
        .bind(&policy.stripe_customer_id)
        .bind(&policy.policy_id)
        .fetch_one(&*self.pool)
        .await?;

        Ok(record)
    }

    /// Finds a record by its generated id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn find_by_id(&self, id: RecordId) -> Result<Option<PolicyRecord>> {
        let record = sqlx::query_as::<_, PolicyRecord>(
            r"
            SELECT id, email, domain, stripe_customer_id, policy_id, created_at
            FROM legalfooter_policies
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(record)
    }

    /// Finds all records created for a checkout session, oldest first.
    ///
    /// More than one row means the completion event was delivered more
    /// than once.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn find_by_session(&self, session_id: &str) -> Result<Vec<PolicyRecord>> {
        let records = sqlx::query_as::<_, PolicyRecord>(
            r"
            SELECT id, email, domain, stripe_customer_id, policy_id, created_at
            FROM legalfooter_policies
            WHERE policy_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(session_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(records)
    }
}
