//! Database access layer for policy records.
//!
//! The repository owns the SQL. The `PolicyStore` trait is the seam the
//! webhook pipeline depends on, so handlers can be exercised against the
//! in-memory `mock::MockPolicyStore` without a database.

use std::{future::Future, pin::Pin, sync::Arc};

use sqlx::PgPool;

pub mod policies;

use crate::{
    error::Result,
    models::{NewPolicy, PolicyRecord},
};

/// Storage operations required by the webhook pipeline.
pub trait PolicyStore: Send + Sync + 'static {
    /// Inserts one policy record and returns it with its generated id.
    ///
    /// No deduplication happens here: inserting the same payload twice
    /// produces two records.
    fn insert_policy(
        &self,
        policy: NewPolicy,
    ) -> Pin<Box<dyn Future<Output = Result<PolicyRecord>> + Send + '_>>;

    /// Verifies the backing store is reachable.
    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Container for repository instances sharing one connection pool.
#[derive(Clone)]
pub struct Storage {
    /// Repository for policy records.
    pub policies: Arc<policies::Repository>,
}

impl Storage {
    /// Creates a new storage instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);
        Self { policies: Arc::new(policies::Repository::new(pool)) }
    }

    /// Executes `SELECT 1` to verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the connection is unhealthy.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.policies.pool()).await?;
        Ok(())
    }
}

impl PolicyStore for Storage {
    fn insert_policy(
        &self,
        policy: NewPolicy,
    ) -> Pin<Box<dyn Future<Output = Result<PolicyRecord>> + Send + '_>> {
        Box::pin(async move { self.policies.insert(&policy).await })
    }

    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(Storage::health_check(self))
    }
}

/// Creates the policy table if it does not exist.
///
/// # Errors
///
/// Returns `CoreError::Database` if the DDL fails.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS legalfooter_policies (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email TEXT,
            domain TEXT,
            stripe_customer_id TEXT,
            policy_id TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        ",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r"
        CREATE INDEX IF NOT EXISTS idx_legalfooter_policies_policy_id
        ON legalfooter_policies(policy_id)
        ",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub mod mock {
    //! In-memory policy store for tests.
    //!
    //! Generates record ids locally, records every insert, and can be told
    //! to fail the next insert to simulate a persistence outage.

    use std::{future::Future, pin::Pin, sync::Arc};

    use chrono::Utc;
    use tokio::sync::RwLock;

    use super::PolicyStore;
    use crate::{
        error::{CoreError, Result},
        models::{NewPolicy, PolicyRecord, RecordId},
    };

    /// Mock store keeping records in insertion order.
    #[derive(Clone, Default)]
    pub struct MockPolicyStore {
        records: Arc<RwLock<Vec<PolicyRecord>>>,
        insert_error: Arc<RwLock<Option<String>>>,
        fail_all_inserts: Arc<RwLock<Option<String>>>,
        unhealthy: Arc<RwLock<Option<String>>>,
        attempts: Arc<RwLock<usize>>,
    }

    impl MockPolicyStore {
        /// Creates an empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Fails the next insert with a database error.
        pub async fn inject_insert_error(&self, error: impl Into<String>) {
            *self.insert_error.write().await = Some(error.into());
        }

        /// Fails every subsequent insert.
        pub async fn fail_inserts(&self, error: impl Into<String>) {
            *self.fail_all_inserts.write().await = Some(error.into());
        }

        /// Makes `health_check` fail with the given message.
        pub async fn set_unhealthy(&self, error: impl Into<String>) {
            *self.unhealthy.write().await = Some(error.into());
        }

        /// Returns all stored records.
        pub async fn records(&self) -> Vec<PolicyRecord> {
            self.records.read().await.clone()
        }

        /// Number of insert calls, including failed ones.
        pub async fn insert_attempts(&self) -> usize {
            *self.attempts.read().await
        }
    }

    impl PolicyStore for MockPolicyStore {
        fn insert_policy(
            &self,
            policy: NewPolicy,
        ) -> Pin<Box<dyn Future<Output = Result<PolicyRecord>> + Send + '_>> {
            Box::pin(async move {
                *self.attempts.write().await += 1;

                if let Some(error) = self.insert_error.write().await.take() {
                    return Err(CoreError::Database(error));
                }
                if let Some(error) = self.fail_all_inserts.read().await.clone() {
                    return Err(CoreError::Database(error));
                }

                let record = PolicyRecord::from_new(RecordId::new(), policy, Utc::now());
                self.records.write().await.push(record.clone());
                Ok(record)
            })
        }

        fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                match self.unhealthy.read().await.clone() {
                    Some(error) => Err(CoreError::Database(error)),
                    None => Ok(()),
                }
            })
        }
    }
}
