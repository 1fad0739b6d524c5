// Credential store - the persistence seam for plans, transactions and logins
// Allocation and duplicate protection live in the database procedure

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::sql_types::{BigInt, Text};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    db::{check_diesel_health, DieselPool},
    models::{AllocationRow, Credentials, Plan, Transaction},
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Database query failed: {0}")]
    Query(#[from] diesel::result::Error),
}

/// Everything needed to record a verified payment and hand out a login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub reference: String,
    pub email: String,
    pub plan_type: String,
    /// Paid amount in currency subunits
    pub amount: i64,
}

/// What the allocation procedure did with an `IssueRequest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// A new login was assigned to this payment
    Issued(Credentials),
    /// The reference was already recorded for this email; same login as before
    Replayed(Credentials),
    /// The reference was already recorded for a different email
    ClaimedByOther,
    /// The plan has no logins left
    OutOfStock,
}

impl From<Option<AllocationRow>> for Allocation {
    fn from(row: Option<AllocationRow>) -> Self {
        let Some(row) = row else {
            return Allocation::OutOfStock;
        };

        match (row.username, row.password) {
            (Some(username), Some(password)) => {
                let credentials = Credentials { username, password };
                if row.replayed {
                    Allocation::Replayed(credentials)
                } else {
                    Allocation::Issued(credentials)
                }
            },
            _ => Allocation::ClaimedByOther,
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// All plans, cheapest first
    async fn list_plans(&self) -> Result<Vec<Plan>, StoreError>;

    async fn find_plan(&self, plan_type: &str) -> Result<Option<Plan>, StoreError>;

    async fn find_transaction(&self, reference: &str) -> Result<Option<Transaction>, StoreError>;

    /// Latest transaction for `email` (case-insensitive) created at or after `since`
    async fn find_recent_transaction(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Record the transaction and allocate one login for it.
    /// Replaying a recorded reference yields the login already linked to it,
    /// and only when `request.email` matches the recorded payer.
    async fn issue_credentials(&self, request: &IssueRequest) -> Result<Allocation, StoreError>;

    /// Login linked to `reference`, only if the transaction belongs to `email`
    async fn find_credentials(
        &self,
        reference: &str,
        email: &str,
    ) -> Result<Option<(Transaction, Credentials)>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

type PooledConn<'a> = bb8::PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Postgres-backed store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: DieselPool,
}

impl PgCredentialStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<PooledConn<'_>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn list_plans(&self) -> Result<Vec<Plan>, StoreError> {
        let mut conn = self.conn().await?;
        Ok(Plan::list_by_price(&mut conn).await?)
    }

    async fn find_plan(&self, plan_type: &str) -> Result<Option<Plan>, StoreError> {
        let mut conn = self.conn().await?;
        Ok(Plan::find_by_type(&mut conn, plan_type).await?)
    }

    async fn find_transaction(&self, reference: &str) -> Result<Option<Transaction>, StoreError> {
        let mut conn = self.conn().await?;
        Ok(Transaction::find_by_reference(&mut conn, reference).await?)
    }

    async fn find_recent_transaction(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Transaction>, StoreError> {
        let mut conn = self.conn().await?;
        Ok(Transaction::find_recent_for_email(&mut conn, email, since).await?)
    }

    #[instrument(skip(self), fields(reference = %request.reference, plan = %request.plan_type))]
    async fn issue_credentials(&self, request: &IssueRequest) -> Result<Allocation, StoreError> {
        let mut conn = self.conn().await?;

        let rows: Vec<AllocationRow> = diesel::sql_query(
            "SELECT username, password, replayed \
             FROM process_transaction_and_delete_login($1, $2, $3, $4)",
        )
        .bind::<Text, _>(&request.reference)
        .bind::<Text, _>(&request.email)
        .bind::<Text, _>(&request.plan_type)
        .bind::<BigInt, _>(request.amount)
        .load(&mut conn)
        .await?;

        debug!("Allocation procedure returned {} row(s)", rows.len());

        Ok(rows.into_iter().next().into())
    }

    async fn find_credentials(
        &self,
        reference: &str,
        email: &str,
    ) -> Result<Option<(Transaction, Credentials)>, StoreError> {
        let mut conn = self.conn().await?;
        let found = Transaction::find_with_login(&mut conn, reference, email).await?;
        Ok(found.map(|(tx, login)| (tx, Credentials::from(login))))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        check_diesel_health(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}
