//! Row-Level Security (RLS) context management.
//!
//! Every staging and ledger table carries a `tenant_isolation` policy on
//! `app.current_tenant_id`. Repositories open an [`RlsConnection`] per
//! operation so the policy applies in addition to their explicit
//! `tenant_id` filters.
//!
//! # Usage
//!
//! ```ignore
//! use tally_db::rls::RlsConnection;
//!
//! let rls = RlsConnection::new(&db, tenant_id).await?;
//! let rows = staged_transactions::Entity::find().all(rls.transaction()).await?;
//! rls.commit().await?;
//! ```

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tally_shared::types::TenantId;

/// A database transaction scoped to one tenant.
///
/// The `app.current_tenant_id` setting is applied with `SET LOCAL`, so it
/// ends with the transaction and never leaks to another pooled connection.
pub struct RlsConnection {
    txn: DatabaseTransaction,
}

impl RlsConnection {
    /// Begins a transaction and sets the tenant context.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or the RLS
    /// context cannot be set.
    pub async fn new(db: &DatabaseConnection, tenant_id: TenantId) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        set_rls_context(&txn, tenant_id).await?;
        Ok(Self { txn })
    }

    /// Returns the underlying transaction for executing queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }
}

/// Builds the `SET LOCAL` statement for a tenant.
///
/// The value is a formatted UUID, never caller-controlled text.
fn rls_statement(tenant_id: TenantId) -> String {
    format!("SET LOCAL app.current_tenant_id = '{tenant_id}'")
}

/// Sets the RLS context on an existing transaction.
///
/// # Errors
///
/// Returns an error if the RLS context cannot be set.
pub async fn set_rls_context(txn: &DatabaseTransaction, tenant_id: TenantId) -> Result<(), DbErr> {
    txn.execute_unprepared(&rls_statement(tenant_id)).await?;
    Ok(())
}
