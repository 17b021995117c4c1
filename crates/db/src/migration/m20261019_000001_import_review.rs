//! Initial schema: permanent ledger, default splits and the import staging area.
//!
//! All three tables are tenant-owned and protected by RLS policies on
//! `app.current_tenant_id`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: LEDGER
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(TRANSACTION_SPLITS_SQL).await?;

        // ============================================================
        // PART 3: STAGING
        // ============================================================
        db.execute_unprepared(STAGED_TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 4: ROW-LEVEL SECURITY
        // ============================================================
        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE staged_duplicate_status AS ENUM (
    'new',
    'exact_duplicate',
    'potential_duplicate'
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    key             UUID PRIMARY KEY,
    tenant_id       UUID NOT NULL,
    seq             BIGSERIAL NOT NULL UNIQUE,
    date            DATE NOT NULL,
    payee           TEXT NOT NULL,
    amount          NUMERIC(19, 4) NOT NULL,
    source          TEXT,
    external_id     TEXT,
    memo            TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_transactions_tenant_external_id
    ON transactions(tenant_id, external_id)
    WHERE external_id IS NOT NULL;
CREATE INDEX idx_transactions_tenant_date ON transactions(tenant_id, date DESC);
";

const TRANSACTION_SPLITS_SQL: &str = r"
CREATE TABLE transaction_splits (
    id              UUID PRIMARY KEY,
    transaction_key UUID NOT NULL REFERENCES transactions(key) ON DELETE CASCADE,
    tenant_id       UUID NOT NULL,
    amount          NUMERIC(19, 4) NOT NULL,
    category        TEXT,
    memo            TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_transaction_splits_transaction ON transaction_splits(transaction_key);
";

const STAGED_TRANSACTIONS_SQL: &str = r"
CREATE TABLE staged_transactions (
    key              UUID PRIMARY KEY,
    tenant_id        UUID NOT NULL,
    seq              BIGSERIAL NOT NULL UNIQUE,
    date             DATE NOT NULL,
    payee            TEXT NOT NULL,
    amount           NUMERIC(19, 4) NOT NULL,
    source           TEXT NOT NULL DEFAULT 'bank_import',
    external_id      TEXT,
    memo             TEXT,
    duplicate_status staged_duplicate_status NOT NULL,
    duplicate_of_key UUID,
    is_selected      BOOLEAN NOT NULL,
    imported_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Duplicate lookups
CREATE INDEX idx_staged_tenant_external_id
    ON staged_transactions(tenant_id, external_id)
    WHERE external_id IS NOT NULL;

-- Selection counts and the finalize read
CREATE INDEX idx_staged_tenant_selected ON staged_transactions(tenant_id, is_selected);

-- Review page ordering
CREATE INDEX idx_staged_tenant_review_order
    ON staged_transactions(tenant_id, date DESC, payee, seq DESC);
";

const RLS_SQL: &str = r"
ALTER TABLE transactions ENABLE ROW LEVEL SECURITY;
ALTER TABLE transaction_splits ENABLE ROW LEVEL SECURITY;
ALTER TABLE staged_transactions ENABLE ROW LEVEL SECURITY;

ALTER TABLE transactions FORCE ROW LEVEL SECURITY;
ALTER TABLE transaction_splits FORCE ROW LEVEL SECURITY;
ALTER TABLE staged_transactions FORCE ROW LEVEL SECURITY;

-- Application sets context per transaction: SET LOCAL app.current_tenant_id = 'tenant-uuid';

CREATE POLICY tenant_isolation ON transactions
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON transaction_splits
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON staged_transactions
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS staged_transactions;
DROP TABLE IF EXISTS transaction_splits;
DROP TABLE IF EXISTS transactions;
DROP TYPE IF EXISTS staged_duplicate_status;
";
