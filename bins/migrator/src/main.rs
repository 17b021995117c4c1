//! Schema migration runner for Tally.
//!
//! Reads the connection string from `DATABASE_URL` (or `-u`), the same
//! database the server reaches through `TALLY__DATABASE__URL`.
//!
//! Usage:
//!   migrator up      - Create the ledger and staging tables
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use sea_orm_migration::prelude::*;
use tally_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI installs its own tracing subscriber
    cli::run_cli(Migrator).await;
}
