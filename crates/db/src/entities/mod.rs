//! `SeaORM` entity definitions.

pub mod sea_orm_active_enums;
pub mod staged_transactions;
pub mod transaction_splits;
pub mod transactions;
