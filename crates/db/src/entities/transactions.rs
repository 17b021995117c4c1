//! `SeaORM` Entity for the permanent `transactions` ledger.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: Uuid,
    pub tenant_id: Uuid,
    #[sea_orm(unique)]
    pub seq: i64,
    pub date: Date,
    #[sea_orm(column_type = "Text")]
    pub payee: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub source: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub external_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub memo: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_splits::Entity")]
    TransactionSplits,
}

impl Related<super::transaction_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionSplits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
