//! `SeaORM` active enums mapped to `PostgreSQL` enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::import_review::DuplicateStatus;

/// `staged_duplicate_status` column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "staged_duplicate_status"
)]
pub enum StagedDuplicateStatus {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "exact_duplicate")]
    ExactDuplicate,
    #[sea_orm(string_value = "potential_duplicate")]
    PotentialDuplicate,
}

impl From<DuplicateStatus> for StagedDuplicateStatus {
    fn from(status: DuplicateStatus) -> Self {
        match status {
            DuplicateStatus::New => Self::New,
            DuplicateStatus::ExactDuplicate => Self::ExactDuplicate,
            DuplicateStatus::PotentialDuplicate => Self::PotentialDuplicate,
        }
    }
}

impl From<StagedDuplicateStatus> for DuplicateStatus {
    fn from(status: StagedDuplicateStatus) -> Self {
        match status {
            StagedDuplicateStatus::New => Self::New,
            StagedDuplicateStatus::ExactDuplicate => Self::ExactDuplicate,
            StagedDuplicateStatus::PotentialDuplicate => Self::PotentialDuplicate,
        }
    }
}
