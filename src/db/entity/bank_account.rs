use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

use crate::enums::{ BankAccountStatus, BankAccountType, Lifecycle };

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub bank_id: Uuid,
    #[serde(skip_serializing)]
    pub account_number_encrypted: String,
    pub account_number_last4: String,
    #[serde(skip_serializing)]
    pub account_fingerprint: String,
    pub account_holder_name: String,
    pub account_type: BankAccountType,
    pub status: BankAccountStatus,
    pub is_default: bool,
    pub is_verified: bool,
    pub usage_count: i32,
    pub last_used_at: Option<DateTimeUtc>,
    pub lifecycle: Lifecycle,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bank::Entity",
        from = "Column::BankId",
        to = "super::bank::Column::Id"
    )]
    Bank,
}

impl Related<super::bank::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bank.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_usable(&self) -> bool {
        self.lifecycle == Lifecycle::Active && self.status == BankAccountStatus::Active
    }
}
