use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

use crate::enums::{ WithdrawalPriority, WithdrawalStatus };

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawal_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub reference: String,
    pub wallet_id: Uuid,
    pub user_id: Uuid,
    pub bank_account_id: Uuid,
    pub currency_code: String,
    pub amount_token: Decimal,
    pub amount_local: Decimal,
    pub exchange_rate: Decimal,
    pub fee_token: Decimal,
    pub net_amount_token: Decimal,
    pub status: WithdrawalStatus,
    pub priority: WithdrawalPriority,
    pub debit_entry_id: Uuid,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTimeUtc>,
    pub review_notes: Option<String>,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTimeUtc>,
    pub processing_notes: Option<String>,
    pub completed_at: Option<DateTimeUtc>,
    pub transaction_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub bank_name: String,
    pub bank_code: String,
    pub account_holder_name: String,
    pub account_number_last4: String,
    pub expires_at: DateTimeUtc,
    pub metadata: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallet_account::Entity",
        from = "Column::WalletId",
        to = "super::wallet_account::Column::Id"
    )]
    WalletAccount,
    #[sea_orm(
        belongs_to = "super::ledger_entry::Entity",
        from = "Column::DebitEntryId",
        to = "super::ledger_entry::Column::Id"
    )]
    DebitEntry,
}

impl Related<super::wallet_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalletAccount.def()
    }
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DebitEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_expired_at(&self, now: DateTimeUtc) -> bool {
        !self.status.is_terminal() && self.expires_at <= now
    }
}
