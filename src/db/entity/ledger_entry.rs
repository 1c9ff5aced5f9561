use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

use crate::enums::{ EntryDirection, EntryStatus, EntryType, ReferenceType };

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entry")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub entry_type: EntryType,
    pub direction: EntryDirection,
    pub status: EntryStatus,
    pub amount: Decimal,
    pub fee: Decimal,
    pub net_amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub original_amount: Option<Decimal>,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<Uuid>,
    #[sea_orm(unique)]
    pub reverses_entry_id: Option<Uuid>,
    pub description: Option<String>,
    pub metadata: Option<String>,
    pub created_at: DateTimeUtc,
    pub processed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallet_account::Entity",
        from = "Column::WalletId",
        to = "super::wallet_account::Column::Id"
    )]
    WalletAccount,
}

impl Related<super::wallet_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalletAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Change this entry made to the wallet's `balance`.
    pub fn balance_delta(&self) -> Decimal {
        self.balance_after - self.balance_before
    }
}
