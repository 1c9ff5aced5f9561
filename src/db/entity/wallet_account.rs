use chrono::Duration;
use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

use crate::enums::WalletStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub balance: Decimal,
    pub frozen_balance: Decimal,
    pub status: WalletStatus,
    pub withdrawal_enabled: bool,
    #[serde(skip_serializing)]
    pub pin_hash: Option<String>,
    pub pin_attempts: i32,
    pub pin_locked_until: Option<DateTimeUtc>,
    pub max_pin_attempts: i32,
    pub daily_withdrawal_limit: Decimal,
    pub daily_withdrawn_amount: Decimal,
    pub last_withdrawal_reset: Option<DateTimeUtc>,
    pub withdrawal_count: i32,
    pub total_deposited: Decimal,
    pub total_withdrawn: Decimal,
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger_entry::Entity")]
    LedgerEntry,
    #[sea_orm(has_many = "super::withdrawal_request::Entity")]
    WithdrawalRequest,
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntry.def()
    }
}

impl Related<super::withdrawal_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WithdrawalRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn available_balance(&self) -> Decimal {
        self.balance - self.frozen_balance
    }

    pub fn is_pin_locked(&self, now: DateTimeUtc) -> bool {
        self.pin_locked_until.map_or(false, |until| until > now)
    }

    pub fn can_withdraw(&self, now: DateTimeUtc) -> bool {
        self.status == WalletStatus::Active &&
            self.withdrawal_enabled &&
            self.pin_hash.is_some() &&
            !self.is_pin_locked(now)
    }

    /// Amount withdrawn in the current daily window. A window older than
    /// `reset_after` counts as empty.
    pub fn daily_withdrawn_at(&self, now: DateTimeUtc, reset_after: Duration) -> Decimal {
        if self.daily_window_elapsed(now, reset_after) {
            Decimal::ZERO
        } else {
            self.daily_withdrawn_amount
        }
    }

    pub fn daily_window_elapsed(&self, now: DateTimeUtc, reset_after: Duration) -> bool {
        self.last_withdrawal_reset.map_or(true, |reset| now - reset > reset_after)
    }
}
