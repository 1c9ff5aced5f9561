use std::sync::Arc;

use chrono::{ DateTime, Utc };
use rust_decimal::Decimal;
use sea_orm::{ ActiveModelTrait, ActiveValue::Set, DatabaseConnection, DbErr, SqlErr };
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::{ WalletPolicy, WithdrawalPolicy };
use crate::db::{ ledger_entry, wallet_account, WalletRepository };
use crate::enums::WalletStatus;
use crate::error::{ AppError, Result };
use crate::services::ledger_service::{ LedgerService, TransactionFilter };
use crate::services::security_service::{ pin_state, PinState };

/// Wallet as shown to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct WalletSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub frozen_balance: Decimal,
    pub available_balance: Decimal,
    pub status: WalletStatus,
    pub withdrawal_enabled: bool,
    pub can_withdraw: bool,
    pub pin: PinState,
    pub daily_withdrawal_limit: Decimal,
    pub daily_withdrawn_amount: Decimal,
    pub daily_limit_remaining: Decimal,
    pub withdrawal_count: i32,
    pub total_deposited: Decimal,
    pub total_withdrawn: Decimal,
    pub created_at: DateTime<Utc>,
}

impl WalletSummary {
    pub fn from_model(wallet: &wallet_account::Model, reset_window: chrono::Duration) -> Self {
        let now = Utc::now();
        let daily_withdrawn = wallet.daily_withdrawn_at(now, reset_window);

        Self {
            id: wallet.id,
            user_id: wallet.user_id,
            balance: wallet.balance,
            frozen_balance: wallet.frozen_balance,
            available_balance: wallet.available_balance(),
            status: wallet.status,
            withdrawal_enabled: wallet.withdrawal_enabled,
            can_withdraw: wallet.can_withdraw(now),
            pin: pin_state(wallet, now),
            daily_withdrawal_limit: wallet.daily_withdrawal_limit,
            daily_withdrawn_amount: daily_withdrawn,
            daily_limit_remaining: (wallet.daily_withdrawal_limit - daily_withdrawn).max(
                Decimal::ZERO
            ),
            withdrawal_count: wallet.withdrawal_count,
            total_deposited: wallet.total_deposited,
            total_withdrawn: wallet.total_withdrawn,
            created_at: wallet.created_at,
        }
    }
}

#[derive(Clone)]
pub struct WalletService {
    db: DatabaseConnection,
    ledger: Arc<LedgerService>,
    policy: WalletPolicy,
    reset_window: chrono::Duration,
}

impl WalletService {
    pub fn new(
        db: DatabaseConnection,
        ledger: Arc<LedgerService>,
        policy: WalletPolicy,
        withdrawal_policy: &WithdrawalPolicy
    ) -> Self {
        Self {
            db,
            ledger,
            policy,
            reset_window: withdrawal_policy.daily_reset_window,
        }
    }

    /// Provisions the user's wallet with the welcome balance. Calling it for
    /// a user who already has a wallet returns the existing one.
    pub async fn create_wallet(&self, user_id: Uuid) -> Result<wallet_account::Model> {
        match WalletRepository::find_by_user(&self.db, user_id).await {
            Ok(wallet) => {
                return Ok(wallet);
            }
            Err(AppError::WalletNotFound) => {}
            Err(e) => {
                return Err(e);
            }
        }

        let now = Utc::now();
        let wallet = wallet_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            balance: Set(self.policy.welcome_amount),
            frozen_balance: Set(Decimal::ZERO),
            status: Set(WalletStatus::Active),
            withdrawal_enabled: Set(false),
            pin_hash: Set(None),
            pin_attempts: Set(0),
            pin_locked_until: Set(None),
            max_pin_attempts: Set(self.policy.max_pin_attempts),
            daily_withdrawal_limit: Set(self.policy.default_daily_limit),
            daily_withdrawn_amount: Set(Decimal::ZERO),
            last_withdrawal_reset: Set(None),
            withdrawal_count: Set(0),
            total_deposited: Set(Decimal::ZERO),
            total_withdrawn: Set(Decimal::ZERO),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match wallet.insert(&self.db).await {
            Ok(wallet) => {
                info!(user_id = %user_id, wallet_id = %wallet.id, balance = %wallet.balance, "Wallet created");
                Ok(wallet)
            }
            // Lost a creation race against another request for the same user
            Err(e) if Self::is_unique_violation(&e) =>
                WalletRepository::find_by_user(&self.db, user_id).await,
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_wallet(&self, user_id: Uuid) -> Result<WalletSummary> {
        let wallet = WalletRepository::find_by_user(&self.db, user_id).await?;
        Ok(WalletSummary::from_model(&wallet, self.reset_window))
    }

    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter
    ) -> Result<Vec<ledger_entry::Model>> {
        let wallet = WalletRepository::find_by_user(&self.db, user_id).await?;
        self.ledger.list_entries(wallet.id, filter).await
    }

    fn is_unique_violation(err: &DbErr) -> bool {
        matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    }
}
