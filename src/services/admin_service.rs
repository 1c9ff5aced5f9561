use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ ActiveValue::Set, DatabaseConnection, TransactionTrait };
use serde::{ Deserialize, Serialize };
use tracing::{ info, warn };
use uuid::Uuid;

use crate::db::{
    bank,
    bank_account,
    currency,
    exchange_rate,
    ledger_entry,
    retry_on_conflict,
    wallet_account,
    withdrawal_request,
    WalletRepository,
};
use crate::enums::{ EntryType, WalletStatus };
use crate::error::{ AppError, Result };
use crate::identity::CurrentUser;
use crate::metadata::Metadata;
use crate::services::bank_account_service::{ BankAccountService, NewBank };
use crate::services::currency_service::{ CurrencyService, NewCurrency, NewExchangeRate };
use crate::services::ledger_service::{ EntryDraft, LedgerService };
use crate::services::withdrawal_service::WithdrawalService;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve {
        #[serde(default)]
        notes: Option<String>,
    },
    Reject {
        reason: String,
        #[serde(default)]
        notes: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProcessOutcome {
    Complete {
        transaction_reference: String,
        #[serde(default)]
        notes: Option<String>,
    },
    Fail {
        reason: String,
    },
}

/// Everything the payout operator needs to send the money.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutDetails {
    pub request: withdrawal_request::Model,
    /// `None` when the stored number can no longer be decrypted or the
    /// account row is gone.
    pub account_number: Option<String>,
}

/// Administrator-only operations. Every call checks the caller's role first.
#[derive(Clone)]
pub struct AdminService {
    db: DatabaseConnection,
    withdrawals: Arc<WithdrawalService>,
    ledger: Arc<LedgerService>,
    currencies: Arc<CurrencyService>,
    bank_accounts: Arc<BankAccountService>,
}

impl AdminService {
    pub fn new(
        db: DatabaseConnection,
        withdrawals: Arc<WithdrawalService>,
        ledger: Arc<LedgerService>,
        currencies: Arc<CurrencyService>,
        bank_accounts: Arc<BankAccountService>
    ) -> Self {
        Self {
            db,
            withdrawals,
            ledger,
            currencies,
            bank_accounts,
        }
    }

    // ─── Withdrawal review ──────────────────────────────────────────

    pub async fn list_pending_withdrawals(
        &self,
        actor: &CurrentUser,
        limit: u64
    ) -> Result<Vec<withdrawal_request::Model>> {
        actor.require_admin()?;
        self.withdrawals.list_pending(limit).await
    }

    pub async fn get_withdrawal(
        &self,
        actor: &CurrentUser,
        request_id: Uuid
    ) -> Result<withdrawal_request::Model> {
        actor.require_admin()?;
        self.withdrawals.find(request_id).await
    }

    pub async fn review_withdrawal(
        &self,
        actor: &CurrentUser,
        request_id: Uuid,
        decision: ReviewDecision
    ) -> Result<withdrawal_request::Model> {
        actor.require_admin()?;

        match decision {
            ReviewDecision::Approve { notes } => {
                let request = self.withdrawals.approve(request_id, actor.id, notes).await?;
                info!(admin_id = %actor.id, withdrawal_id = %request_id, "Withdrawal approved");
                Ok(request)
            }
            ReviewDecision::Reject { reason, notes } => {
                if reason.trim().is_empty() {
                    return Err(AppError::InvalidInput("A rejection reason is required".into()));
                }
                let request = self.withdrawals.reject(request_id, actor.id, reason, notes).await?;
                info!(admin_id = %actor.id, withdrawal_id = %request_id, "Withdrawal rejected and refunded");
                Ok(request)
            }
        }
    }

    pub async fn begin_processing(
        &self,
        actor: &CurrentUser,
        request_id: Uuid,
        notes: Option<String>
    ) -> Result<withdrawal_request::Model> {
        actor.require_admin()?;
        let request = self.withdrawals.begin_processing(request_id, actor.id, notes).await?;
        info!(admin_id = %actor.id, withdrawal_id = %request_id, "Withdrawal processing started");
        Ok(request)
    }

    pub async fn process_withdrawal(
        &self,
        actor: &CurrentUser,
        request_id: Uuid,
        outcome: ProcessOutcome
    ) -> Result<withdrawal_request::Model> {
        actor.require_admin()?;

        match outcome {
            ProcessOutcome::Complete { transaction_reference, notes } => {
                if transaction_reference.trim().is_empty() {
                    return Err(AppError::InvalidInput("A transaction reference is required".into()));
                }
                let request = self.withdrawals.complete(
                    request_id,
                    actor.id,
                    transaction_reference.trim().to_string(),
                    notes
                ).await?;
                info!(admin_id = %actor.id, withdrawal_id = %request_id, "Withdrawal completed");
                Ok(request)
            }
            ProcessOutcome::Fail { reason } => {
                if reason.trim().is_empty() {
                    return Err(AppError::InvalidInput("A failure reason is required".into()));
                }
                let request = self.withdrawals.fail(request_id, actor.id, reason).await?;
                warn!(admin_id = %actor.id, withdrawal_id = %request_id, "Withdrawal failed and refunded");
                Ok(request)
            }
        }
    }

    pub async fn payout_details(&self, actor: &CurrentUser, request_id: Uuid) -> Result<PayoutDetails> {
        actor.require_admin()?;
        let request = self.withdrawals.find(request_id).await?;

        let account_number = match self.bank_accounts.reveal_account_number(request.bank_account_id).await {
            Ok(number) => Some(number),
            Err(AppError::BankAccountNotFound) => None,
            Err(AppError::Encryption(e)) => {
                warn!(withdrawal_id = %request_id, error = %e, "Stored account number is unreadable");
                None
            }
            Err(e) => {
                return Err(e);
            }
        };

        info!(admin_id = %actor.id, withdrawal_id = %request_id, "Payout details revealed");
        Ok(PayoutDetails { request, account_number })
    }

    // ─── Wallet administration ──────────────────────────────────────

    /// Credits (positive) or debits (negative) a wallet outside any workflow.
    pub async fn adjust_wallet(
        &self,
        actor: &CurrentUser,
        user_id: Uuid,
        amount: Decimal,
        reason: &str
    ) -> Result<ledger_entry::Model> {
        actor.require_admin()?;

        if amount.is_zero() {
            return Err(AppError::InvalidInput("Adjustment amount cannot be zero".into()));
        }
        if reason.trim().is_empty() {
            return Err(AppError::InvalidInput("An adjustment reason is required".into()));
        }

        let entry = retry_on_conflict("adjust_wallet", || async move {
            let txn = self.db.begin().await?;
            let wallet = WalletRepository::find_by_user(&txn, user_id).await?;

            let draft = if amount > Decimal::ZERO {
                EntryDraft::credit(EntryType::Adjustment, amount)
            } else {
                EntryDraft::debit(EntryType::Adjustment, amount.abs())
            };
            let draft = draft
                .with_description(format!("Manual adjustment: {}", reason.trim()))
                .with_metadata(Metadata::ManualAdjustment {
                    reason: reason.trim().to_string(),
                    admin_id: actor.id,
                });

            let (entry, _) = self.ledger.record(&txn, wallet.id, draft).await?;
            txn.commit().await?;
            Ok(entry)
        }).await?;

        info!(
            admin_id = %actor.id,
            user_id = %user_id,
            amount = %amount,
            entry_id = %entry.id,
            "Wallet adjusted"
        );

        Ok(entry)
    }

    pub async fn freeze_wallet(
        &self,
        actor: &CurrentUser,
        user_id: Uuid,
        reason: &str
    ) -> Result<wallet_account::Model> {
        actor.require_admin()?;
        let wallet = self.set_wallet_status(user_id, WalletStatus::Active, WalletStatus::Frozen).await?;
        warn!(admin_id = %actor.id, user_id = %user_id, reason, "Wallet frozen");
        Ok(wallet)
    }

    pub async fn unfreeze_wallet(
        &self,
        actor: &CurrentUser,
        user_id: Uuid
    ) -> Result<wallet_account::Model> {
        actor.require_admin()?;
        let wallet = self.set_wallet_status(user_id, WalletStatus::Frozen, WalletStatus::Active).await?;
        info!(admin_id = %actor.id, user_id = %user_id, "Wallet unfrozen");
        Ok(wallet)
    }

    async fn set_wallet_status(
        &self,
        user_id: Uuid,
        from: WalletStatus,
        to: WalletStatus
    ) -> Result<wallet_account::Model> {
        retry_on_conflict("set_wallet_status", || async move {
            let txn = self.db.begin().await?;
            let wallet = WalletRepository::lock_by_user(&txn, user_id).await?;

            if wallet.status != from {
                return Err(
                    AppError::InvalidInput(
                        format!("Wallet is {}, expected {}", wallet.status.as_str(), from.as_str())
                    )
                );
            }

            let changes = wallet_account::ActiveModel {
                status: Set(to),
                ..Default::default()
            };
            let wallet = WalletRepository::save_versioned(&txn, &wallet, changes).await?;
            txn.commit().await?;
            Ok(wallet)
        }).await
    }

    pub async fn hold_funds(
        &self,
        actor: &CurrentUser,
        user_id: Uuid,
        amount: Decimal,
        reason: &str
    ) -> Result<ledger_entry::Model> {
        actor.require_admin()?;

        let entry = retry_on_conflict("hold_funds", || async move {
            let txn = self.db.begin().await?;
            let wallet = WalletRepository::find_by_user(&txn, user_id).await?;
            let (entry, _) = self.ledger.hold(&txn, wallet.id, amount, reason).await?;
            txn.commit().await?;
            Ok(entry)
        }).await?;

        info!(admin_id = %actor.id, user_id = %user_id, amount = %amount, "Funds held");
        Ok(entry)
    }

    pub async fn release_funds(
        &self,
        actor: &CurrentUser,
        user_id: Uuid,
        amount: Decimal,
        reason: &str
    ) -> Result<ledger_entry::Model> {
        actor.require_admin()?;

        let entry = retry_on_conflict("release_funds", || async move {
            let txn = self.db.begin().await?;
            let wallet = WalletRepository::find_by_user(&txn, user_id).await?;
            let (entry, _) = self.ledger.release(&txn, wallet.id, amount, reason).await?;
            txn.commit().await?;
            Ok(entry)
        }).await?;

        info!(admin_id = %actor.id, user_id = %user_id, amount = %amount, "Funds released");
        Ok(entry)
    }

    // ─── Reference data ─────────────────────────────────────────────

    pub async fn set_exchange_rate(
        &self,
        actor: &CurrentUser,
        mut rate: NewExchangeRate
    ) -> Result<exchange_rate::Model> {
        actor.require_admin()?;
        rate.created_by = Some(actor.id);
        self.currencies.set_rate(rate).await
    }

    pub async fn add_currency(&self, actor: &CurrentUser, new: NewCurrency) -> Result<currency::Model> {
        actor.require_admin()?;
        self.currencies.add_currency(new).await
    }

    pub async fn add_bank(&self, actor: &CurrentUser, new: NewBank) -> Result<bank::Model> {
        actor.require_admin()?;
        self.bank_accounts.add_bank(new).await
    }

    pub async fn verify_bank_account(
        &self,
        actor: &CurrentUser,
        account_id: Uuid
    ) -> Result<bank_account::Model> {
        actor.require_admin()?;
        self.bank_accounts.verify_account(account_id).await
    }
}
