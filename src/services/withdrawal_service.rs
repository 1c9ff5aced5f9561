use std::sync::Arc;

use chrono::{ DateTime, Utc };
use rand::{ distr::Alphanumeric, Rng };
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait,
    DatabaseConnection,
    DatabaseTransaction,
    EntityTrait,
    QueryFilter,
    QueryOrder,
    QuerySelect,
    TransactionTrait,
};
use serde::{ Deserialize, Serialize };
use tracing::{ error, info, warn };
use uuid::Uuid;

use crate::config::WithdrawalPolicy;
use crate::db::{
    bank,
    bank_account,
    retry_on_conflict,
    wallet_account,
    withdrawal_request,
    WalletRepository,
    WithdrawalRequest,
};
use crate::enums::{
    EntryStatus,
    EntryType,
    ReferenceType,
    WalletStatus,
    WithdrawalPriority,
    WithdrawalStatus,
};
use crate::error::{ AppError, Result };
use crate::metadata::Metadata;
use crate::services::bank_account_service::BankAccountService;
use crate::services::currency_service::CurrencyService;
use crate::services::fee_policy::FeePolicy;
use crate::services::ledger_service::{ CurrencyContext, EntryDraft, LedgerService, Reversal };
use crate::services::security_service::SecurityService;

/// Token-side pricing of a local-currency payout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pricing {
    pub currency_code: String,
    pub amount_local: Decimal,
    pub amount_token: Decimal,
    pub exchange_rate: Decimal,
    pub fee_token: Decimal,
    /// Tokens leaving the wallet: `amount_token + fee_token`.
    pub net_amount_token: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalQuote {
    #[serde(flatten)]
    pub pricing: Pricing,
    pub available_balance: Decimal,
    pub daily_limit_remaining: Decimal,
}

#[derive(Debug, Clone)]
pub struct SubmitWithdrawal {
    pub currency_code: String,
    pub amount_local: Decimal,
    pub bank_account_id: Uuid,
    pub pin: String,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WithdrawalFilter {
    pub status: Option<WithdrawalStatus>,
    pub currency_code: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Audit data stamped on a request as it changes state.
#[derive(Debug, Clone, Default)]
pub struct TransitionAudit {
    pub actor: Option<Uuid>,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub transaction_reference: Option<String>,
}

impl TransitionAudit {
    pub fn by(actor: Uuid) -> Self {
        Self { actor: Some(actor), ..Default::default() }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn apply(&self, to: WithdrawalStatus, changes: &mut withdrawal_request::ActiveModel, now: DateTime<Utc>) {
        match to {
            WithdrawalStatus::Approved | WithdrawalStatus::Rejected => {
                changes.reviewed_by = Set(self.actor);
                changes.reviewed_at = Set(Some(now));
                changes.review_notes = Set(self.notes.clone());
            }
            WithdrawalStatus::Processing => {
                changes.processed_by = Set(self.actor);
                changes.processed_at = Set(Some(now));
                changes.processing_notes = Set(self.notes.clone());
            }
            WithdrawalStatus::Completed => {
                changes.completed_at = Set(Some(now));
                changes.transaction_reference = Set(self.transaction_reference.clone());
                if self.notes.is_some() {
                    changes.processing_notes = Set(self.notes.clone());
                }
            }
            _ => {}
        }

        if to.refunds_debit() {
            changes.failure_reason = Set(self.reason.clone());
        }
    }
}

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 200;

/// Withdrawal request life cycle from submission to payout or refund.
#[derive(Clone)]
pub struct WithdrawalService {
    db: DatabaseConnection,
    currencies: Arc<CurrencyService>,
    security: Arc<SecurityService>,
    ledger: Arc<LedgerService>,
    bank_accounts: Arc<BankAccountService>,
    fee_policy: FeePolicy,
    policy: WithdrawalPolicy,
}

impl WithdrawalService {
    pub fn new(
        db: DatabaseConnection,
        currencies: Arc<CurrencyService>,
        security: Arc<SecurityService>,
        ledger: Arc<LedgerService>,
        bank_accounts: Arc<BankAccountService>,
        fee_policy: FeePolicy,
        policy: WithdrawalPolicy
    ) -> Self {
        Self {
            db,
            currencies,
            security,
            ledger,
            bank_accounts,
            fee_policy,
            policy,
        }
    }

    // ─── Pricing ────────────────────────────────────────────────────

    async fn price(&self, currency_code: &str, amount_local: Decimal) -> Result<Pricing> {
        if amount_local <= Decimal::ZERO {
            return Err(AppError::InvalidInput("Withdrawal amount must be positive".into()));
        }

        let token = self.currencies.get_currency(&self.policy.token_code).await?;
        let inverse = self.currencies.invert(
            amount_local,
            &self.policy.token_code,
            currency_code
        ).await?;

        if inverse.amount_token <= Decimal::ZERO {
            return Err(AppError::InvalidInput("Withdrawal amount is too small".into()));
        }

        let fee_token = self.fee_policy.fee_for(inverse.amount_token, token.places());

        Ok(Pricing {
            currency_code: currency_code.trim().to_uppercase(),
            amount_local: inverse.amount_local,
            amount_token: inverse.amount_token,
            exchange_rate: inverse.rate,
            fee_token,
            net_amount_token: inverse.amount_token + fee_token,
        })
    }

    /// Balance and daily-limit checks. Returns the amount already withdrawn
    /// in the current daily window.
    fn check_limits(
        &self,
        wallet: &wallet_account::Model,
        pricing: &Pricing,
        now: DateTime<Utc>
    ) -> Result<Decimal> {
        let available = wallet.available_balance();
        if pricing.net_amount_token > available {
            return Err(AppError::InsufficientBalance {
                available,
                required: pricing.net_amount_token,
            });
        }

        let withdrawn_today = wallet.daily_withdrawn_at(now, self.policy.daily_reset_window);
        if withdrawn_today + pricing.amount_token > wallet.daily_withdrawal_limit {
            return Err(AppError::DailyLimitExceeded {
                limit: wallet.daily_withdrawal_limit,
                remaining: (wallet.daily_withdrawal_limit - withdrawn_today).max(Decimal::ZERO),
            });
        }

        Ok(withdrawn_today)
    }

    fn ensure_withdrawable(wallet: &wallet_account::Model, now: DateTime<Utc>) -> Result<()> {
        if wallet.status != WalletStatus::Active {
            return Err(AppError::WalletNotActive(wallet.status));
        }
        if wallet.pin_hash.is_none() {
            return Err(AppError::PinNotSet);
        }
        if let Some(until) = wallet.pin_locked_until.filter(|until| *until > now) {
            return Err(AppError::PinLocked { until });
        }
        if !wallet.withdrawal_enabled {
            return Err(AppError::WithdrawalDisabled);
        }
        Ok(())
    }

    fn priority_for(&self, amount_token: Decimal) -> WithdrawalPriority {
        if amount_token >= self.policy.high_priority_threshold {
            WithdrawalPriority::High
        } else {
            WithdrawalPriority::Normal
        }
    }

    fn generate_reference(now: DateTime<Utc>) -> String {
        let suffix: String = rand
            ::rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(|b| (b as char).to_ascii_uppercase())
            .collect();
        format!("WDR-{}-{}", now.format("%Y%m%d"), suffix)
    }

    // ─── User operations ────────────────────────────────────────────

    /// Prices a withdrawal and runs the eligibility checks without side effects.
    pub async fn calculate(
        &self,
        user_id: Uuid,
        currency_code: &str,
        amount_local: Decimal
    ) -> Result<WithdrawalQuote> {
        let pricing = self.price(currency_code, amount_local).await?;
        let wallet = WalletRepository::find_by_user(&self.db, user_id).await?;
        let now = Utc::now();

        let withdrawn_today = self.check_limits(&wallet, &pricing, now)?;

        Ok(WithdrawalQuote {
            pricing,
            available_balance: wallet.available_balance(),
            daily_limit_remaining: (wallet.daily_withdrawal_limit - withdrawn_today).max(Decimal::ZERO),
        })
    }

    pub async fn submit(
        &self,
        user_id: Uuid,
        request: SubmitWithdrawal
    ) -> Result<withdrawal_request::Model> {
        Metadata::ensure_client_supplied(request.metadata.as_ref())?;

        // Committed on its own so failed attempts count even when we bail out
        self.security.verify_pin(user_id, &request.pin).await?;

        let (account, bank) = BankAccountService::get_owned_active(
            &self.db,
            user_id,
            request.bank_account_id
        ).await?;

        let pricing = self.price(&request.currency_code, request.amount_local).await?;

        let created = retry_on_conflict("submit_withdrawal", || {
            self.submit_once(user_id, &request, &account, &bank, &pricing)
        }).await?;

        info!(
            user_id = %user_id,
            withdrawal_id = %created.id,
            reference = %created.reference,
            amount_token = %created.amount_token,
            amount_local = %created.amount_local,
            currency = %created.currency_code,
            "Withdrawal submitted"
        );

        Ok(created)
    }

    async fn submit_once(
        &self,
        user_id: Uuid,
        request: &SubmitWithdrawal,
        account: &bank_account::Model,
        bank: &bank::Model,
        pricing: &Pricing
    ) -> Result<withdrawal_request::Model> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let wallet = WalletRepository::lock_by_user(&txn, user_id).await?;
        Self::ensure_withdrawable(&wallet, now)?;
        let withdrawn_today = self.check_limits(&wallet, pricing, now)?;
        let window_elapsed = wallet.daily_window_elapsed(now, self.policy.daily_reset_window);

        let request_id = Uuid::new_v4();
        let draft = EntryDraft::debit(EntryType::Withdrawal, pricing.net_amount_token)
            .with_fee(pricing.fee_token)
            .with_status(EntryStatus::Pending)
            .with_currency(CurrencyContext {
                currency_code: pricing.currency_code.clone(),
                exchange_rate: pricing.exchange_rate,
                original_amount: pricing.amount_local,
            })
            .with_reference(ReferenceType::WithdrawalRequest, request_id)
            .with_description(
                format!(
                    "Withdrawal of {} {} to {} ****{}",
                    pricing.amount_local,
                    pricing.currency_code,
                    bank.name,
                    account.account_number_last4
                )
            );
        let (entry, wallet) = self.ledger.record(&txn, wallet.id, draft).await?;

        let mut counters = wallet_account::ActiveModel {
            daily_withdrawn_amount: Set(withdrawn_today + pricing.amount_token),
            withdrawal_count: Set(wallet.withdrawal_count + 1),
            ..Default::default()
        };
        if window_elapsed {
            counters.last_withdrawal_reset = Set(Some(now));
        }
        WalletRepository::save_versioned(&txn, &wallet, counters).await?;

        let created = withdrawal_request::ActiveModel {
            id: Set(request_id),
            reference: Set(Self::generate_reference(now)),
            wallet_id: Set(wallet.id),
            user_id: Set(user_id),
            bank_account_id: Set(account.id),
            currency_code: Set(pricing.currency_code.clone()),
            amount_token: Set(pricing.amount_token),
            amount_local: Set(pricing.amount_local),
            exchange_rate: Set(pricing.exchange_rate),
            fee_token: Set(pricing.fee_token),
            net_amount_token: Set(pricing.net_amount_token),
            status: Set(WithdrawalStatus::Pending),
            priority: Set(self.priority_for(pricing.amount_token)),
            debit_entry_id: Set(entry.id),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            review_notes: Set(None),
            processed_by: Set(None),
            processed_at: Set(None),
            processing_notes: Set(None),
            completed_at: Set(None),
            transaction_reference: Set(None),
            failure_reason: Set(None),
            bank_name: Set(bank.name.clone()),
            bank_code: Set(bank.code.clone()),
            account_holder_name: Set(account.account_holder_name.clone()),
            account_number_last4: Set(account.account_number_last4.clone()),
            expires_at: Set(now + self.policy.ttl),
            metadata: Set(Metadata::encode_opt(request.metadata.as_ref())?),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = created.insert(&txn).await?;

        txn.commit().await?;
        Ok(created)
    }

    pub async fn cancel(&self, user_id: Uuid, request_id: Uuid) -> Result<withdrawal_request::Model> {
        let cancelled = retry_on_conflict("cancel_withdrawal", || async move {
            let txn = self.db.begin().await?;
            let request = Self::find_owned(&txn, user_id, request_id).await?;
            Self::ensure_not_expired(&request)?;

            let audit = TransitionAudit::by(user_id).with_reason("Cancelled by user");
            let request = self.transition(&txn, request, WithdrawalStatus::Cancelled, &audit).await?;

            txn.commit().await?;
            Ok(request)
        }).await?;

        info!(user_id = %user_id, withdrawal_id = %request_id, "Withdrawal cancelled");
        Ok(cancelled)
    }

    pub async fn get(&self, user_id: Uuid, request_id: Uuid) -> Result<withdrawal_request::Model> {
        Self::find_owned(&self.db, user_id, request_id).await
    }

    /// The user's requests, newest first.
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: &WithdrawalFilter
    ) -> Result<Vec<withdrawal_request::Model>> {
        let mut query = WithdrawalRequest::find().filter(
            withdrawal_request::Column::UserId.eq(user_id)
        );

        if let Some(status) = filter.status {
            query = query.filter(withdrawal_request::Column::Status.eq(status));
        }
        if let Some(code) = &filter.currency_code {
            query = query.filter(withdrawal_request::Column::CurrencyCode.eq(code.trim().to_uppercase()));
        }
        if let Some(from) = filter.from {
            query = query.filter(withdrawal_request::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(withdrawal_request::Column::CreatedAt.lt(to));
        }

        let requests = query
            .order_by_desc(withdrawal_request::Column::CreatedAt)
            .limit(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE))
            .offset(filter.offset.unwrap_or(0))
            .all(&self.db).await?;

        Ok(requests)
    }

    // ─── Review and processing ──────────────────────────────────────

    pub async fn find(&self, request_id: Uuid) -> Result<withdrawal_request::Model> {
        WithdrawalRequest::find_by_id(request_id)
            .one(&self.db).await?
            .ok_or(AppError::WithdrawalNotFound)
    }

    /// Pending requests, highest priority first, then oldest first.
    pub async fn list_pending(&self, limit: u64) -> Result<Vec<withdrawal_request::Model>> {
        let requests = WithdrawalRequest::find()
            .filter(withdrawal_request::Column::Status.eq(WithdrawalStatus::Pending))
            .order_by_desc(withdrawal_request::Column::Priority)
            .order_by_asc(withdrawal_request::Column::CreatedAt)
            .limit(limit.clamp(1, MAX_PAGE_SIZE))
            .all(&self.db).await?;

        Ok(requests)
    }

    pub async fn approve(
        &self,
        request_id: Uuid,
        admin_id: Uuid,
        notes: Option<String>
    ) -> Result<withdrawal_request::Model> {
        let audit = TransitionAudit::by(admin_id).with_notes(notes);
        self.advance(request_id, WithdrawalStatus::Approved, audit).await
    }

    pub async fn reject(
        &self,
        request_id: Uuid,
        admin_id: Uuid,
        reason: String,
        notes: Option<String>
    ) -> Result<withdrawal_request::Model> {
        let audit = TransitionAudit::by(admin_id).with_notes(notes).with_reason(reason);
        self.advance(request_id, WithdrawalStatus::Rejected, audit).await
    }

    pub async fn begin_processing(
        &self,
        request_id: Uuid,
        admin_id: Uuid,
        notes: Option<String>
    ) -> Result<withdrawal_request::Model> {
        let audit = TransitionAudit::by(admin_id).with_notes(notes);
        self.advance(request_id, WithdrawalStatus::Processing, audit).await
    }

    pub async fn complete(
        &self,
        request_id: Uuid,
        admin_id: Uuid,
        transaction_reference: String,
        notes: Option<String>
    ) -> Result<withdrawal_request::Model> {
        let mut audit = TransitionAudit::by(admin_id).with_notes(notes);
        audit.transaction_reference = Some(transaction_reference);
        self.advance(request_id, WithdrawalStatus::Completed, audit).await
    }

    pub async fn fail(
        &self,
        request_id: Uuid,
        admin_id: Uuid,
        reason: String
    ) -> Result<withdrawal_request::Model> {
        let audit = TransitionAudit::by(admin_id).with_reason(reason);
        self.advance(request_id, WithdrawalStatus::Failed, audit).await
    }

    /// Expires every overdue non-terminal request, one transaction each.
    /// Returns how many this run expired.
    pub async fn expire_overdue(&self) -> Result<usize> {
        let now = Utc::now();
        let overdue = WithdrawalRequest::find()
            .filter(
                withdrawal_request::Column::Status.is_in(WithdrawalStatus::non_terminal().iter().copied())
            )
            .filter(withdrawal_request::Column::ExpiresAt.lte(now))
            .order_by_asc(withdrawal_request::Column::ExpiresAt)
            .all(&self.db).await?;

        let mut expired = 0;
        for request in overdue {
            match retry_on_conflict("expire_withdrawal", || self.expire_one(request.id, now)).await {
                Ok(true) => {
                    expired += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(withdrawal_id = %request.id, error = %e, "Failed to expire withdrawal");
                }
            }
        }

        Ok(expired)
    }

    async fn expire_one(&self, request_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let txn = self.db.begin().await?;
        let request = WithdrawalRequest::find_by_id(request_id)
            .one(&txn).await?
            .ok_or(AppError::WithdrawalNotFound)?;

        // Settled since the sweep listed it
        if !request.is_expired_at(now) {
            return Ok(false);
        }

        let audit = TransitionAudit::default().with_reason("Expired before completion");
        let request = self.transition(&txn, request, WithdrawalStatus::Expired, &audit).await?;
        txn.commit().await?;

        warn!(withdrawal_id = %request.id, reference = %request.reference, "Withdrawal expired and refunded");
        Ok(true)
    }

    async fn advance(
        &self,
        request_id: Uuid,
        to: WithdrawalStatus,
        audit: TransitionAudit
    ) -> Result<withdrawal_request::Model> {
        let audit = &audit;
        let updated = retry_on_conflict("advance_withdrawal", || async move {
            let txn = self.db.begin().await?;
            let request = WithdrawalRequest::find_by_id(request_id)
                .one(&txn).await?
                .ok_or(AppError::WithdrawalNotFound)?;

            if matches!(to, WithdrawalStatus::Approved | WithdrawalStatus::Rejected | WithdrawalStatus::Processing) {
                Self::ensure_not_expired(&request)?;
            }

            let request = self.transition(&txn, request, to, audit).await?;
            txn.commit().await?;
            Ok(request)
        }).await?;

        info!(
            withdrawal_id = %updated.id,
            reference = %updated.reference,
            actor = ?audit.actor,
            to = to.as_str(),
            "Withdrawal status changed"
        );

        Ok(updated)
    }

    fn ensure_not_expired(request: &withdrawal_request::Model) -> Result<()> {
        if request.is_expired_at(Utc::now()) {
            return Err(AppError::WithdrawalExpired { expires_at: request.expires_at });
        }
        Ok(())
    }

    /// The only place a request changes status. Applies the ledger side of
    /// the transition in the same transaction.
    async fn transition(
        &self,
        txn: &DatabaseTransaction,
        request: withdrawal_request::Model,
        to: WithdrawalStatus,
        audit: &TransitionAudit
    ) -> Result<withdrawal_request::Model> {
        let from = request.status;
        if !from.can_transition_to(to) {
            return Err(AppError::InvalidTransition { from, to });
        }

        let now = Utc::now();
        let mut changes = withdrawal_request::ActiveModel {
            status: Set(to),
            updated_at: Set(now),
            ..Default::default()
        };
        audit.apply(to, &mut changes, now);

        let result = WithdrawalRequest::update_many()
            .set(changes)
            .filter(withdrawal_request::Column::Id.eq(request.id))
            .filter(withdrawal_request::Column::Status.eq(from))
            .exec(txn).await?;

        if result.rows_affected == 0 {
            return Err(AppError::ConcurrentModification(format!("withdrawal request {}", request.id)));
        }

        match to {
            WithdrawalStatus::Processing => {
                self.ledger.mark_processing(txn, request.debit_entry_id).await?;
            }
            WithdrawalStatus::Completed => {
                self.ledger.finalize(txn, request.debit_entry_id).await?;

                let wallet = WalletRepository::lock_by_id(txn, request.wallet_id).await?;
                let changes = wallet_account::ActiveModel {
                    total_withdrawn: Set(wallet.total_withdrawn + request.amount_token),
                    ..Default::default()
                };
                WalletRepository::save_versioned(txn, &wallet, changes).await?;

                self.bank_accounts.record_usage(txn, request.bank_account_id).await?;
            }
            status if status.refunds_debit() => {
                let reversal = Reversal {
                    outcome: status.entry_status(),
                    reason: audit.reason
                        .clone()
                        .unwrap_or_else(|| format!("Withdrawal {}", status.as_str())),
                };
                self.ledger.reverse(txn, request.debit_entry_id, reversal).await?;
            }
            _ => {}
        }

        WithdrawalRequest::find_by_id(request.id)
            .one(txn).await?
            .ok_or(AppError::WithdrawalNotFound)
    }

    async fn find_owned<C>(db: &C, user_id: Uuid, request_id: Uuid) -> Result<withdrawal_request::Model>
        where C: sea_orm::ConnectionTrait
    {
        WithdrawalRequest::find_by_id(request_id)
            .filter(withdrawal_request::Column::UserId.eq(user_id))
            .one(db).await?
            .ok_or(AppError::WithdrawalNotFound)
    }
}
