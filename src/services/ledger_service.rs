use chrono::{ DateTime, Utc };
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait,
    DatabaseConnection,
    DatabaseTransaction,
    DbErr,
    EntityTrait,
    PaginatorTrait,
    QueryFilter,
    QueryOrder,
    QuerySelect,
    SqlErr,
};
use serde::Deserialize;
use tracing::{ debug, error, info };
use uuid::Uuid;

use crate::db::{ ledger_entry, LedgerEntry, WalletRepository, wallet_account };
use crate::enums::{ EntryDirection, EntryStatus, EntryType, ReferenceType };
use crate::error::{ AppError, Result };
use crate::metadata::Metadata;

/// Local-currency context carried by entries that relate to a payout.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyContext {
    pub currency_code: String,
    pub exchange_rate: Decimal,
    pub original_amount: Decimal,
}

/// A balance change the ledger has not yet applied.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub entry_type: EntryType,
    pub direction: EntryDirection,
    pub amount: Decimal,
    pub fee: Decimal,
    pub status: EntryStatus,
    pub currency: Option<CurrencyContext>,
    pub reference: Option<(ReferenceType, Uuid)>,
    pub description: Option<String>,
    pub metadata: Option<Metadata>,
    reverses: Option<Uuid>,
}

impl EntryDraft {
    fn new(entry_type: EntryType, direction: EntryDirection, amount: Decimal) -> Self {
        Self {
            entry_type,
            direction,
            amount,
            fee: Decimal::ZERO,
            status: EntryStatus::Completed,
            currency: None,
            reference: None,
            description: None,
            metadata: None,
            reverses: None,
        }
    }

    pub fn credit(entry_type: EntryType, amount: Decimal) -> Self {
        Self::new(entry_type, EntryDirection::Credit, amount)
    }

    pub fn debit(entry_type: EntryType, amount: Decimal) -> Self {
        Self::new(entry_type, EntryDirection::Debit, amount)
    }

    pub fn hold(amount: Decimal) -> Self {
        Self::new(EntryType::Freeze, EntryDirection::Hold, amount)
    }

    pub fn release(amount: Decimal) -> Self {
        Self::new(EntryType::Unfreeze, EntryDirection::Release, amount)
    }

    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_currency(mut self, currency: CurrencyContext) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn with_reference(mut self, reference_type: ReferenceType, reference_id: Uuid) -> Self {
        self.reference = Some((reference_type, reference_id));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("Entry amount must be positive".into()));
        }
        if self.fee < Decimal::ZERO || self.fee > self.amount {
            return Err(AppError::InvalidInput("Entry fee must be between 0 and the amount".into()));
        }
        if !self.entry_type.permits(self.direction) {
            return Err(
                AppError::InvalidInput(
                    format!(
                        "Entry type {} cannot be a {}",
                        self.entry_type.as_str(),
                        self.direction.as_str()
                    )
                )
            );
        }
        if let Some(description) = &self.description {
            if description.chars().count() > 255 {
                return Err(AppError::InvalidInput("Description exceeds 255 characters".into()));
            }
        }
        Ok(())
    }
}

/// How a reversal settles the entry it compensates.
#[derive(Debug, Clone)]
pub struct Reversal {
    pub outcome: EntryStatus,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub entry_type: Option<EntryType>,
    pub status: Option<EntryStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 200;

/// Append-only record of every balance change.
///
/// Every mutating method takes the caller's transaction and never commits,
/// so the caller decides what else lands atomically with the entry.
#[derive(Clone)]
pub struct LedgerService {
    db: DatabaseConnection,
}

impl LedgerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Applies `draft` to the wallet and appends the matching entry.
    pub async fn record(
        &self,
        txn: &DatabaseTransaction,
        wallet_id: Uuid,
        draft: EntryDraft
    ) -> Result<(ledger_entry::Model, wallet_account::Model)> {
        draft.validate()?;

        let wallet = WalletRepository::lock_by_id(txn, wallet_id).await?;
        let available = wallet.available_balance();
        let net_amount = draft.amount - draft.fee;

        let (balance_after, frozen_after) = match draft.direction {
            EntryDirection::Credit => (wallet.balance + net_amount, wallet.frozen_balance),
            EntryDirection::Debit => {
                if available < draft.amount {
                    return Err(AppError::InsufficientBalance {
                        available,
                        required: draft.amount,
                    });
                }
                (wallet.balance - draft.amount, wallet.frozen_balance)
            }
            EntryDirection::Hold => {
                if available < draft.amount {
                    return Err(AppError::InsufficientBalance {
                        available,
                        required: draft.amount,
                    });
                }
                (wallet.balance, wallet.frozen_balance + draft.amount)
            }
            EntryDirection::Release => {
                if wallet.frozen_balance < draft.amount {
                    return Err(
                        AppError::InvalidInput(
                            format!(
                                "Cannot release {} with only {} frozen",
                                draft.amount,
                                wallet.frozen_balance
                            )
                        )
                    );
                }
                (wallet.balance, wallet.frozen_balance - draft.amount)
            }
        };

        let mut changes = wallet_account::ActiveModel {
            balance: Set(balance_after),
            frozen_balance: Set(frozen_after),
            ..Default::default()
        };
        if draft.entry_type == EntryType::Deposit {
            changes.total_deposited = Set(wallet.total_deposited + net_amount);
        }
        let updated_wallet = WalletRepository::save_versioned(txn, &wallet, changes).await?;

        let now = Utc::now();
        let (currency_code, exchange_rate, original_amount) = match draft.currency {
            Some(ctx) => (Some(ctx.currency_code), Some(ctx.exchange_rate), Some(ctx.original_amount)),
            None => (None, None, None),
        };
        let (reference_type, reference_id) = match draft.reference {
            Some((kind, id)) => (Some(kind), Some(id)),
            None => (None, None),
        };

        let entry = ledger_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            wallet_id: Set(wallet.id),
            entry_type: Set(draft.entry_type),
            direction: Set(draft.direction),
            status: Set(draft.status),
            amount: Set(draft.amount),
            fee: Set(draft.fee),
            net_amount: Set(net_amount),
            balance_before: Set(wallet.balance),
            balance_after: Set(balance_after),
            currency_code: Set(currency_code),
            exchange_rate: Set(exchange_rate),
            original_amount: Set(original_amount),
            reference_type: Set(reference_type),
            reference_id: Set(reference_id),
            reverses_entry_id: Set(draft.reverses),
            description: Set(draft.description),
            metadata: Set(Metadata::encode_opt(draft.metadata.as_ref())?),
            created_at: Set(now),
            processed_at: Set(draft.status.is_terminal().then_some(now)),
        };
        let entry = entry.insert(txn).await?;

        debug!(
            entry_id = %entry.id,
            wallet_id = %wallet.id,
            entry_type = entry.entry_type.as_str(),
            direction = entry.direction.as_str(),
            amount = %entry.amount,
            balance_after = %entry.balance_after,
            "Ledger entry recorded"
        );

        Ok((entry, updated_wallet))
    }

    /// Appends the compensating entry for `entry_id` and settles the original.
    pub async fn reverse(
        &self,
        txn: &DatabaseTransaction,
        entry_id: Uuid,
        reversal: Reversal
    ) -> Result<ledger_entry::Model> {
        let original = LedgerEntry::find_by_id(entry_id).one(txn).await?.ok_or(AppError::EntryNotFound)?;

        // Serializes concurrent reversals of entries on the same wallet
        WalletRepository::lock_by_id(txn, original.wallet_id).await?;

        let existing = LedgerEntry::find()
            .filter(ledger_entry::Column::ReversesEntryId.eq(entry_id))
            .one(txn).await?;
        if let Some(existing) = existing {
            error!(
                entry_id = %entry_id,
                reversal_id = %existing.id,
                "Attempted to reverse an already reversed ledger entry"
            );
            return Err(AppError::AlreadyReversed(entry_id));
        }

        let mut draft = match original.direction {
            EntryDirection::Debit => EntryDraft::credit(EntryType::Refund, original.amount),
            EntryDirection::Credit => EntryDraft::debit(EntryType::Adjustment, original.net_amount),
            EntryDirection::Hold | EntryDirection::Release => {
                return Err(
                    AppError::InvalidInput("Hold and release entries cannot be reversed".into())
                );
            }
        };
        draft.reverses = Some(original.id);
        draft.description = Some(format!("Reversal: {}", reversal.reason).chars().take(255).collect());
        draft.metadata = Some(Metadata::Reversal {
            original_entry_id: original.id,
            reason: reversal.reason.clone(),
        });
        if let (Some(kind), Some(id)) = (original.reference_type, original.reference_id) {
            draft.reference = Some((kind, id));
        }
        if let (Some(code), Some(rate), Some(amount)) = (
            original.currency_code.clone(),
            original.exchange_rate,
            original.original_amount,
        ) {
            draft.currency = Some(CurrencyContext {
                currency_code: code,
                exchange_rate: rate,
                original_amount: amount,
            });
        }

        let (compensating, _) = self
            .record(txn, original.wallet_id, draft).await
            .map_err(|e| Self::map_duplicate_reversal(e, entry_id))?;

        if !original.status.is_terminal() {
            self.settle(txn, &original, reversal.outcome).await?;
        }

        info!(
            entry_id = %entry_id,
            reversal_id = %compensating.id,
            outcome = reversal.outcome.as_str(),
            "Ledger entry reversed"
        );

        Ok(compensating)
    }

    /// Marks a pending or processing entry completed.
    pub async fn finalize(&self, txn: &DatabaseTransaction, entry_id: Uuid) -> Result<ledger_entry::Model> {
        self.advance(txn, entry_id, EntryStatus::Completed).await
    }

    pub async fn mark_processing(
        &self,
        txn: &DatabaseTransaction,
        entry_id: Uuid
    ) -> Result<ledger_entry::Model> {
        self.advance(txn, entry_id, EntryStatus::Processing).await
    }

    pub async fn hold(
        &self,
        txn: &DatabaseTransaction,
        wallet_id: Uuid,
        amount: Decimal,
        reason: &str
    ) -> Result<(ledger_entry::Model, wallet_account::Model)> {
        self.record(txn, wallet_id, EntryDraft::hold(amount).with_description(reason)).await
    }

    pub async fn release(
        &self,
        txn: &DatabaseTransaction,
        wallet_id: Uuid,
        amount: Decimal,
        reason: &str
    ) -> Result<(ledger_entry::Model, wallet_account::Model)> {
        self.record(txn, wallet_id, EntryDraft::release(amount).with_description(reason)).await
    }

    pub async fn get_entry(&self, entry_id: Uuid) -> Result<ledger_entry::Model> {
        LedgerEntry::find_by_id(entry_id).one(&self.db).await?.ok_or(AppError::EntryNotFound)
    }

    /// Entries for a wallet, newest first.
    pub async fn list_entries(
        &self,
        wallet_id: Uuid,
        filter: &TransactionFilter
    ) -> Result<Vec<ledger_entry::Model>> {
        let mut query = LedgerEntry::find().filter(ledger_entry::Column::WalletId.eq(wallet_id));

        if let Some(entry_type) = filter.entry_type {
            query = query.filter(ledger_entry::Column::EntryType.eq(entry_type));
        }
        if let Some(status) = filter.status {
            query = query.filter(ledger_entry::Column::Status.eq(status));
        }
        if let Some(from) = filter.from {
            query = query.filter(ledger_entry::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(ledger_entry::Column::CreatedAt.lt(to));
        }

        let entries = query
            .order_by_desc(ledger_entry::Column::CreatedAt)
            .order_by_desc(ledger_entry::Column::Id)
            .limit(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE))
            .offset(filter.offset.unwrap_or(0))
            .all(&self.db).await?;

        Ok(entries)
    }

    pub async fn count_entries(&self, wallet_id: Uuid) -> Result<u64> {
        let count = LedgerEntry::find()
            .filter(ledger_entry::Column::WalletId.eq(wallet_id))
            .count(&self.db).await?;

        Ok(count)
    }

    async fn advance(
        &self,
        txn: &DatabaseTransaction,
        entry_id: Uuid,
        to: EntryStatus
    ) -> Result<ledger_entry::Model> {
        let entry = LedgerEntry::find_by_id(entry_id).one(txn).await?.ok_or(AppError::EntryNotFound)?;

        if entry.status.is_terminal() || entry.status == to {
            return Err(
                AppError::InvalidInput(
                    format!("Ledger entry {} is already {}", entry.id, entry.status.as_str())
                )
            );
        }

        self.settle(txn, &entry, to).await
    }

    /// Status compare-and-swap on a non-terminal entry.
    async fn settle(
        &self,
        txn: &DatabaseTransaction,
        entry: &ledger_entry::Model,
        to: EntryStatus
    ) -> Result<ledger_entry::Model> {
        let changes = ledger_entry::ActiveModel {
            status: Set(to),
            processed_at: Set(to.is_terminal().then(Utc::now)),
            ..Default::default()
        };

        let result = LedgerEntry::update_many()
            .set(changes)
            .filter(ledger_entry::Column::Id.eq(entry.id))
            .filter(ledger_entry::Column::Status.eq(entry.status))
            .exec(txn).await?;

        if result.rows_affected == 0 {
            return Err(AppError::ConcurrentModification(format!("ledger entry {}", entry.id)));
        }

        LedgerEntry::find_by_id(entry.id).one(txn).await?.ok_or(AppError::EntryNotFound)
    }

    fn map_duplicate_reversal(err: AppError, entry_id: Uuid) -> AppError {
        match err {
            AppError::Database(db_err) if Self::is_unique_violation(&db_err) => {
                error!(entry_id = %entry_id, "Duplicate reversal rejected by unique index");
                AppError::AlreadyReversed(entry_id)
            }
            other => other,
        }
    }

    fn is_unique_violation(err: &DbErr) -> bool {
        matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    }
}
