use std::sync::Arc;

use chrono::{ DateTime, Utc };
use sea_orm::{
    sea_query::Expr,
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait,
    ConnectionTrait,
    DatabaseConnection,
    DatabaseTransaction,
    EntityTrait,
    PaginatorTrait,
    QueryFilter,
    QueryOrder,
    TransactionTrait,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::crypto::{ fingerprint, Encryptor };
use crate::db::{ bank, bank_account, Bank, BankAccount, Currency };
use crate::enums::{ BankAccountStatus, BankAccountType, Lifecycle };
use crate::error::{ AppError, Result };

#[derive(Debug, Clone)]
pub struct NewBank {
    pub name: String,
    pub code: String,
    pub country: String,
    pub currency_code: String,
    pub routing_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBankAccount {
    pub bank_id: Uuid,
    pub account_number: String,
    pub account_holder_name: String,
    pub account_type: BankAccountType,
    pub make_default: bool,
}

/// Fields a user may change on a saved account. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct BankAccountUpdate {
    pub account_holder_name: Option<String>,
    pub account_type: Option<BankAccountType>,
    pub is_default: Option<bool>,
}

/// Saved account as returned to its owner; the number is masked.
#[derive(Debug, Clone, Serialize)]
pub struct BankAccountView {
    pub id: Uuid,
    pub bank_id: Uuid,
    pub bank_name: String,
    pub bank_code: String,
    pub currency_code: String,
    pub account_number_masked: String,
    pub account_holder_name: String,
    pub account_type: BankAccountType,
    pub status: BankAccountStatus,
    pub is_default: bool,
    pub is_verified: bool,
    pub usage_count: i32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BankAccountView {
    fn new(account: bank_account::Model, bank: &bank::Model) -> Self {
        Self {
            id: account.id,
            bank_id: account.bank_id,
            bank_name: bank.name.clone(),
            bank_code: bank.code.clone(),
            currency_code: bank.currency_code.clone(),
            account_number_masked: format!("******{}", account.account_number_last4),
            account_holder_name: account.account_holder_name,
            account_type: account.account_type,
            status: account.status,
            is_default: account.is_default,
            is_verified: account.is_verified,
            usage_count: account.usage_count,
            last_used_at: account.last_used_at,
            created_at: account.created_at,
        }
    }
}

fn validate_account_number(number: &str) -> Result<()> {
    if !(6..=20).contains(&number.len()) || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidInput("Account number must be 6 to 20 digits".into()));
    }
    Ok(())
}

fn validate_holder_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 150 {
        return Err(AppError::InvalidInput("Account holder name must be 1 to 150 characters".into()));
    }
    Ok(name.to_string())
}

/// Banks and the accounts users withdraw to.
#[derive(Clone)]
pub struct BankAccountService {
    db: DatabaseConnection,
    encryptor: Arc<Encryptor>,
}

impl BankAccountService {
    pub fn new(db: DatabaseConnection, encryptor: Arc<Encryptor>) -> Self {
        Self { db, encryptor }
    }

    // ─── Banks ──────────────────────────────────────────────────────

    pub async fn list_banks(&self, country: Option<&str>) -> Result<Vec<bank::Model>> {
        let mut query = Bank::find().filter(bank::Column::Lifecycle.eq(Lifecycle::Active));
        if let Some(country) = country {
            query = query.filter(bank::Column::Country.eq(country.trim().to_uppercase()));
        }

        let banks = query.order_by_asc(bank::Column::Name).all(&self.db).await?;
        Ok(banks)
    }

    pub async fn get_bank(&self, bank_id: Uuid) -> Result<bank::Model> {
        Bank::find_by_id(bank_id)
            .filter(bank::Column::Lifecycle.eq(Lifecycle::Active))
            .one(&self.db).await?
            .ok_or(AppError::BankNotFound)
    }

    pub async fn add_bank(&self, new: NewBank) -> Result<bank::Model> {
        let name = new.name.trim().to_string();
        let code = new.code.trim().to_uppercase();
        let country = new.country.trim().to_uppercase();
        let currency_code = new.currency_code.trim().to_uppercase();

        if name.is_empty() || code.is_empty() {
            return Err(AppError::InvalidInput("Bank name and code are required".into()));
        }
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::InvalidInput("Country must be a two-letter code".into()));
        }

        Currency::find_by_id(currency_code.clone())
            .filter(crate::db::currency::Column::Lifecycle.eq(Lifecycle::Active))
            .one(&self.db).await?
            .ok_or_else(|| AppError::CurrencyNotFound(currency_code.clone()))?;

        let duplicate = Bank::find()
            .filter(bank::Column::Country.eq(country.as_str()))
            .filter(bank::Column::Code.eq(code.as_str()))
            .count(&self.db).await?;
        if duplicate > 0 {
            return Err(AppError::InvalidInput(format!("Bank {} already exists in {}", code, country)));
        }

        let bank = bank::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            code: Set(code),
            country: Set(country),
            currency_code: Set(currency_code),
            routing_code: Set(new.routing_code.map(|r| r.trim().to_string()).filter(|r| !r.is_empty())),
            lifecycle: Set(Lifecycle::Active),
            created_at: Set(Utc::now()),
        };

        let bank = bank.insert(&self.db).await?;
        info!(bank_id = %bank.id, code = %bank.code, country = %bank.country, "Bank added");
        Ok(bank)
    }

    // ─── Accounts ───────────────────────────────────────────────────

    pub async fn add_account(&self, user_id: Uuid, new: NewBankAccount) -> Result<BankAccountView> {
        let number = new.account_number.trim().to_string();
        validate_account_number(&number)?;
        let holder_name = validate_holder_name(&new.account_holder_name)?;

        let bank = self.get_bank(new.bank_id).await?;
        let account_fingerprint = fingerprint(&[&bank.id.to_string(), &number]);
        let encrypted = self.encryptor.seal(&number)?;

        let txn = self.db.begin().await?;

        let duplicate = BankAccount::find()
            .filter(bank_account::Column::UserId.eq(user_id))
            .filter(bank_account::Column::AccountFingerprint.eq(account_fingerprint.as_str()))
            .filter(bank_account::Column::Lifecycle.eq(Lifecycle::Active))
            .count(&txn).await?;
        if duplicate > 0 {
            return Err(AppError::InvalidInput("This bank account has already been added".into()));
        }

        let existing = Self::active_accounts_query(user_id).count(&txn).await?;
        let is_default = existing == 0 || new.make_default;
        if is_default {
            Self::clear_default(&txn, user_id, None).await?;
        }

        let now = Utc::now();
        let last4 = number[number.len() - 4..].to_string();
        let account = bank_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            bank_id: Set(bank.id),
            account_number_encrypted: Set(encrypted),
            account_number_last4: Set(last4),
            account_fingerprint: Set(account_fingerprint),
            account_holder_name: Set(holder_name),
            account_type: Set(new.account_type),
            status: Set(BankAccountStatus::Active),
            is_default: Set(is_default),
            is_verified: Set(false),
            usage_count: Set(0),
            last_used_at: Set(None),
            lifecycle: Set(Lifecycle::Active),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let account = account.insert(&txn).await?;

        txn.commit().await?;

        info!(user_id = %user_id, bank_account_id = %account.id, is_default, "Bank account added");
        Ok(BankAccountView::new(account, &bank))
    }

    pub async fn update_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        update: BankAccountUpdate
    ) -> Result<BankAccountView> {
        let txn = self.db.begin().await?;
        let account = Self::find_owned(&txn, user_id, account_id).await?;

        let mut changes = bank_account::ActiveModel {
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        if let Some(name) = &update.account_holder_name {
            changes.account_holder_name = Set(validate_holder_name(name)?);
        }
        if let Some(account_type) = update.account_type {
            changes.account_type = Set(account_type);
        }
        match update.is_default {
            Some(true) if !account.is_default => {
                Self::clear_default(&txn, user_id, Some(account.id)).await?;
                changes.is_default = Set(true);
            }
            Some(false) if account.is_default => {
                return Err(
                    AppError::InvalidInput(
                        "Make another account the default instead of unsetting this one".into()
                    )
                );
            }
            _ => {}
        }

        BankAccount::update_many()
            .set(changes)
            .filter(bank_account::Column::Id.eq(account.id))
            .exec(&txn).await?;

        let account = BankAccount::find_by_id(account.id)
            .one(&txn).await?
            .ok_or(AppError::BankAccountNotFound)?;
        let bank = Bank::find_by_id(account.bank_id).one(&txn).await?.ok_or(AppError::BankNotFound)?;

        txn.commit().await?;
        Ok(BankAccountView::new(account, &bank))
    }

    /// Archives an account. The default can only go when it is the last one.
    pub async fn delete_account(&self, user_id: Uuid, account_id: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;
        let account = Self::find_owned(&txn, user_id, account_id).await?;

        if account.is_default {
            let others = Self::active_accounts_query(user_id)
                .filter(bank_account::Column::Id.ne(account.id))
                .count(&txn).await?;
            if others > 0 {
                return Err(AppError::CannotDeleteDefault);
            }
        }

        let changes = bank_account::ActiveModel {
            lifecycle: Set(Lifecycle::Archived),
            status: Set(BankAccountStatus::Inactive),
            is_default: Set(false),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        BankAccount::update_many()
            .set(changes)
            .filter(bank_account::Column::Id.eq(account.id))
            .exec(&txn).await?;

        txn.commit().await?;

        info!(user_id = %user_id, bank_account_id = %account_id, "Bank account archived");
        Ok(())
    }

    /// Non-archived accounts, default first.
    pub async fn list_accounts(&self, user_id: Uuid) -> Result<Vec<BankAccountView>> {
        let rows = Self::active_accounts_query(user_id)
            .find_also_related(Bank)
            .order_by_desc(bank_account::Column::IsDefault)
            .order_by_asc(bank_account::Column::CreatedAt)
            .all(&self.db).await?;

        rows.into_iter()
            .map(|(account, bank)| {
                let bank = bank.ok_or(AppError::BankNotFound)?;
                Ok(BankAccountView::new(account, &bank))
            })
            .collect()
    }

    /// The user's usable account and its bank, for withdrawals.
    pub async fn get_owned_active<C>(
        db: &C,
        user_id: Uuid,
        account_id: Uuid
    ) -> Result<(bank_account::Model, bank::Model)>
        where C: ConnectionTrait
    {
        let account = BankAccount::find_by_id(account_id)
            .one(db).await?
            .filter(|a| a.user_id == user_id && a.is_usable())
            .ok_or(AppError::BankAccountNotOwned)?;

        let bank = Bank::find_by_id(account.bank_id)
            .one(db).await?
            .filter(|b| b.lifecycle == Lifecycle::Active)
            .ok_or(AppError::BankAccountNotOwned)?;

        Ok((account, bank))
    }

    pub async fn verify_account(&self, account_id: Uuid) -> Result<bank_account::Model> {
        let account = BankAccount::find_by_id(account_id)
            .filter(bank_account::Column::Lifecycle.eq(Lifecycle::Active))
            .one(&self.db).await?
            .ok_or(AppError::BankAccountNotFound)?;

        let mut active: bank_account::ActiveModel = account.into();
        active.is_verified = Set(true);
        active.updated_at = Set(Utc::now());
        let account = active.update(&self.db).await?;

        info!(bank_account_id = %account.id, "Bank account verified");
        Ok(account)
    }

    /// Counts a completed payout against the account. Archived accounts are
    /// still counted; a missing row is ignored.
    pub async fn record_usage(&self, txn: &DatabaseTransaction, account_id: Uuid) -> Result<()> {
        BankAccount::update_many()
            .col_expr(
                bank_account::Column::UsageCount,
                Expr::col(bank_account::Column::UsageCount).add(1)
            )
            .col_expr(bank_account::Column::LastUsedAt, Expr::value(Utc::now()))
            .filter(bank_account::Column::Id.eq(account_id))
            .exec(txn).await?;

        Ok(())
    }

    /// Full account number for the payout operator.
    pub async fn reveal_account_number(&self, account_id: Uuid) -> Result<String> {
        let account = BankAccount::find_by_id(account_id)
            .one(&self.db).await?
            .ok_or(AppError::BankAccountNotFound)?;

        Ok(self.encryptor.open(&account.account_number_encrypted)?)
    }

    async fn find_owned<C>(db: &C, user_id: Uuid, account_id: Uuid) -> Result<bank_account::Model>
        where C: ConnectionTrait
    {
        let account = BankAccount::find_by_id(account_id)
            .filter(bank_account::Column::Lifecycle.eq(Lifecycle::Active))
            .one(db).await?
            .ok_or(AppError::BankAccountNotFound)?;

        if account.user_id != user_id {
            return Err(AppError::BankAccountNotOwned);
        }

        Ok(account)
    }

    fn active_accounts_query(user_id: Uuid) -> sea_orm::Select<BankAccount> {
        BankAccount::find()
            .filter(bank_account::Column::UserId.eq(user_id))
            .filter(bank_account::Column::Lifecycle.eq(Lifecycle::Active))
    }

    async fn clear_default(txn: &DatabaseTransaction, user_id: Uuid, keep: Option<Uuid>) -> Result<()> {
        let mut query = BankAccount::update_many()
            .col_expr(bank_account::Column::IsDefault, Expr::value(false))
            .filter(bank_account::Column::UserId.eq(user_id))
            .filter(bank_account::Column::IsDefault.eq(true));
        if let Some(keep) = keep {
            query = query.filter(bank_account::Column::Id.ne(keep));
        }
        query.exec(txn).await?;
        Ok(())
    }
}
