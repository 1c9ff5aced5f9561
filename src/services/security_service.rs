use std::sync::Arc;

use chrono::{ DateTime, Utc };
use sea_orm::{ ActiveValue::Set, DatabaseConnection, DatabaseTransaction, TransactionTrait };
use serde::Serialize;
use tracing::{ info, warn };
use uuid::Uuid;

use crate::config::PinPolicy;
use crate::crypto::PinHasher;
use crate::db::{ retry_on_conflict, wallet_account, WalletRepository };
use crate::error::{ AppError, Result };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PinState {
    Unset,
    Unlocked {
        attempts: i32,
    },
    Locked {
        until: DateTime<Utc>,
    },
}

/// Outcome of checking a PIN under the wallet lock. Rejections are returned
/// as values so the attempt counter can be committed before the error
/// reaches the caller.
enum PinCheck {
    Accepted(wallet_account::Model),
    Rejected(AppError),
}

impl PinCheck {
    fn into_result(self) -> Result<wallet_account::Model> {
        match self {
            PinCheck::Accepted(wallet) => Ok(wallet),
            PinCheck::Rejected(err) => Err(err),
        }
    }
}

pub fn validate_pin_format(pin: &str) -> Result<()> {
    if !(4..=6).contains(&pin.len()) || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidInput("PIN must be 4 to 6 digits".to_string()));
    }
    Ok(())
}

pub fn pin_state(wallet: &wallet_account::Model, now: DateTime<Utc>) -> PinState {
    if wallet.pin_hash.is_none() {
        return PinState::Unset;
    }
    match wallet.pin_locked_until {
        Some(until) if until > now => PinState::Locked { until },
        Some(_) => PinState::Unlocked { attempts: 0 },
        None => PinState::Unlocked { attempts: wallet.pin_attempts },
    }
}

/// Transaction PIN management with per-wallet attempt counting and lockout.
#[derive(Clone)]
pub struct SecurityService {
    db: DatabaseConnection,
    hasher: Arc<PinHasher>,
    policy: PinPolicy,
}

impl SecurityService {
    pub fn new(db: DatabaseConnection, hasher: Arc<PinHasher>, policy: PinPolicy) -> Self {
        Self { db, hasher, policy }
    }

    pub async fn set_pin(&self, user_id: Uuid, pin: &str) -> Result<()> {
        validate_pin_format(pin)?;
        let hash = self.hasher.hash(pin)?;

        retry_on_conflict("set_pin", || self.set_pin_once(user_id, &hash)).await?;

        info!(user_id = %user_id, "Transaction PIN set");
        Ok(())
    }

    async fn set_pin_once(&self, user_id: Uuid, hash: &str) -> Result<()> {
        let txn = self.db.begin().await?;
        let wallet = WalletRepository::lock_by_user(&txn, user_id).await?;

        if wallet.pin_hash.is_some() {
            return Err(AppError::PinAlreadySet);
        }

        let changes = wallet_account::ActiveModel {
            pin_hash: Set(Some(hash.to_string())),
            pin_attempts: Set(0),
            pin_locked_until: Set(None),
            withdrawal_enabled: Set(true),
            ..Default::default()
        };
        WalletRepository::save_versioned(&txn, &wallet, changes).await?;

        txn.commit().await?;
        Ok(())
    }

    pub async fn change_pin(&self, user_id: Uuid, current: &str, new_pin: &str) -> Result<()> {
        validate_pin_format(new_pin)?;
        let new_hash = self.hasher.hash(new_pin)?;

        retry_on_conflict("change_pin", || self.change_pin_once(user_id, current, &new_hash)).await?;

        info!(user_id = %user_id, "Transaction PIN changed");
        Ok(())
    }

    async fn change_pin_once(&self, user_id: Uuid, current: &str, new_hash: &str) -> Result<()> {
        let txn = self.db.begin().await?;
        let wallet = WalletRepository::lock_by_user(&txn, user_id).await?;

        match self.check_pin(&txn, wallet, current).await? {
            PinCheck::Accepted(wallet) => {
                let changes = wallet_account::ActiveModel {
                    pin_hash: Set(Some(new_hash.to_string())),
                    ..Default::default()
                };
                WalletRepository::save_versioned(&txn, &wallet, changes).await?;
                txn.commit().await?;
                Ok(())
            }
            PinCheck::Rejected(err) => {
                txn.commit().await?;
                Err(err)
            }
        }
    }

    /// Verifies `pin` in its own committed unit of work and returns the
    /// wallet as stored afterwards.
    pub async fn verify_pin(&self, user_id: Uuid, pin: &str) -> Result<wallet_account::Model> {
        retry_on_conflict("verify_pin", || self.verify_pin_once(user_id, pin)).await
    }

    async fn verify_pin_once(&self, user_id: Uuid, pin: &str) -> Result<wallet_account::Model> {
        let txn = self.db.begin().await?;
        let wallet = WalletRepository::lock_by_user(&txn, user_id).await?;

        let check = self.check_pin(&txn, wallet, pin).await?;
        txn.commit().await?;

        check.into_result()
    }

    pub async fn get_pin_state(&self, user_id: Uuid) -> Result<PinState> {
        let wallet = WalletRepository::find_by_user(&self.db, user_id).await?;
        Ok(pin_state(&wallet, Utc::now()))
    }

    async fn check_pin(
        &self,
        txn: &DatabaseTransaction,
        wallet: wallet_account::Model,
        pin: &str
    ) -> Result<PinCheck> {
        let now = Utc::now();

        let Some(hash) = wallet.pin_hash.clone() else {
            return Ok(PinCheck::Rejected(AppError::PinNotSet));
        };

        if let Some(until) = wallet.pin_locked_until {
            if until > now {
                return Ok(PinCheck::Rejected(AppError::PinLocked { until }));
            }
        }

        // A lapsed lock starts a fresh round of attempts
        let prior_attempts = if wallet.pin_locked_until.is_some() { 0 } else { wallet.pin_attempts };

        if self.hasher.verify(pin, &hash)? {
            if wallet.pin_attempts == 0 && wallet.pin_locked_until.is_none() {
                return Ok(PinCheck::Accepted(wallet));
            }

            let changes = wallet_account::ActiveModel {
                pin_attempts: Set(0),
                pin_locked_until: Set(None),
                ..Default::default()
            };
            let wallet = WalletRepository::save_versioned(txn, &wallet, changes).await?;
            return Ok(PinCheck::Accepted(wallet));
        }

        let attempts = prior_attempts + 1;

        if attempts >= wallet.max_pin_attempts {
            let until = now + self.policy.lockout;
            let changes = wallet_account::ActiveModel {
                pin_attempts: Set(attempts),
                pin_locked_until: Set(Some(until)),
                ..Default::default()
            };
            WalletRepository::save_versioned(txn, &wallet, changes).await?;

            warn!(user_id = %wallet.user_id, attempts, locked_until = %until, "Transaction PIN locked");
            return Ok(PinCheck::Rejected(AppError::PinLocked { until }));
        }

        let changes = wallet_account::ActiveModel {
            pin_attempts: Set(attempts),
            pin_locked_until: Set(None),
            ..Default::default()
        };
        WalletRepository::save_versioned(txn, &wallet, changes).await?;

        warn!(user_id = %wallet.user_id, attempts, "Invalid transaction PIN");
        Ok(
            PinCheck::Rejected(AppError::InvalidPin {
                attempts_remaining: wallet.max_pin_attempts - attempts,
            })
        )
    }
}
