use chrono::Utc;
use sea_orm::{ ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect };
use uuid::Uuid;

use crate::db::entity::{ wallet_account, WalletAccount };
use crate::error::{ AppError, Result };

/// Wallet row access shared by every component that moves money.
///
/// Reads inside a unit of work take a row lock; writes are a compare-and-swap
/// on `version`, so two writers can never both apply a change computed from
/// the same snapshot.
pub struct WalletRepository;

impl WalletRepository {
    pub async fn find_by_id<C>(db: &C, id: Uuid) -> Result<wallet_account::Model>
        where C: ConnectionTrait
    {
        WalletAccount::find_by_id(id).one(db).await?.ok_or(AppError::WalletNotFound)
    }

    pub async fn find_by_user<C>(db: &C, user_id: Uuid) -> Result<wallet_account::Model>
        where C: ConnectionTrait
    {
        WalletAccount::find()
            .filter(wallet_account::Column::UserId.eq(user_id))
            .one(db).await?
            .ok_or(AppError::WalletNotFound)
    }

    pub async fn lock_by_id<C>(db: &C, id: Uuid) -> Result<wallet_account::Model>
        where C: ConnectionTrait
    {
        WalletAccount::find_by_id(id)
            .lock_exclusive()
            .one(db).await?
            .ok_or(AppError::WalletNotFound)
    }

    pub async fn lock_by_user<C>(db: &C, user_id: Uuid) -> Result<wallet_account::Model>
        where C: ConnectionTrait
    {
        WalletAccount::find()
            .filter(wallet_account::Column::UserId.eq(user_id))
            .lock_exclusive()
            .one(db).await?
            .ok_or(AppError::WalletNotFound)
    }

    /// Applies the `Set` fields of `changes` if the row still carries
    /// `current.version`, bumping the version. Returns the stored row.
    pub async fn save_versioned<C>(
        db: &C,
        current: &wallet_account::Model,
        mut changes: wallet_account::ActiveModel
    ) -> Result<wallet_account::Model>
        where C: ConnectionTrait
    {
        changes.version = Set(current.version + 1);
        changes.updated_at = Set(Utc::now());

        let result = WalletAccount::update_many()
            .set(changes)
            .filter(wallet_account::Column::Id.eq(current.id))
            .filter(wallet_account::Column::Version.eq(current.version))
            .exec(db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::ConcurrentModification(format!("wallet {}", current.id)));
        }

        Self::find_by_id(db, current.id).await
    }
}
