use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(WalletAccount::Table)
                .if_not_exists()
                .col(ColumnDef::new(WalletAccount::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(WalletAccount::UserId).uuid().not_null().unique_key())
                .col(ColumnDef::new(WalletAccount::Balance).decimal().not_null().default(0))
                .col(
                    ColumnDef::new(WalletAccount::FrozenBalance)
                        .decimal()
                        .not_null()
                        .default(0)
                )
                .col(
                    ColumnDef::new(WalletAccount::Status)
                        .string_len(16)
                        .not_null()
                        .default("active")
                )
                .col(
                    ColumnDef::new(WalletAccount::WithdrawalEnabled)
                        .boolean()
                        .not_null()
                        .default(false)
                )
                .col(ColumnDef::new(WalletAccount::PinHash).string().null())
                .col(ColumnDef::new(WalletAccount::PinAttempts).integer().not_null().default(0))
                .col(ColumnDef::new(WalletAccount::PinLockedUntil).timestamp_with_time_zone().null())
                .col(ColumnDef::new(WalletAccount::MaxPinAttempts).integer().not_null().default(5))
                .col(
                    ColumnDef::new(WalletAccount::DailyWithdrawalLimit)
                        .decimal()
                        .not_null()
                )
                .col(
                    ColumnDef::new(WalletAccount::DailyWithdrawnAmount)
                        .decimal()
                        .not_null()
                        .default(0)
                )
                .col(
                    ColumnDef::new(WalletAccount::LastWithdrawalReset)
                        .timestamp_with_time_zone()
                        .null()
                )
                .col(
                    ColumnDef::new(WalletAccount::WithdrawalCount)
                        .integer()
                        .not_null()
                        .default(0)
                )
                .col(
                    ColumnDef::new(WalletAccount::TotalDeposited)
                        .decimal()
                        .not_null()
                        .default(0)
                )
                .col(
                    ColumnDef::new(WalletAccount::TotalWithdrawn)
                        .decimal()
                        .not_null()
                        .default(0)
                )
                .col(ColumnDef::new(WalletAccount::Version).big_integer().not_null().default(0))
                .col(
                    ColumnDef::new(WalletAccount::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                )
                .col(
                    ColumnDef::new(WalletAccount::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                )
                .to_owned()
        ).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(WalletAccount::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum WalletAccount {
    Table,
    Id,
    UserId,
    Balance,
    FrozenBalance,
    Status,
    WithdrawalEnabled,
    PinHash,
    PinAttempts,
    PinLockedUntil,
    MaxPinAttempts,
    DailyWithdrawalLimit,
    DailyWithdrawnAmount,
    LastWithdrawalReset,
    WithdrawalCount,
    TotalDeposited,
    TotalWithdrawn,
    Version,
    CreatedAt,
    UpdatedAt,
}
