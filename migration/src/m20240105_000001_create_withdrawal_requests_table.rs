use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(WithdrawalRequest::Table)
                .if_not_exists()
                .col(ColumnDef::new(WithdrawalRequest::Id).uuid().not_null().primary_key())
                .col(
                    ColumnDef::new(WithdrawalRequest::Reference)
                        .string_len(32)
                        .not_null()
                        .unique_key()
                )
                .col(ColumnDef::new(WithdrawalRequest::WalletId).uuid().not_null())
                .col(ColumnDef::new(WithdrawalRequest::UserId).uuid().not_null())
                // Weak reference: the request keeps a snapshot of the account
                .col(ColumnDef::new(WithdrawalRequest::BankAccountId).uuid().not_null())
                .col(ColumnDef::new(WithdrawalRequest::CurrencyCode).string_len(10).not_null())
                .col(ColumnDef::new(WithdrawalRequest::AmountToken).decimal().not_null())
                .col(ColumnDef::new(WithdrawalRequest::AmountLocal).decimal().not_null())
                .col(ColumnDef::new(WithdrawalRequest::ExchangeRate).decimal().not_null())
                .col(ColumnDef::new(WithdrawalRequest::FeeToken).decimal().not_null())
                .col(
                    ColumnDef::new(WithdrawalRequest::NetAmountToken)
                        .decimal()
                        .not_null()
                )
                .col(ColumnDef::new(WithdrawalRequest::Status).string_len(16).not_null())
                .col(ColumnDef::new(WithdrawalRequest::Priority).integer().not_null().default(1))
                .col(ColumnDef::new(WithdrawalRequest::DebitEntryId).uuid().not_null())
                .col(ColumnDef::new(WithdrawalRequest::ReviewedBy).uuid().null())
                .col(ColumnDef::new(WithdrawalRequest::ReviewedAt).timestamp_with_time_zone().null())
                .col(ColumnDef::new(WithdrawalRequest::ReviewNotes).text().null())
                .col(ColumnDef::new(WithdrawalRequest::ProcessedBy).uuid().null())
                .col(ColumnDef::new(WithdrawalRequest::ProcessedAt).timestamp_with_time_zone().null())
                .col(ColumnDef::new(WithdrawalRequest::ProcessingNotes).text().null())
                .col(ColumnDef::new(WithdrawalRequest::CompletedAt).timestamp_with_time_zone().null())
                .col(ColumnDef::new(WithdrawalRequest::TransactionReference).string_len(100).null())
                .col(ColumnDef::new(WithdrawalRequest::FailureReason).text().null())
                .col(ColumnDef::new(WithdrawalRequest::BankName).string_len(150).not_null())
                .col(ColumnDef::new(WithdrawalRequest::BankCode).string_len(20).not_null())
                .col(ColumnDef::new(WithdrawalRequest::AccountHolderName).string_len(150).not_null())
                .col(ColumnDef::new(WithdrawalRequest::AccountNumberLast4).string_len(4).not_null())
                .col(ColumnDef::new(WithdrawalRequest::ExpiresAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(WithdrawalRequest::Metadata).text().null())
                .col(ColumnDef::new(WithdrawalRequest::CreatedAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(WithdrawalRequest::UpdatedAt).timestamp_with_time_zone().not_null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_withdrawal_request_wallet")
                        .from(WithdrawalRequest::Table, WithdrawalRequest::WalletId)
                        .to(WalletAccount::Table, WalletAccount::Id)
                        .on_delete(ForeignKeyAction::Restrict)
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_withdrawal_request_debit_entry")
                        .from(WithdrawalRequest::Table, WithdrawalRequest::DebitEntryId)
                        .to(LedgerEntry::Table, LedgerEntry::Id)
                        .on_delete(ForeignKeyAction::Restrict)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_withdrawal_request_user_created")
                .table(WithdrawalRequest::Table)
                .col(WithdrawalRequest::UserId)
                .col(WithdrawalRequest::CreatedAt)
                .to_owned()
        ).await?;

        // Sweeper and admin queue both scan by status
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_withdrawal_request_status_expires")
                .table(WithdrawalRequest::Table)
                .col(WithdrawalRequest::Status)
                .col(WithdrawalRequest::ExpiresAt)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(WithdrawalRequest::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum WithdrawalRequest {
    Table,
    Id,
    Reference,
    WalletId,
    UserId,
    BankAccountId,
    CurrencyCode,
    AmountToken,
    AmountLocal,
    ExchangeRate,
    FeeToken,
    NetAmountToken,
    Status,
    Priority,
    DebitEntryId,
    ReviewedBy,
    ReviewedAt,
    ReviewNotes,
    ProcessedBy,
    ProcessedAt,
    ProcessingNotes,
    CompletedAt,
    TransactionReference,
    FailureReason,
    BankName,
    BankCode,
    AccountHolderName,
    #[sea_orm(iden = "account_number_last4")]
    AccountNumberLast4,
    ExpiresAt,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WalletAccount {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum LedgerEntry {
    Table,
    Id,
}
