use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(LedgerEntry::Table)
                .if_not_exists()
                .col(ColumnDef::new(LedgerEntry::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(LedgerEntry::WalletId).uuid().not_null())
                .col(ColumnDef::new(LedgerEntry::EntryType).string_len(20).not_null())
                .col(ColumnDef::new(LedgerEntry::Direction).string_len(10).not_null())
                .col(ColumnDef::new(LedgerEntry::Status).string_len(16).not_null())
                .col(ColumnDef::new(LedgerEntry::Amount).decimal().not_null())
                .col(ColumnDef::new(LedgerEntry::Fee).decimal().not_null().default(0))
                .col(ColumnDef::new(LedgerEntry::NetAmount).decimal().not_null())
                .col(ColumnDef::new(LedgerEntry::BalanceBefore).decimal().not_null())
                .col(ColumnDef::new(LedgerEntry::BalanceAfter).decimal().not_null())
                .col(ColumnDef::new(LedgerEntry::CurrencyCode).string_len(10).null())
                .col(ColumnDef::new(LedgerEntry::ExchangeRate).decimal().null())
                .col(ColumnDef::new(LedgerEntry::OriginalAmount).decimal().null())
                .col(ColumnDef::new(LedgerEntry::ReferenceType).string_len(32).null())
                .col(ColumnDef::new(LedgerEntry::ReferenceId).uuid().null())
                .col(ColumnDef::new(LedgerEntry::ReversesEntryId).uuid().null())
                .col(ColumnDef::new(LedgerEntry::Description).string_len(255).null())
                .col(ColumnDef::new(LedgerEntry::Metadata).text().null())
                .col(ColumnDef::new(LedgerEntry::CreatedAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(LedgerEntry::ProcessedAt).timestamp_with_time_zone().null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_ledger_entry_wallet")
                        .from(LedgerEntry::Table, LedgerEntry::WalletId)
                        .to(WalletAccount::Table, WalletAccount::Id)
                        .on_delete(ForeignKeyAction::Restrict)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_ledger_entry_wallet_created")
                .table(LedgerEntry::Table)
                .col(LedgerEntry::WalletId)
                .col(LedgerEntry::CreatedAt)
                .to_owned()
        ).await?;

        // At most one compensating entry per source entry
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_ledger_entry_reverses")
                .table(LedgerEntry::Table)
                .col(LedgerEntry::ReversesEntryId)
                .unique()
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_ledger_entry_reference")
                .table(LedgerEntry::Table)
                .col(LedgerEntry::ReferenceType)
                .col(LedgerEntry::ReferenceId)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(LedgerEntry::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum LedgerEntry {
    Table,
    Id,
    WalletId,
    EntryType,
    Direction,
    Status,
    Amount,
    Fee,
    NetAmount,
    BalanceBefore,
    BalanceAfter,
    CurrencyCode,
    ExchangeRate,
    OriginalAmount,
    ReferenceType,
    ReferenceId,
    ReversesEntryId,
    Description,
    Metadata,
    CreatedAt,
    ProcessedAt,
}

#[derive(DeriveIden)]
enum WalletAccount {
    Table,
    Id,
}
