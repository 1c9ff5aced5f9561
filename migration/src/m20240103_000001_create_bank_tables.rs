use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Bank::Table)
                .if_not_exists()
                .col(ColumnDef::new(Bank::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Bank::Name).string_len(150).not_null())
                .col(ColumnDef::new(Bank::Code).string_len(20).not_null())
                .col(ColumnDef::new(Bank::Country).string_len(2).not_null())
                .col(ColumnDef::new(Bank::CurrencyCode).string_len(10).not_null())
                .col(ColumnDef::new(Bank::RoutingCode).string_len(50).null())
                .col(ColumnDef::new(Bank::Lifecycle).string_len(16).not_null().default("active"))
                .col(ColumnDef::new(Bank::CreatedAt).timestamp_with_time_zone().not_null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_bank_currency")
                        .from(Bank::Table, Bank::CurrencyCode)
                        .to(Currency::Table, Currency::Code)
                        .on_delete(ForeignKeyAction::Restrict)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_bank_country_code")
                .table(Bank::Table)
                .col(Bank::Country)
                .col(Bank::Code)
                .unique()
                .to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(BankAccount::Table)
                .if_not_exists()
                .col(ColumnDef::new(BankAccount::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(BankAccount::UserId).uuid().not_null())
                .col(ColumnDef::new(BankAccount::BankId).uuid().not_null())
                .col(ColumnDef::new(BankAccount::AccountNumberEncrypted).text().not_null())
                .col(ColumnDef::new(BankAccount::AccountNumberLast4).string_len(4).not_null())
                .col(ColumnDef::new(BankAccount::AccountFingerprint).string_len(64).not_null())
                .col(ColumnDef::new(BankAccount::AccountHolderName).string_len(150).not_null())
                .col(ColumnDef::new(BankAccount::AccountType).string_len(16).not_null())
                .col(ColumnDef::new(BankAccount::Status).string_len(24).not_null())
                .col(ColumnDef::new(BankAccount::IsDefault).boolean().not_null().default(false))
                .col(ColumnDef::new(BankAccount::IsVerified).boolean().not_null().default(false))
                .col(ColumnDef::new(BankAccount::UsageCount).integer().not_null().default(0))
                .col(ColumnDef::new(BankAccount::LastUsedAt).timestamp_with_time_zone().null())
                .col(
                    ColumnDef::new(BankAccount::Lifecycle)
                        .string_len(16)
                        .not_null()
                        .default("active")
                )
                .col(ColumnDef::new(BankAccount::CreatedAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(BankAccount::UpdatedAt).timestamp_with_time_zone().not_null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_bank_account_bank")
                        .from(BankAccount::Table, BankAccount::BankId)
                        .to(Bank::Table, Bank::Id)
                        .on_delete(ForeignKeyAction::Restrict)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_bank_account_user")
                .table(BankAccount::Table)
                .col(BankAccount::UserId)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(BankAccount::Table).to_owned()).await?;

        manager.drop_table(Table::drop().table(Bank::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Bank {
    Table,
    Id,
    Name,
    Code,
    Country,
    CurrencyCode,
    RoutingCode,
    Lifecycle,
    CreatedAt,
}

#[derive(DeriveIden)]
enum BankAccount {
    Table,
    Id,
    UserId,
    BankId,
    AccountNumberEncrypted,
    #[sea_orm(iden = "account_number_last4")]
    AccountNumberLast4,
    AccountFingerprint,
    AccountHolderName,
    AccountType,
    Status,
    IsDefault,
    IsVerified,
    UsageCount,
    LastUsedAt,
    Lifecycle,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Currency {
    Table,
    Code,
}
