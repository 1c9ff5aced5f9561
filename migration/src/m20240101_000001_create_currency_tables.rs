use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Currency::Table)
                .if_not_exists()
                .col(ColumnDef::new(Currency::Code).string_len(10).not_null().primary_key())
                .col(ColumnDef::new(Currency::Name).string_len(100).not_null())
                .col(ColumnDef::new(Currency::Symbol).string_len(10).not_null())
                .col(ColumnDef::new(Currency::IsFiat).boolean().not_null().default(true))
                .col(ColumnDef::new(Currency::DecimalPlaces).integer().not_null().default(2))
                .col(
                    ColumnDef::new(Currency::Lifecycle)
                        .string_len(16)
                        .not_null()
                        .default("active")
                )
                .to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(ExchangeRate::Table)
                .if_not_exists()
                .col(ColumnDef::new(ExchangeRate::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(ExchangeRate::FromCurrency).string_len(10).not_null())
                .col(ColumnDef::new(ExchangeRate::ToCurrency).string_len(10).not_null())
                .col(ColumnDef::new(ExchangeRate::Rate).decimal().not_null())
                .col(
                    ColumnDef::new(ExchangeRate::EffectiveFrom)
                        .timestamp_with_time_zone()
                        .not_null()
                )
                .col(ColumnDef::new(ExchangeRate::EffectiveUntil).timestamp_with_time_zone().null())
                .col(ColumnDef::new(ExchangeRate::IsActive).boolean().not_null().default(true))
                .col(ColumnDef::new(ExchangeRate::CreatedBy).uuid().null())
                .col(
                    ColumnDef::new(ExchangeRate::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_exchange_rate_from_currency")
                        .from(ExchangeRate::Table, ExchangeRate::FromCurrency)
                        .to(Currency::Table, Currency::Code)
                        .on_delete(ForeignKeyAction::Restrict)
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_exchange_rate_to_currency")
                        .from(ExchangeRate::Table, ExchangeRate::ToCurrency)
                        .to(Currency::Table, Currency::Code)
                        .on_delete(ForeignKeyAction::Restrict)
                )
                .to_owned()
        ).await?;

        // Rate lookups always filter on the ordered pair
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_exchange_rate_pair")
                .table(ExchangeRate::Table)
                .col(ExchangeRate::FromCurrency)
                .col(ExchangeRate::ToCurrency)
                .col(ExchangeRate::EffectiveFrom)
                .to_owned()
        ).await?;

        let seed = Query::insert()
            .into_table(Currency::Table)
            .columns([
                Currency::Code,
                Currency::Name,
                Currency::Symbol,
                Currency::IsFiat,
                Currency::DecimalPlaces,
                Currency::Lifecycle,
            ])
            .values_panic(["TRU".into(), "Tru Token".into(), "TRU".into(), false.into(), 2.into(), "active".into()])
            .values_panic(["NGN".into(), "Nigerian Naira".into(), "₦".into(), true.into(), 2.into(), "active".into()])
            .values_panic(["USD".into(), "US Dollar".into(), "$".into(), true.into(), 2.into(), "active".into()])
            .values_panic(["GHS".into(), "Ghanaian Cedi".into(), "GH₵".into(), true.into(), 2.into(), "active".into()])
            .values_panic(["KES".into(), "Kenyan Shilling".into(), "KSh".into(), true.into(), 2.into(), "active".into()])
            .to_owned();

        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ExchangeRate::Table).to_owned()).await?;

        manager.drop_table(Table::drop().table(Currency::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Currency {
    Table,
    Code,
    Name,
    Symbol,
    IsFiat,
    DecimalPlaces,
    Lifecycle,
}

#[derive(DeriveIden)]
enum ExchangeRate {
    Table,
    Id,
    FromCurrency,
    ToCurrency,
    Rate,
    EffectiveFrom,
    EffectiveUntil,
    IsActive,
    CreatedBy,
    CreatedAt,
}
