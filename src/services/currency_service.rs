use chrono::{ DateTime, Utc };
use rust_decimal::{ Decimal, RoundingStrategy };
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait,
    Condition,
    DatabaseConnection,
    EntityTrait,
    QueryFilter,
    QueryOrder,
    TransactionTrait,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::db::entity::{ currency, exchange_rate, Currency, ExchangeRate };
use crate::enums::Lifecycle;
use crate::error::{ AppError, Result };

/// Rounds half away from zero to a currency's precision.
pub fn round_to(amount: Decimal, decimal_places: u32) -> Decimal {
    amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub converted: Decimal,
    pub rate: Decimal,
    /// `None` for the identity conversion.
    pub rate_id: Option<Uuid>,
}

/// Result of pricing a local-currency payout in tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InverseConversion {
    pub amount_token: Decimal,
    /// Re-derived from the rounded token amount, so
    /// `amount_local == round(amount_token * rate)` holds exactly.
    pub amount_local: Decimal,
    pub rate: Decimal,
    pub rate_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewCurrency {
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub is_fiat: bool,
    pub decimal_places: i32,
}

#[derive(Debug, Clone)]
pub struct NewExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
}

/// Currency catalog and rate conversion.
#[derive(Clone)]
pub struct CurrencyService {
    db: DatabaseConnection,
}

impl CurrencyService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_currencies(&self) -> Result<Vec<currency::Model>> {
        let currencies = Currency::find()
            .filter(currency::Column::Lifecycle.eq(Lifecycle::Active))
            .order_by_asc(currency::Column::Code)
            .all(&self.db).await?;

        Ok(currencies)
    }

    pub async fn get_currency(&self, code: &str) -> Result<currency::Model> {
        let code = code.trim().to_uppercase();
        Currency::find_by_id(code.clone())
            .filter(currency::Column::Lifecycle.eq(Lifecycle::Active))
            .one(&self.db).await?
            .ok_or(AppError::CurrencyNotFound(code))
    }

    pub async fn add_currency(&self, new: NewCurrency) -> Result<currency::Model> {
        let code = new.code.trim().to_uppercase();
        if code.len() < 3 || code.len() > 10 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::InvalidInput(format!("Invalid currency code: {}", new.code)));
        }
        if !(0..=8).contains(&new.decimal_places) {
            return Err(AppError::InvalidInput("decimal_places must be between 0 and 8".into()));
        }
        if new.name.trim().is_empty() {
            return Err(AppError::InvalidInput("Currency name is required".into()));
        }

        if Currency::find_by_id(code.clone()).one(&self.db).await?.is_some() {
            return Err(AppError::InvalidInput(format!("Currency {} already exists", code)));
        }

        let currency = currency::ActiveModel {
            code: Set(code),
            name: Set(new.name.trim().to_string()),
            symbol: Set(new.symbol.trim().to_string()),
            is_fiat: Set(new.is_fiat),
            decimal_places: Set(new.decimal_places),
            lifecycle: Set(Lifecycle::Active),
        };

        let currency = currency.insert(&self.db).await?;
        info!(code = %currency.code, "Currency added");
        Ok(currency)
    }

    /// The single current rate for `from -> to`.
    ///
    /// Ties between overlapping rows go to the latest `effective_from`, then
    /// the latest `created_at`, then the greatest id.
    pub async fn current_rate(&self, from: &str, to: &str) -> Result<exchange_rate::Model> {
        let from = self.get_currency(from).await?;
        let to = self.get_currency(to).await?;
        let now = Utc::now();

        ExchangeRate::find()
            .filter(exchange_rate::Column::FromCurrency.eq(from.code.as_str()))
            .filter(exchange_rate::Column::ToCurrency.eq(to.code.as_str()))
            .filter(exchange_rate::Column::IsActive.eq(true))
            .filter(exchange_rate::Column::EffectiveFrom.lte(now))
            .filter(
                Condition::any()
                    .add(exchange_rate::Column::EffectiveUntil.is_null())
                    .add(exchange_rate::Column::EffectiveUntil.gt(now))
            )
            .order_by_desc(exchange_rate::Column::EffectiveFrom)
            .order_by_desc(exchange_rate::Column::CreatedAt)
            .order_by_desc(exchange_rate::Column::Id)
            .one(&self.db).await?
            .ok_or(AppError::RateNotFound { from: from.code, to: to.code })
    }

    /// Converts `amount` of `from` into `to`, rounded to the target's precision.
    pub async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Conversion> {
        let target = self.get_currency(to).await?;

        if from.trim().eq_ignore_ascii_case(&target.code) {
            return Ok(Conversion {
                from: target.code.clone(),
                to: target.code.clone(),
                amount,
                converted: round_to(amount, target.places()),
                rate: Decimal::ONE,
                rate_id: None,
            });
        }

        let rate = self.current_rate(from, to).await?;

        Ok(Conversion {
            from: rate.from_currency.clone(),
            to: rate.to_currency.clone(),
            amount,
            converted: round_to(amount * rate.rate, target.places()),
            rate: rate.rate,
            rate_id: Some(rate.id),
        })
    }

    /// Prices `amount_local` of `local` in `token` using the `token -> local`
    /// rate: the token amount is `amount_local / rate` rounded to the token's
    /// precision, and the local amount is recomputed from it.
    pub async fn invert(
        &self,
        amount_local: Decimal,
        token: &str,
        local: &str
    ) -> Result<InverseConversion> {
        let token_currency = self.get_currency(token).await?;
        let local_currency = self.get_currency(local).await?;
        let rate = self.current_rate(token, local).await?;

        if rate.rate <= Decimal::ZERO {
            return Err(AppError::Internal(format!("Non-positive exchange rate {}", rate.id)));
        }

        let raw_token = amount_local
            .checked_div(rate.rate)
            .ok_or_else(|| AppError::InvalidInput("Amount out of range".into()))?;
        let amount_token = round_to(raw_token, token_currency.places());
        let amount_local = round_to(amount_token * rate.rate, local_currency.places());

        Ok(InverseConversion {
            amount_token,
            amount_local,
            rate: rate.rate,
            rate_id: rate.id,
        })
    }

    /// Publishes a rate. Open-ended active rows for the same pair are closed
    /// at the new row's `effective_from` in the same transaction.
    pub async fn set_rate(&self, new: NewExchangeRate) -> Result<exchange_rate::Model> {
        if new.rate <= Decimal::ZERO {
            return Err(AppError::InvalidInput("Exchange rate must be positive".into()));
        }

        let from = self.get_currency(&new.from_currency).await?;
        let to = self.get_currency(&new.to_currency).await?;
        if from.code == to.code {
            return Err(AppError::InvalidInput("Cannot set a rate from a currency to itself".into()));
        }

        let now = Utc::now();
        let effective_from = new.effective_from.unwrap_or(now);
        if let Some(until) = new.effective_until {
            if until <= effective_from {
                return Err(
                    AppError::InvalidInput("effective_until must be after effective_from".into())
                );
            }
        }

        let txn = self.db.begin().await?;

        let closed = ExchangeRate::update_many()
            .set(exchange_rate::ActiveModel {
                effective_until: Set(Some(effective_from)),
                ..Default::default()
            })
            .filter(exchange_rate::Column::FromCurrency.eq(from.code.as_str()))
            .filter(exchange_rate::Column::ToCurrency.eq(to.code.as_str()))
            .filter(exchange_rate::Column::IsActive.eq(true))
            .filter(exchange_rate::Column::EffectiveUntil.is_null())
            .filter(exchange_rate::Column::EffectiveFrom.lt(effective_from))
            .exec(&txn).await?;

        let rate = exchange_rate::ActiveModel {
            id: Set(Uuid::new_v4()),
            from_currency: Set(from.code.clone()),
            to_currency: Set(to.code.clone()),
            rate: Set(new.rate),
            effective_from: Set(effective_from),
            effective_until: Set(new.effective_until),
            is_active: Set(true),
            created_by: Set(new.created_by),
            created_at: Set(now),
        };
        let rate = rate.insert(&txn).await?;

        txn.commit().await?;

        info!(
            from = %rate.from_currency,
            to = %rate.to_currency,
            rate = %rate.rate,
            superseded = closed.rows_affected,
            "Exchange rate published"
        );

        Ok(rate)
    }

    /// Rate history for a pair, newest first.
    pub async fn list_rates(&self, from: &str, to: &str) -> Result<Vec<exchange_rate::Model>> {
        let rates = ExchangeRate::find()
            .filter(exchange_rate::Column::FromCurrency.eq(from.trim().to_uppercase()))
            .filter(exchange_rate::Column::ToCurrency.eq(to.trim().to_uppercase()))
            .order_by_desc(exchange_rate::Column::EffectiveFrom)
            .order_by_desc(exchange_rate::Column::CreatedAt)
            .all(&self.db).await?;

        Ok(rates)
    }
}
