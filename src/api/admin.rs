use axum::{ extract::{ Path, Query, State }, http::StatusCode, Json };
use chrono::{ DateTime, Utc };
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{ bank, bank_account, currency, exchange_rate, ledger_entry, wallet_account, withdrawal_request };
use crate::error::Result;
use crate::identity::CurrentUser;
use crate::services::admin_service::{ PayoutDetails, ProcessOutcome, ReviewDecision };
use crate::services::bank_account_service::NewBank;
use crate::services::currency_service::{ NewCurrency, NewExchangeRate };

use super::AppState;

#[derive(Deserialize)]
pub struct PendingQueryParams {
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct NotesRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct FreezeRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct SetRateRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct AddCurrencyRequest {
    pub code: String,
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_true")]
    pub is_fiat: bool,
    #[serde(default = "default_decimal_places")]
    pub decimal_places: i32,
}

#[derive(Deserialize)]
pub struct AddBankRequest {
    pub name: String,
    pub code: String,
    pub country: String,
    pub currency_code: String,
    pub routing_code: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_decimal_places() -> i32 {
    2
}

pub async fn list_pending_withdrawals(
    State(state): State<AppState>,
    admin: CurrentUser,
    Query(params): Query<PendingQueryParams>
) -> Result<Json<Vec<withdrawal_request::Model>>> {
    let requests = state.admin_service.list_pending_withdrawals(
        &admin,
        params.limit.unwrap_or(50)
    ).await?;
    Ok(Json(requests))
}

pub async fn get_withdrawal(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(request_id): Path<Uuid>
) -> Result<Json<withdrawal_request::Model>> {
    let request = state.admin_service.get_withdrawal(&admin, request_id).await?;
    Ok(Json(request))
}

pub async fn review_withdrawal(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(decision): Json<ReviewDecision>
) -> Result<Json<withdrawal_request::Model>> {
    let request = state.admin_service.review_withdrawal(&admin, request_id, decision).await?;
    Ok(Json(request))
}

pub async fn begin_processing(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(body): Json<NotesRequest>
) -> Result<Json<withdrawal_request::Model>> {
    let request = state.admin_service.begin_processing(&admin, request_id, body.notes).await?;
    Ok(Json(request))
}

pub async fn process_withdrawal(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(outcome): Json<ProcessOutcome>
) -> Result<Json<withdrawal_request::Model>> {
    let request = state.admin_service.process_withdrawal(&admin, request_id, outcome).await?;
    Ok(Json(request))
}

pub async fn payout_details(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(request_id): Path<Uuid>
) -> Result<Json<PayoutDetails>> {
    let details = state.admin_service.payout_details(&admin, request_id).await?;
    Ok(Json(details))
}

pub async fn adjust_wallet(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<AmountRequest>
) -> Result<Json<ledger_entry::Model>> {
    let entry = state.admin_service.adjust_wallet(&admin, user_id, body.amount, &body.reason).await?;
    Ok(Json(entry))
}

pub async fn freeze_wallet(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<FreezeRequest>
) -> Result<Json<wallet_account::Model>> {
    let wallet = state.admin_service.freeze_wallet(&admin, user_id, &body.reason).await?;
    Ok(Json(wallet))
}

pub async fn unfreeze_wallet(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(user_id): Path<Uuid>
) -> Result<Json<wallet_account::Model>> {
    let wallet = state.admin_service.unfreeze_wallet(&admin, user_id).await?;
    Ok(Json(wallet))
}

pub async fn hold_funds(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<AmountRequest>
) -> Result<Json<ledger_entry::Model>> {
    let entry = state.admin_service.hold_funds(&admin, user_id, body.amount, &body.reason).await?;
    Ok(Json(entry))
}

pub async fn release_funds(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<AmountRequest>
) -> Result<Json<ledger_entry::Model>> {
    let entry = state.admin_service.release_funds(&admin, user_id, body.amount, &body.reason).await?;
    Ok(Json(entry))
}

pub async fn set_exchange_rate(
    State(state): State<AppState>,
    admin: CurrentUser,
    Json(body): Json<SetRateRequest>
) -> Result<(StatusCode, Json<exchange_rate::Model>)> {
    let rate = state.admin_service.set_exchange_rate(&admin, NewExchangeRate {
        from_currency: body.from_currency,
        to_currency: body.to_currency,
        rate: body.rate,
        effective_from: body.effective_from,
        effective_until: body.effective_until,
        created_by: None,
    }).await?;

    Ok((StatusCode::CREATED, Json(rate)))
}

pub async fn add_currency(
    State(state): State<AppState>,
    admin: CurrentUser,
    Json(body): Json<AddCurrencyRequest>
) -> Result<(StatusCode, Json<currency::Model>)> {
    let currency = state.admin_service.add_currency(&admin, NewCurrency {
        code: body.code,
        name: body.name,
        symbol: body.symbol,
        is_fiat: body.is_fiat,
        decimal_places: body.decimal_places,
    }).await?;

    Ok((StatusCode::CREATED, Json(currency)))
}

pub async fn add_bank(
    State(state): State<AppState>,
    admin: CurrentUser,
    Json(body): Json<AddBankRequest>
) -> Result<(StatusCode, Json<bank::Model>)> {
    let bank = state.admin_service.add_bank(&admin, NewBank {
        name: body.name,
        code: body.code,
        country: body.country,
        currency_code: body.currency_code,
        routing_code: body.routing_code,
    }).await?;

    Ok((StatusCode::CREATED, Json(bank)))
}

pub async fn verify_bank_account(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(account_id): Path<Uuid>
) -> Result<Json<bank_account::Model>> {
    let account = state.admin_service.verify_bank_account(&admin, account_id).await?;
    Ok(Json(account))
}
