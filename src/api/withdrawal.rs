use axum::{ extract::{ Path, Query, State }, http::StatusCode, Json };
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::withdrawal_request;
use crate::error::Result;
use crate::identity::CurrentUser;
use crate::metadata::Metadata;
use crate::services::withdrawal_service::{ SubmitWithdrawal, WithdrawalFilter, WithdrawalQuote };

use super::AppState;

#[derive(Deserialize)]
pub struct CalculateWithdrawalRequest {
    pub currency_code: String,
    pub amount_local: Decimal,
}

#[derive(Deserialize)]
pub struct SubmitWithdrawalRequest {
    pub currency_code: String,
    pub amount_local: Decimal,
    pub bank_account_id: Uuid,
    pub pin: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

pub async fn calculate_withdrawal(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CalculateWithdrawalRequest>
) -> Result<Json<WithdrawalQuote>> {
    let quote = state.withdrawal_service.calculate(
        user.id,
        &request.currency_code,
        request.amount_local
    ).await?;

    Ok(Json(quote))
}

pub async fn submit_withdrawal(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SubmitWithdrawalRequest>
) -> Result<(StatusCode, Json<withdrawal_request::Model>)> {
    let created = state.withdrawal_service.submit(user.id, SubmitWithdrawal {
        currency_code: request.currency_code,
        amount_local: request.amount_local,
        bank_account_id: request.bank_account_id,
        pin: request.pin,
        metadata: request.metadata,
    }).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn cancel_withdrawal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(request_id): Path<Uuid>
) -> Result<Json<withdrawal_request::Model>> {
    let request = state.withdrawal_service.cancel(user.id, request_id).await?;
    Ok(Json(request))
}

pub async fn list_withdrawals(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<WithdrawalFilter>
) -> Result<Json<Vec<withdrawal_request::Model>>> {
    let requests = state.withdrawal_service.list(user.id, &filter).await?;
    Ok(Json(requests))
}

pub async fn get_withdrawal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(request_id): Path<Uuid>
) -> Result<Json<withdrawal_request::Model>> {
    let request = state.withdrawal_service.get(user.id, request_id).await?;
    Ok(Json(request))
}
