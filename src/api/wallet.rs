use axum::{ extract::{ Query, State }, http::StatusCode, Json };
use serde::Deserialize;

use crate::db::{ ledger_entry, wallet_account };
use crate::error::Result;
use crate::identity::CurrentUser;
use crate::services::ledger_service::TransactionFilter;
use crate::services::wallet_service::WalletSummary;

use super::AppState;

#[derive(Deserialize)]
pub struct SetPinRequest {
    pub pin: String,
}

#[derive(Deserialize)]
pub struct ChangePinRequest {
    pub current_pin: String,
    pub new_pin: String,
}

pub async fn create_wallet(
    State(state): State<AppState>,
    user: CurrentUser
) -> Result<(StatusCode, Json<wallet_account::Model>)> {
    let wallet = state.wallet_service.create_wallet(user.id).await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

pub async fn get_wallet(State(state): State<AppState>, user: CurrentUser) -> Result<Json<WalletSummary>> {
    let summary = state.wallet_service.get_wallet(user.id).await?;
    Ok(Json(summary))
}

pub async fn set_pin(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SetPinRequest>
) -> Result<StatusCode> {
    state.security_service.set_pin(user.id, &request.pin).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_pin(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ChangePinRequest>
) -> Result<StatusCode> {
    state.security_service.change_pin(user.id, &request.current_pin, &request.new_pin).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_transactions(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<TransactionFilter>
) -> Result<Json<Vec<ledger_entry::Model>>> {
    let entries = state.wallet_service.list_transactions(user.id, &filter).await?;
    Ok(Json(entries))
}
