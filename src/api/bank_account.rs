use axum::{ extract::{ Path, Query, State }, http::StatusCode, Json };
use serde::Deserialize;
use uuid::Uuid;

use crate::db::bank;
use crate::enums::BankAccountType;
use crate::error::Result;
use crate::identity::CurrentUser;
use crate::services::bank_account_service::{ BankAccountUpdate, BankAccountView, NewBankAccount };

use super::AppState;

#[derive(Deserialize)]
pub struct BankQueryParams {
    pub country: Option<String>,
}

#[derive(Deserialize)]
pub struct AddBankAccountRequest {
    pub bank_id: Uuid,
    pub account_number: String,
    pub account_holder_name: String,
    pub account_type: BankAccountType,
    #[serde(default)]
    pub make_default: bool,
}

#[derive(Deserialize)]
pub struct UpdateBankAccountRequest {
    pub account_holder_name: Option<String>,
    pub account_type: Option<BankAccountType>,
    pub is_default: Option<bool>,
}

pub async fn list_banks(
    State(state): State<AppState>,
    Query(params): Query<BankQueryParams>
) -> Result<Json<Vec<bank::Model>>> {
    let banks = state.bank_account_service.list_banks(params.country.as_deref()).await?;
    Ok(Json(banks))
}

pub async fn list_bank_accounts(
    State(state): State<AppState>,
    user: CurrentUser
) -> Result<Json<Vec<BankAccountView>>> {
    let accounts = state.bank_account_service.list_accounts(user.id).await?;
    Ok(Json(accounts))
}

pub async fn add_bank_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<AddBankAccountRequest>
) -> Result<(StatusCode, Json<BankAccountView>)> {
    let account = state.bank_account_service.add_account(user.id, NewBankAccount {
        bank_id: request.bank_id,
        account_number: request.account_number,
        account_holder_name: request.account_holder_name,
        account_type: request.account_type,
        make_default: request.make_default,
    }).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn update_bank_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(account_id): Path<Uuid>,
    Json(request): Json<UpdateBankAccountRequest>
) -> Result<Json<BankAccountView>> {
    let account = state.bank_account_service.update_account(user.id, account_id, BankAccountUpdate {
        account_holder_name: request.account_holder_name,
        account_type: request.account_type,
        is_default: request.is_default,
    }).await?;

    Ok(Json(account))
}

pub async fn delete_bank_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(account_id): Path<Uuid>
) -> Result<StatusCode> {
    state.bank_account_service.delete_account(user.id, account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
