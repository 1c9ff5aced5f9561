use axum::{ extract::{ Path, State }, Json };

use crate::db::{ currency, exchange_rate };
use crate::error::Result;

use super::AppState;

pub async fn list_currencies(State(state): State<AppState>) -> Result<Json<Vec<currency::Model>>> {
    let currencies = state.currency_service.list_currencies().await?;
    Ok(Json(currencies))
}

pub async fn get_rate(
    State(state): State<AppState>,
    Path((from, to)): Path<(String, String)>
) -> Result<Json<exchange_rate::Model>> {
    let rate = state.currency_service.current_rate(&from, &to).await?;
    Ok(Json(rate))
}
