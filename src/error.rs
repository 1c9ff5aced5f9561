use chrono::{ DateTime, Utc };
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::enums::{ WalletStatus, WithdrawalStatus };

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")] Database(#[from] sea_orm::DbErr),

    #[error("Encryption error: {0}")] Encryption(String),

    #[error("Invalid input: {0}")] InvalidInput(String),

    #[error("Wallet not found")]
    WalletNotFound,

    #[error("Wallet is not active (status: {})", .0.as_str())] WalletNotActive(WalletStatus),

    #[error("Withdrawals are disabled for this wallet")]
    WithdrawalDisabled,

    #[error("Insufficient balance: available {available}, required {required}")] InsufficientBalance {
        available: Decimal,
        required: Decimal,
    },

    #[error("Daily withdrawal limit exceeded: limit {limit}, remaining {remaining}")] DailyLimitExceeded {
        limit: Decimal,
        remaining: Decimal,
    },

    #[error("Transaction PIN has not been set")]
    PinNotSet,

    #[error("Transaction PIN is already set")]
    PinAlreadySet,

    #[error("Transaction PIN locked until {until}")] PinLocked {
        until: DateTime<Utc>,
    },

    #[error("Invalid PIN, {attempts_remaining} attempts remaining")] InvalidPin {
        attempts_remaining: i32,
    },

    #[error("Bank account not found")]
    BankAccountNotFound,

    #[error("Bank account does not belong to this user or is not usable")]
    BankAccountNotOwned,

    #[error("Cannot delete the default bank account while other accounts exist")]
    CannotDeleteDefault,

    #[error("Bank not found")]
    BankNotFound,

    #[error("Currency not found: {0}")] CurrencyNotFound(String),

    #[error("No current exchange rate for {from}->{to}")] RateNotFound {
        from: String,
        to: String,
    },

    #[error("Withdrawal request not found")]
    WithdrawalNotFound,

    #[error("Withdrawal request expired at {expires_at}")] WithdrawalExpired {
        expires_at: DateTime<Utc>,
    },

    #[error("Invalid status transition: {} -> {}", .from.as_str(), .to.as_str())] InvalidTransition {
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    },

    #[error("Ledger entry not found")]
    EntryNotFound,

    #[error("Ledger entry {0} has already been reversed")] AlreadyReversed(Uuid),

    #[error("Concurrent modification of {0}")] ConcurrentModification(String),

    #[error("Forbidden: {0}")] Forbidden(String),

    #[error("Unauthorized: {0}")] Unauthorized(String),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Internal error: {0}")] Internal(String),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn to_error_response(&self) -> ErrorResponse {
        let (code, message, field, details) = match self {
            // Storage and crypto failures never leak their internals
            AppError::Database(_) =>
                ("INTERNAL_ERROR", "Internal storage failure".to_string(), None, None),
            AppError::Encryption(_) | AppError::Config(_) | AppError::Internal(_) =>
                ("INTERNAL_ERROR", "Internal server error".to_string(), None, None),
            AppError::InvalidInput(msg) => ("INVALID_INPUT", msg.clone(), None, None),
            AppError::WalletNotFound => ("WALLET_NOT_FOUND", self.to_string(), None, None),
            AppError::WalletNotActive(status) =>
                (
                    "WALLET_NOT_ACTIVE",
                    self.to_string(),
                    None,
                    Some(json!({ "status": status.as_str() })),
                ),
            AppError::WithdrawalDisabled => ("WITHDRAWAL_DISABLED", self.to_string(), None, None),
            AppError::InsufficientBalance { available, required } =>
                (
                    "INSUFFICIENT_BALANCE",
                    "Insufficient balance for withdrawal".to_string(),
                    Some("amount".to_string()),
                    Some(
                        json!({ "available": available.to_string(), "required": required.to_string() })
                    ),
                ),
            AppError::DailyLimitExceeded { limit, remaining } =>
                (
                    "DAILY_LIMIT_EXCEEDED",
                    "Daily withdrawal limit exceeded".to_string(),
                    Some("amount".to_string()),
                    Some(json!({ "limit": limit.to_string(), "remaining": remaining.to_string() })),
                ),
            AppError::PinNotSet => ("PIN_NOT_SET", self.to_string(), None, None),
            AppError::PinAlreadySet => ("PIN_ALREADY_SET", self.to_string(), None, None),
            AppError::PinLocked { until } =>
                (
                    "PIN_LOCKED",
                    "Too many failed PIN attempts".to_string(),
                    Some("pin".to_string()),
                    Some(json!({ "locked_until": until.to_rfc3339() })),
                ),
            AppError::InvalidPin { attempts_remaining } =>
                (
                    "INVALID_PIN",
                    "Invalid PIN".to_string(),
                    Some("pin".to_string()),
                    Some(json!({ "attempts_remaining": attempts_remaining })),
                ),
            AppError::BankAccountNotFound =>
                ("BANK_ACCOUNT_NOT_FOUND", self.to_string(), None, None),
            AppError::BankAccountNotOwned =>
                (
                    "BANK_ACCOUNT_NOT_OWNED",
                    self.to_string(),
                    Some("bank_account_id".to_string()),
                    None,
                ),
            AppError::CannotDeleteDefault =>
                ("CANNOT_DELETE_DEFAULT", self.to_string(), None, None),
            AppError::BankNotFound => ("BANK_NOT_FOUND", self.to_string(), None, None),
            AppError::CurrencyNotFound(code) =>
                (
                    "CURRENCY_NOT_FOUND",
                    self.to_string(),
                    Some("currency_code".to_string()),
                    Some(json!({ "currency": code })),
                ),
            AppError::RateNotFound { from, to } =>
                (
                    "RATE_NOT_FOUND",
                    self.to_string(),
                    None,
                    Some(json!({ "from": from, "to": to })),
                ),
            AppError::WithdrawalNotFound => ("WITHDRAWAL_NOT_FOUND", self.to_string(), None, None),
            AppError::WithdrawalExpired { expires_at } =>
                (
                    "WITHDRAWAL_EXPIRED",
                    "Withdrawal request has expired".to_string(),
                    None,
                    Some(json!({ "expires_at": expires_at.to_rfc3339() })),
                ),
            AppError::InvalidTransition { from, to } =>
                (
                    "INVALID_TRANSITION",
                    self.to_string(),
                    None,
                    Some(json!({ "from": from.as_str(), "to": to.as_str() })),
                ),
            AppError::EntryNotFound => ("ENTRY_NOT_FOUND", self.to_string(), None, None),
            AppError::AlreadyReversed(_) =>
                ("INTERNAL_ERROR", "Internal server error".to_string(), None, None),
            AppError::ConcurrentModification(_) =>
                (
                    "CONCURRENT_MODIFICATION",
                    "The resource was modified concurrently, please retry".to_string(),
                    None,
                    None,
                ),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg.clone(), None, None),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg.clone(), None, None),
        };

        ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
                details,
            },
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            | AppError::WalletNotFound
            | AppError::BankAccountNotFound
            | AppError::BankNotFound
            | AppError::CurrencyNotFound(_)
            | AppError::RateNotFound { .. }
            | AppError::WithdrawalNotFound
            | AppError::EntryNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientBalance { .. } | AppError::DailyLimitExceeded { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            | AppError::PinNotSet
            | AppError::PinAlreadySet
            | AppError::CannotDeleteDefault
            | AppError::InvalidTransition { .. }
            | AppError::WithdrawalExpired { .. }
            | AppError::ConcurrentModification(_) => StatusCode::CONFLICT,
            AppError::PinLocked { .. } => StatusCode::LOCKED,
            AppError::InvalidPin { .. } | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            | AppError::BankAccountNotOwned
            | AppError::WalletNotActive(_)
            | AppError::WithdrawalDisabled
            | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            | AppError::Database(_)
            | AppError::Encryption(_)
            | AppError::Config(_)
            | AppError::Internal(_)
            | AppError::AlreadyReversed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let response = self.to_error_response();
        (status, axum::Json(response)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
