use std::sync::Arc;

use axum::{ routing::{ get, post }, Router };

pub mod admin;
pub mod auth;
pub mod bank_account;
pub mod currency;
pub mod wallet;
pub mod withdrawal;

use crate::services::{
    AdminService,
    BankAccountService,
    CurrencyService,
    SecurityService,
    WalletService,
    WithdrawalService,
};

#[derive(Clone)]
pub struct AppState {
    pub wallet_service: Arc<WalletService>,
    pub security_service: Arc<SecurityService>,
    pub currency_service: Arc<CurrencyService>,
    pub bank_account_service: Arc<BankAccountService>,
    pub withdrawal_service: Arc<WithdrawalService>,
    pub admin_service: Arc<AdminService>,
}

impl AppState {
    pub fn new(
        wallet_service: Arc<WalletService>,
        security_service: Arc<SecurityService>,
        currency_service: Arc<CurrencyService>,
        bank_account_service: Arc<BankAccountService>,
        withdrawal_service: Arc<WithdrawalService>,
        admin_service: Arc<AdminService>
    ) -> Self {
        Self {
            wallet_service,
            security_service,
            currency_service,
            bank_account_service,
            withdrawal_service,
            admin_service,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Wallet
        .route("/api/wallet", get(wallet::get_wallet).post(wallet::create_wallet))
        .route("/api/wallet/pin", post(wallet::set_pin).put(wallet::change_pin))
        .route("/api/wallet/transactions", get(wallet::list_transactions))
        // Reference data
        .route("/api/currencies", get(currency::list_currencies))
        .route("/api/rates/{from}/{to}", get(currency::get_rate))
        .route("/api/banks", get(bank_account::list_banks))
        // Bank accounts
        .route(
            "/api/bank-accounts",
            get(bank_account::list_bank_accounts).post(bank_account::add_bank_account)
        )
        .route(
            "/api/bank-accounts/{id}",
            axum::routing
                ::patch(bank_account::update_bank_account)
                .delete(bank_account::delete_bank_account)
        )
        // Withdrawals
        .route("/api/withdrawals/calculate", post(withdrawal::calculate_withdrawal))
        .route(
            "/api/withdrawals",
            get(withdrawal::list_withdrawals).post(withdrawal::submit_withdrawal)
        )
        .route("/api/withdrawals/{id}", get(withdrawal::get_withdrawal))
        .route("/api/withdrawals/{id}/cancel", post(withdrawal::cancel_withdrawal))
        // Administration
        .route("/api/admin/withdrawals/pending", get(admin::list_pending_withdrawals))
        .route("/api/admin/withdrawals/{id}", get(admin::get_withdrawal))
        .route("/api/admin/withdrawals/{id}/review", post(admin::review_withdrawal))
        .route("/api/admin/withdrawals/{id}/processing", post(admin::begin_processing))
        .route("/api/admin/withdrawals/{id}/process", post(admin::process_withdrawal))
        .route("/api/admin/withdrawals/{id}/payout", get(admin::payout_details))
        .route("/api/admin/wallets/{user_id}/adjust", post(admin::adjust_wallet))
        .route("/api/admin/wallets/{user_id}/freeze", post(admin::freeze_wallet))
        .route("/api/admin/wallets/{user_id}/unfreeze", post(admin::unfreeze_wallet))
        .route("/api/admin/wallets/{user_id}/hold", post(admin::hold_funds))
        .route("/api/admin/wallets/{user_id}/release", post(admin::release_funds))
        .route("/api/admin/rates", post(admin::set_exchange_rate))
        .route("/api/admin/currencies", post(admin::add_currency))
        .route("/api/admin/banks", post(admin::add_bank))
        .route("/api/admin/bank-accounts/{id}/verify", post(admin::verify_bank_account))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
