pub mod admin_service;
pub mod bank_account_service;
pub mod currency_service;
pub mod fee_policy;
pub mod ledger_service;
pub mod security_service;
pub mod wallet_service;
pub mod withdrawal_service;

pub use admin_service::AdminService;
pub use bank_account_service::BankAccountService;
pub use currency_service::CurrencyService;
pub use fee_policy::FeePolicy;
pub use ledger_service::LedgerService;
pub use security_service::SecurityService;
pub use wallet_service::WalletService;
pub use withdrawal_service::WithdrawalService;
