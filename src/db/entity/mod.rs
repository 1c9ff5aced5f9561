pub mod bank;
pub mod bank_account;
pub mod currency;
pub mod exchange_rate;
pub mod ledger_entry;
pub mod wallet_account;
pub mod withdrawal_request;

pub use bank::Entity as Bank;
pub use bank_account::Entity as BankAccount;
pub use currency::Entity as Currency;
pub use exchange_rate::Entity as ExchangeRate;
pub use ledger_entry::Entity as LedgerEntry;
pub use wallet_account::Entity as WalletAccount;
pub use withdrawal_request::Entity as WithdrawalRequest;
