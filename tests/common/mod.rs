#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::{ ConnectOptions, Database, DatabaseConnection };
use uuid::Uuid;

use tru_wallet::config::{ PinPolicy, WalletPolicy, WithdrawalPolicy };
use tru_wallet::crypto::{ Encryptor, PinHashPolicy, PinHasher };
use tru_wallet::enums::BankAccountType;
use tru_wallet::services::bank_account_service::{ NewBank, NewBankAccount };
use tru_wallet::services::currency_service::NewExchangeRate;
use tru_wallet::services::withdrawal_service::SubmitWithdrawal;
use tru_wallet::services::{
    AdminService,
    BankAccountService,
    CurrencyService,
    FeePolicy,
    LedgerService,
    SecurityService,
    WalletService,
    WithdrawalService,
};

pub const PIN: &str = "1234";

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

/// Compares amounts at cent precision; SQLite keeps decimals as floats.
pub fn assert_amount(actual: Decimal, expected: &str) {
    assert_eq!(actual.round_dp(2), dec(expected).round_dp(2), "amount mismatch");
}

pub struct TestContext {
    pub db: DatabaseConnection,
    pub ledger: Arc<LedgerService>,
    pub currencies: Arc<CurrencyService>,
    pub security: Arc<SecurityService>,
    pub bank_accounts: Arc<BankAccountService>,
    pub wallets: Arc<WalletService>,
    pub withdrawals: Arc<WithdrawalService>,
    pub admin: Arc<AdminService>,
}

/// A user with a funded wallet, a PIN and a saved bank account.
pub struct Customer {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub bank_account_id: Uuid,
}

impl TestContext {
    pub async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);

        let db = Database::connect(options).await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();

        let hasher = Arc::new(
            PinHasher::new(PinHashPolicy { memory_kib: 64, iterations: 1, parallelism: 1 }).unwrap()
        );
        let encryptor = Arc::new(Encryptor::new(&[7u8; 32]).unwrap());
        let pin_policy = PinPolicy {
            hash: PinHashPolicy { memory_kib: 64, iterations: 1, parallelism: 1 },
            ..PinPolicy::default()
        };
        let withdrawal_policy = WithdrawalPolicy::default();

        let ledger = Arc::new(LedgerService::new(db.clone()));
        let currencies = Arc::new(CurrencyService::new(db.clone()));
        let security = Arc::new(SecurityService::new(db.clone(), hasher, pin_policy));
        let bank_accounts = Arc::new(BankAccountService::new(db.clone(), encryptor));
        let wallets = Arc::new(
            WalletService::new(db.clone(), ledger.clone(), WalletPolicy::default(), &withdrawal_policy)
        );
        let withdrawals = Arc::new(
            WithdrawalService::new(
                db.clone(),
                currencies.clone(),
                security.clone(),
                ledger.clone(),
                bank_accounts.clone(),
                FeePolicy::Flat(Decimal::from(5)),
                withdrawal_policy
            )
        );
        let admin = Arc::new(
            AdminService::new(
                db.clone(),
                withdrawals.clone(),
                ledger.clone(),
                currencies.clone(),
                bank_accounts.clone()
            )
        );

        Self { db, ledger, currencies, security, bank_accounts, wallets, withdrawals, admin }
    }

    /// Context with the TRU -> NGN rate at 220.
    pub async fn with_naira_rate() -> Self {
        let ctx = Self::new().await;
        ctx.set_rate("220").await;
        ctx
    }

    pub async fn set_rate(&self, rate: &str) {
        self.currencies
            .set_rate(NewExchangeRate {
                from_currency: "TRU".into(),
                to_currency: "NGN".into(),
                rate: dec(rate),
                effective_from: None,
                effective_until: None,
                created_by: None,
            }).await
            .unwrap();
    }

    pub async fn add_bank(&self, code: &str) -> Uuid {
        let bank = self.bank_accounts
            .add_bank(NewBank {
                name: format!("Bank {}", code),
                code: code.into(),
                country: "NG".into(),
                currency_code: "NGN".into(),
                routing_code: None,
            }).await
            .unwrap();
        bank.id
    }

    pub async fn add_account(&self, user_id: Uuid, bank_id: Uuid, number: &str) -> Uuid {
        let account = self.bank_accounts
            .add_account(user_id, NewBankAccount {
                bank_id,
                account_number: number.into(),
                account_holder_name: "Ada Obi".into(),
                account_type: BankAccountType::Savings,
                make_default: false,
            }).await
            .unwrap();
        account.id
    }

    /// Wallet with the welcome balance and PIN "1234", plus one bank account.
    pub async fn customer(&self) -> Customer {
        let user_id = Uuid::new_v4();
        let wallet = self.wallets.create_wallet(user_id).await.unwrap();
        self.security.set_pin(user_id, PIN).await.unwrap();

        let bank_id = self.add_bank(&format!("B{}", &user_id.simple().to_string()[..6])).await;
        let bank_account_id = self.add_account(user_id, bank_id, "0123456789").await;

        Customer { user_id, wallet_id: wallet.id, bank_account_id }
    }

    pub fn withdrawal(&self, customer: &Customer, amount_local: &str) -> SubmitWithdrawal {
        SubmitWithdrawal {
            currency_code: "NGN".into(),
            amount_local: dec(amount_local),
            bank_account_id: customer.bank_account_id,
            pin: PIN.into(),
            metadata: None,
        }
    }
}
