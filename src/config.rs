use std::env;
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;

use crate::crypto::PinHashPolicy;
use crate::services::fee_policy::FeePolicy;

/// Wallet provisioning and PIN defaults.
#[derive(Debug, Clone)]
pub struct WalletPolicy {
    pub welcome_amount: Decimal,
    pub default_daily_limit: Decimal,
    pub max_pin_attempts: i32,
}

impl Default for WalletPolicy {
    fn default() -> Self {
        Self {
            welcome_amount: Decimal::from(500),
            default_daily_limit: Decimal::from(100_000),
            max_pin_attempts: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PinPolicy {
    pub lockout: Duration,
    pub hash: PinHashPolicy,
}

impl Default for PinPolicy {
    fn default() -> Self {
        Self {
            lockout: Duration::minutes(30),
            hash: PinHashPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WithdrawalPolicy {
    /// Currency code of the platform token wallets are denominated in.
    pub token_code: String,
    pub ttl: Duration,
    pub high_priority_threshold: Decimal,
    pub daily_reset_window: Duration,
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self {
            token_code: "TRU".to_string(),
            ttl: Duration::days(7),
            high_priority_threshold: Decimal::from(10_000),
            daily_reset_window: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub encryption_key: Vec<u8>,
    pub wallet: WalletPolicy,
    pub pin: PinPolicy,
    pub withdrawal: WithdrawalPolicy,
    pub fee_policy: FeePolicy,
    pub expiry_sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;

        let encryption_key_hex = env::var("ENCRYPTION_KEY")?;
        let encryption_key = Self::parse_encryption_key(&encryption_key_hex)?;

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env_or("SERVER_PORT", 8080)?;

        let wallet_defaults = WalletPolicy::default();
        let wallet = WalletPolicy {
            welcome_amount: env_or("WELCOME_AMOUNT", wallet_defaults.welcome_amount)?,
            default_daily_limit: env_or(
                "DEFAULT_DAILY_WITHDRAWAL_LIMIT",
                wallet_defaults.default_daily_limit
            )?,
            max_pin_attempts: env_or("MAX_PIN_ATTEMPTS", wallet_defaults.max_pin_attempts)?,
        };

        if wallet.max_pin_attempts < 1 {
            return Err("MAX_PIN_ATTEMPTS must be at least 1".into());
        }
        if wallet.welcome_amount.is_sign_negative() {
            return Err("WELCOME_AMOUNT cannot be negative".into());
        }

        let hash_defaults = PinHashPolicy::default();
        let pin = PinPolicy {
            lockout: Duration::minutes(env_or("PIN_LOCKOUT_MINUTES", 30)?),
            hash: PinHashPolicy {
                memory_kib: env_or("PIN_HASH_MEMORY_KIB", hash_defaults.memory_kib)?,
                iterations: env_or("PIN_HASH_ITERATIONS", hash_defaults.iterations)?,
                parallelism: env_or("PIN_HASH_PARALLELISM", hash_defaults.parallelism)?,
            },
        };

        let withdrawal_defaults = WithdrawalPolicy::default();
        let withdrawal = WithdrawalPolicy {
            token_code: env::var("TOKEN_CODE")
                .map(|code| code.to_uppercase())
                .unwrap_or(withdrawal_defaults.token_code),
            ttl: Duration::days(env_or("WITHDRAWAL_TTL_DAYS", 7)?),
            high_priority_threshold: env_or(
                "HIGH_PRIORITY_THRESHOLD",
                withdrawal_defaults.high_priority_threshold
            )?,
            daily_reset_window: withdrawal_defaults.daily_reset_window,
        };

        let fee_policy = match env::var("WITHDRAWAL_FEE") {
            Ok(raw) => raw.parse::<FeePolicy>().map_err(|e| e.to_string())?,
            Err(_) => FeePolicy::default(),
        };

        let expiry_sweep_interval_secs = env_or("EXPIRY_SWEEP_INTERVAL_SECS", 300)?;

        Ok(Config {
            database_url,
            server_host,
            server_port,
            encryption_key,
            wallet,
            pin,
            withdrawal,
            fee_policy,
            expiry_sweep_interval_secs,
        })
    }

    fn parse_encryption_key(hex_key: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let key = hex::decode(hex_key.trim()).map_err(|_| "ENCRYPTION_KEY must be a valid hex string")?;

        if key.len() != 32 {
            return Err("ENCRYPTION_KEY must be 32 bytes (64 hex characters)".into());
        }

        Ok(key)
    }
}

/// Reads and parses `key`, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
    where T: FromStr, T::Err: std::fmt::Display
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| format!("{} is invalid: {}", key, e).into()),
        Err(_) => Ok(default),
    }
}
