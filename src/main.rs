use std::sync::Arc;

use anyhow::Context;
use migration::MigratorTrait;
use tower::ServiceBuilder;
use tower_http::{ cors::CorsLayer, trace::TraceLayer };
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };
use tru_wallet::Config;

use tru_wallet::crypto::{ Encryptor, PinHasher };
use tru_wallet::scheduler::ExpirySweeper;
use tru_wallet::services::{
    AdminService,
    BankAccountService,
    CurrencyService,
    LedgerService,
    SecurityService,
    WalletService,
    WithdrawalService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "tru_wallet=debug,tower_http=debug".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    tracing::info!(
        token = %config.withdrawal.token_code,
        fee_policy = ?config.fee_policy,
        "Starting tru-wallet"
    );

    // Initialize database connection
    let db = sea_orm::Database
        ::connect(&config.database_url).await
        .context("Failed to connect to the database")?;

    tracing::info!("Database connected successfully");

    // Run migrations
    migration::Migrator::up(&db, None).await.context("Failed to run migrations")?;

    tracing::info!("Migrations completed successfully");

    let encryptor = Arc::new(Encryptor::new(&config.encryption_key)?);
    let hasher = Arc::new(PinHasher::new(config.pin.hash)?);

    // Initialize services
    let ledger_service = Arc::new(LedgerService::new(db.clone()));
    let currency_service = Arc::new(CurrencyService::new(db.clone()));
    let security_service = Arc::new(
        SecurityService::new(db.clone(), hasher, config.pin.clone())
    );
    let bank_account_service = Arc::new(BankAccountService::new(db.clone(), encryptor));
    let wallet_service = Arc::new(
        WalletService::new(
            db.clone(),
            ledger_service.clone(),
            config.wallet.clone(),
            &config.withdrawal
        )
    );
    let withdrawal_service = Arc::new(
        WithdrawalService::new(
            db.clone(),
            currency_service.clone(),
            security_service.clone(),
            ledger_service.clone(),
            bank_account_service.clone(),
            config.fee_policy.clone(),
            config.withdrawal.clone()
        )
    );
    let admin_service = Arc::new(
        AdminService::new(
            db.clone(),
            withdrawal_service.clone(),
            ledger_service,
            currency_service.clone(),
            bank_account_service.clone()
        )
    );

    // Background expiry of stale withdrawal requests
    let sweeper = ExpirySweeper::new(
        withdrawal_service.clone(),
        std::time::Duration::from_secs(config.expiry_sweep_interval_secs)
    );
    tokio::spawn(sweeper.start());

    // Create app state
    let app_state = tru_wallet::api::AppState::new(
        wallet_service,
        security_service,
        currency_service,
        bank_account_service,
        withdrawal_service,
        admin_service
    );

    // Build application router
    let app = tru_wallet::api
        ::router(app_state)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive())
        );

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener
        ::bind(&addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
