mod common;

use chrono::{ Duration, Utc };
use sea_orm::{ ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter };
use uuid::Uuid;

use common::{ TestContext, PIN };
use tru_wallet::db::{ wallet_account, WalletAccount };
use tru_wallet::services::security_service::PinState;
use tru_wallet::AppError;

#[tokio::test]
async fn test_set_pin_enables_withdrawals_once() {
    let ctx = TestContext::new().await;
    let user_id = Uuid::new_v4();
    ctx.wallets.create_wallet(user_id).await.unwrap();

    let wallet = ctx.wallets.get_wallet(user_id).await.unwrap();
    assert!(!wallet.withdrawal_enabled);
    assert_eq!(wallet.pin, PinState::Unset);

    assert!(matches!(ctx.security.set_pin(user_id, "12a4").await, Err(AppError::InvalidInput(_))));
    assert!(matches!(ctx.security.set_pin(user_id, "123").await, Err(AppError::InvalidInput(_))));

    ctx.security.set_pin(user_id, PIN).await.unwrap();
    let wallet = ctx.wallets.get_wallet(user_id).await.unwrap();
    assert!(wallet.withdrawal_enabled);
    assert!(wallet.can_withdraw);

    assert!(matches!(ctx.security.set_pin(user_id, "5678").await, Err(AppError::PinAlreadySet)));
}

#[tokio::test]
async fn test_verify_without_pin_is_rejected() {
    let ctx = TestContext::new().await;
    let user_id = Uuid::new_v4();
    ctx.wallets.create_wallet(user_id).await.unwrap();

    assert!(matches!(ctx.security.verify_pin(user_id, PIN).await, Err(AppError::PinNotSet)));
}

#[tokio::test]
async fn test_wrong_attempts_count_down_then_lock() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer().await;

    for remaining in (1..=4).rev() {
        let result = ctx.security.verify_pin(customer.user_id, "0000").await;
        match result {
            Err(AppError::InvalidPin { attempts_remaining }) => assert_eq!(attempts_remaining, remaining),
            other => panic!("expected invalid pin, got {other:?}"),
        }
    }

    // Fifth failure locks
    assert!(
        matches!(ctx.security.verify_pin(customer.user_id, "0000").await, Err(AppError::PinLocked { .. }))
    );

    // Even the right PIN is refused while locked
    assert!(
        matches!(ctx.security.verify_pin(customer.user_id, PIN).await, Err(AppError::PinLocked { .. }))
    );

    match ctx.security.get_pin_state(customer.user_id).await.unwrap() {
        PinState::Locked { until } => assert!(until > Utc::now() + Duration::minutes(29)),
        other => panic!("expected locked, got {other:?}"),
    }

    let wallet = ctx.wallets.get_wallet(customer.user_id).await.unwrap();
    assert!(!wallet.can_withdraw);
}

#[tokio::test]
async fn test_correct_pin_resets_counter() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer().await;

    for _ in 0..4 {
        let _ = ctx.security.verify_pin(customer.user_id, "0000").await;
    }
    let wallet = ctx.security.verify_pin(customer.user_id, PIN).await.unwrap();
    assert_eq!(wallet.pin_attempts, 0);
    assert!(wallet.pin_locked_until.is_none());

    assert!(
        matches!(
            ctx.security.verify_pin(customer.user_id, "0000").await,
            Err(AppError::InvalidPin { attempts_remaining: 4 })
        )
    );
}

#[tokio::test]
async fn test_lapsed_lock_starts_fresh_round() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer().await;

    for _ in 0..5 {
        let _ = ctx.security.verify_pin(customer.user_id, "0000").await;
    }

    WalletAccount::update_many()
        .set(wallet_account::ActiveModel {
            pin_locked_until: Set(Some(Utc::now() - Duration::minutes(1))),
            ..Default::default()
        })
        .filter(wallet_account::Column::Id.eq(customer.wallet_id))
        .exec(&ctx.db).await
        .unwrap();

    // One wrong attempt after the lock lapsed is the first of a new round
    assert!(
        matches!(
            ctx.security.verify_pin(customer.user_id, "0000").await,
            Err(AppError::InvalidPin { attempts_remaining: 4 })
        )
    );

    let wallet = ctx.security.verify_pin(customer.user_id, PIN).await.unwrap();
    assert_eq!(wallet.pin_attempts, 0);
    assert!(wallet.pin_locked_until.is_none());
}

#[tokio::test]
async fn test_change_pin_requires_current() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer().await;

    assert!(
        matches!(
            ctx.security.change_pin(customer.user_id, "9999", "5678").await,
            Err(AppError::InvalidPin { attempts_remaining: 4 })
        )
    );

    ctx.security.change_pin(customer.user_id, PIN, "5678").await.unwrap();

    assert!(ctx.security.verify_pin(customer.user_id, "5678").await.is_ok());
    assert!(
        matches!(
            ctx.security.verify_pin(customer.user_id, PIN).await,
            Err(AppError::InvalidPin { .. })
        )
    );
}

#[tokio::test]
async fn test_concurrent_guesses_cannot_exceed_limit() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer().await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let security = ctx.security.clone();
            let user_id = customer.user_id;
            tokio::spawn(async move { security.verify_pin(user_id, "0000").await })
        })
        .collect();

    let mut invalid = 0;
    let mut locked = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Err(AppError::InvalidPin { .. }) => {
                invalid += 1;
            }
            Err(AppError::PinLocked { .. }) => {
                locked += 1;
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    assert_eq!(invalid, 4);
    assert_eq!(locked, 4);

    let wallet = WalletAccount::find_by_id(customer.wallet_id).one(&ctx.db).await.unwrap().unwrap();
    assert_eq!(wallet.pin_attempts, 5);
    assert!(wallet.pin_locked_until.is_some());
}
