mod common;

use std::sync::atomic::{ AtomicU32, Ordering };

use rust_decimal::Decimal;
use sea_orm::{ ActiveValue::Set, TransactionTrait };
use uuid::Uuid;

use common::{ assert_amount, dec, TestContext };
use tru_wallet::db::{ retry_on_conflict, wallet_account, WalletRepository };
use tru_wallet::enums::{ EntryDirection, EntryStatus, EntryType };
use tru_wallet::identity::CurrentUser;
use tru_wallet::metadata::Metadata;
use tru_wallet::services::ledger_service::{ EntryDraft, Reversal, TransactionFilter };
use tru_wallet::AppError;

#[tokio::test]
async fn test_wallet_creation_is_idempotent() {
    let ctx = TestContext::new().await;
    let user_id = Uuid::new_v4();

    let first = ctx.wallets.create_wallet(user_id).await.unwrap();
    let second = ctx.wallets.create_wallet(user_id).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_amount(first.balance, "500");
    assert_eq!(ctx.ledger.count_entries(first.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_record_tracks_balances_and_metadata() {
    let ctx = TestContext::new().await;
    let user_id = Uuid::new_v4();
    let wallet = ctx.wallets.create_wallet(user_id).await.unwrap();

    let txn = ctx.db.begin().await.unwrap();
    let (entry, updated) = ctx.ledger
        .record(
            &txn,
            wallet.id,
            EntryDraft::credit(EntryType::Deposit, dec("120"))
                .with_fee(dec("20"))
                .with_description("Card top-up")
                .with_metadata(Metadata::ExternalReference {
                    system: "paystack".into(),
                    reference: "PSK-1".into(),
                })
        ).await
        .unwrap();
    txn.commit().await.unwrap();

    assert_eq!(entry.direction, EntryDirection::Credit);
    assert_eq!(entry.status, EntryStatus::Completed);
    assert_amount(entry.net_amount, "100");
    assert_amount(entry.balance_before, "500");
    assert_amount(entry.balance_after, "600");
    assert_amount(updated.total_deposited, "100");
    assert_eq!(updated.version, wallet.version + 1);

    let stored = Metadata::decode(entry.metadata.as_deref().unwrap()).unwrap();
    assert_eq!(stored, Metadata::ExternalReference {
        system: "paystack".into(),
        reference: "PSK-1".into(),
    });
}

#[tokio::test]
async fn test_record_rejects_bad_drafts() {
    let ctx = TestContext::new().await;
    let wallet = ctx.wallets.create_wallet(Uuid::new_v4()).await.unwrap();
    let txn = ctx.db.begin().await.unwrap();

    let zero = ctx.ledger.record(&txn, wallet.id, EntryDraft::credit(EntryType::Deposit, Decimal::ZERO)).await;
    assert!(matches!(zero, Err(AppError::InvalidInput(_))));

    let wrong_direction = ctx.ledger.record(
        &txn,
        wallet.id,
        EntryDraft::credit(EntryType::Withdrawal, dec("1"))
    ).await;
    assert!(matches!(wrong_direction, Err(AppError::InvalidInput(_))));

    let overdraw = ctx.ledger.record(
        &txn,
        wallet.id,
        EntryDraft::debit(EntryType::Adjustment, dec("500.01"))
    ).await;
    assert!(matches!(overdraw, Err(AppError::InsufficientBalance { .. })));

    let missing = ctx.ledger.record(
        &txn,
        Uuid::new_v4(),
        EntryDraft::credit(EntryType::Deposit, dec("1"))
    ).await;
    assert!(matches!(missing, Err(AppError::WalletNotFound)));

    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn test_reversal_is_applied_once() {
    let ctx = TestContext::new().await;
    let wallet = ctx.wallets.create_wallet(Uuid::new_v4()).await.unwrap();

    let txn = ctx.db.begin().await.unwrap();
    let (debit, _) = ctx.ledger
        .record(
            &txn,
            wallet.id,
            EntryDraft::debit(EntryType::Withdrawal, dec("105"))
                .with_fee(dec("5"))
                .with_status(EntryStatus::Pending)
        ).await
        .unwrap();
    txn.commit().await.unwrap();

    let reversal = Reversal { outcome: EntryStatus::Cancelled, reason: "Rejected".into() };

    let txn = ctx.db.begin().await.unwrap();
    let refund = ctx.ledger.reverse(&txn, debit.id, reversal.clone()).await.unwrap();
    txn.commit().await.unwrap();

    assert_eq!(refund.entry_type, EntryType::Refund);
    assert_eq!(refund.reverses_entry_id, Some(debit.id));
    assert_amount(refund.amount, "105");
    assert_amount(refund.balance_after, "500");

    let txn = ctx.db.begin().await.unwrap();
    let again = ctx.ledger.reverse(&txn, debit.id, reversal).await;
    txn.rollback().await.unwrap();
    assert!(matches!(again, Err(AppError::AlreadyReversed(id)) if id == debit.id));

    let settled = ctx.ledger.get_entry(debit.id).await.unwrap();
    assert_eq!(settled.status, EntryStatus::Cancelled);
    assert_eq!(ctx.ledger.count_entries(wallet.id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_hold_and_release_move_frozen_funds() {
    let ctx = TestContext::new().await;
    let admin = CurrentUser::admin(Uuid::new_v4());
    let user_id = Uuid::new_v4();
    ctx.wallets.create_wallet(user_id).await.unwrap();

    ctx.admin.hold_funds(&admin, user_id, dec("200"), "Chargeback review").await.unwrap();
    let wallet = ctx.wallets.get_wallet(user_id).await.unwrap();
    assert_amount(wallet.balance, "500");
    assert_amount(wallet.frozen_balance, "200");
    assert_amount(wallet.available_balance, "300");

    let over_release = ctx.admin.release_funds(&admin, user_id, dec("250"), "Too much").await;
    assert!(matches!(over_release, Err(AppError::InvalidInput(_))));

    let over_hold = ctx.admin.hold_funds(&admin, user_id, dec("301"), "Too much").await;
    assert!(matches!(over_hold, Err(AppError::InsufficientBalance { .. })));

    ctx.admin.release_funds(&admin, user_id, dec("200"), "Cleared").await.unwrap();
    let wallet = ctx.wallets.get_wallet(user_id).await.unwrap();
    assert_amount(wallet.frozen_balance, "0");
    assert_amount(wallet.available_balance, "500");
}

#[tokio::test]
async fn test_entry_deltas_reconcile_with_balance() {
    let ctx = TestContext::with_naira_rate().await;
    let admin = CurrentUser::admin(Uuid::new_v4());
    let customer = ctx.customer().await;

    ctx.admin.adjust_wallet(&admin, customer.user_id, dec("75.50"), "Promo").await.unwrap();
    let first = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await
        .unwrap();
    ctx.withdrawals.submit(customer.user_id, ctx.withdrawal(&customer, "4400")).await.unwrap();
    ctx.withdrawals.reject(first.id, admin.id, "Duplicate".into(), None).await.unwrap();
    ctx.admin.adjust_wallet(&admin, customer.user_id, dec("-10"), "Correction").await.unwrap();

    let entries = ctx.wallets
        .list_transactions(customer.user_id, &TransactionFilter::default()).await
        .unwrap();
    assert_eq!(entries.len(), 5);

    let delta: Decimal = entries.iter().map(|e| e.balance_delta()).sum();
    let wallet = ctx.wallets.get_wallet(customer.user_id).await.unwrap();
    assert_amount(wallet.balance, "540.50");
    assert_amount(dec("500") + delta, "540.50");

    let refunds = ctx.wallets
        .list_transactions(customer.user_id, &TransactionFilter {
            entry_type: Some(EntryType::Refund),
            ..Default::default()
        }).await
        .unwrap();
    assert_eq!(refunds.len(), 1);
}

#[tokio::test]
async fn test_stale_wallet_snapshot_is_rejected() {
    let ctx = TestContext::new().await;
    let admin = CurrentUser::admin(Uuid::new_v4());
    let customer = ctx.customer().await;

    let stale = WalletRepository::find_by_id(&ctx.db, customer.wallet_id).await.unwrap();
    ctx.admin.adjust_wallet(&admin, customer.user_id, dec("50"), "Goodwill credit").await.unwrap();

    let overwrite = wallet_account::ActiveModel {
        balance: Set(Decimal::ZERO),
        ..Default::default()
    };
    let result = WalletRepository::save_versioned(&ctx.db, &stale, overwrite).await;
    assert!(matches!(result, Err(AppError::ConcurrentModification(_))));

    let wallet = WalletRepository::find_by_id(&ctx.db, customer.wallet_id).await.unwrap();
    assert_amount(wallet.balance, "550");
    assert_eq!(wallet.version, stale.version + 1);
}

#[tokio::test]
async fn test_conflicting_save_retries_from_fresh_state() {
    let ctx = TestContext::new().await;
    let admin = CurrentUser::admin(Uuid::new_v4());
    let customer = ctx.customer().await;

    let stale = WalletRepository::find_by_id(&ctx.db, customer.wallet_id).await.unwrap();
    ctx.admin.adjust_wallet(&admin, customer.user_id, dec("50"), "Goodwill credit").await.unwrap();

    let attempts = AtomicU32::new(0);
    let (db, attempts_ref, stale_ref) = (&ctx.db, &attempts, &stale);
    let saved = retry_on_conflict("debit_wallet", || async move {
        let snapshot = if attempts_ref.fetch_add(1, Ordering::SeqCst) == 0 {
            stale_ref.clone()
        } else {
            WalletRepository::find_by_id(db, stale_ref.id).await?
        };
        let debit = wallet_account::ActiveModel {
            balance: Set(snapshot.balance - dec("20")),
            ..Default::default()
        };
        WalletRepository::save_versioned(db, &snapshot, debit).await
    }).await.unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_amount(saved.balance, "530");
    assert_eq!(saved.version, stale.version + 2);
}
