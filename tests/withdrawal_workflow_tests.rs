mod common;

use chrono::{ Duration, Utc };
use sea_orm::{ ColumnTrait, EntityTrait, QueryFilter };
use uuid::Uuid;

use common::{ assert_amount, dec, TestContext };
use tru_wallet::db::{
    ledger_entry,
    wallet_account,
    withdrawal_request,
    LedgerEntry,
    WalletAccount,
    WithdrawalRequest,
};
use tru_wallet::enums::{ EntryDirection, EntryStatus, EntryType, WithdrawalPriority, WithdrawalStatus };
use tru_wallet::metadata::Metadata;
use tru_wallet::services::withdrawal_service::WithdrawalFilter;
use tru_wallet::AppError;

async fn force_overdue(ctx: &TestContext, request_id: Uuid) {
    WithdrawalRequest::update_many()
        .set(withdrawal_request::ActiveModel {
            expires_at: sea_orm::ActiveValue::Set(Utc::now() - Duration::hours(1)),
            ..Default::default()
        })
        .filter(withdrawal_request::Column::Id.eq(request_id))
        .exec(&ctx.db).await
        .unwrap();
}

#[tokio::test]
async fn test_quote_prices_local_amount_in_tokens() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    let quote = ctx.withdrawals.calculate(customer.user_id, "ngn", dec("22000")).await.unwrap();

    assert_eq!(quote.pricing.currency_code, "NGN");
    assert_amount(quote.pricing.amount_token, "100");
    assert_amount(quote.pricing.amount_local, "22000");
    assert_amount(quote.pricing.exchange_rate, "220");
    assert_amount(quote.pricing.fee_token, "5");
    assert_amount(quote.pricing.net_amount_token, "105");
    assert_amount(quote.available_balance, "500");

    // Quoting has no side effects
    let wallet = ctx.wallets.get_wallet(customer.user_id).await.unwrap();
    assert_amount(wallet.balance, "500");
}

#[tokio::test]
async fn test_submit_debits_wallet_and_reserves_daily_allowance() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    let request = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await
        .unwrap();

    assert_eq!(request.status, WithdrawalStatus::Pending);
    assert_eq!(request.priority, WithdrawalPriority::Normal);
    assert!(request.reference.starts_with("WDR-"));
    assert_eq!(request.account_number_last4, "6789");
    assert_amount(request.amount_token, "100");
    assert_amount(request.net_amount_token, "105");
    assert!(request.expires_at > Utc::now() + Duration::days(6));

    let wallet = ctx.wallets.get_wallet(customer.user_id).await.unwrap();
    assert_amount(wallet.balance, "395");
    assert_amount(wallet.daily_withdrawn_amount, "100");
    assert_eq!(wallet.withdrawal_count, 1);

    let debit = ctx.ledger.get_entry(request.debit_entry_id).await.unwrap();
    assert_eq!(debit.entry_type, EntryType::Withdrawal);
    assert_eq!(debit.direction, EntryDirection::Debit);
    assert_eq!(debit.status, EntryStatus::Pending);
    assert_amount(debit.amount, "105");
    assert_amount(debit.fee, "5");
    assert_amount(debit.net_amount, "100");
    assert_amount(debit.balance_before, "500");
    assert_amount(debit.balance_after, "395");
    assert_eq!(debit.reference_id, Some(request.id));
    assert_eq!(debit.currency_code.as_deref(), Some("NGN"));
}

#[tokio::test]
async fn test_rejection_refunds_but_keeps_daily_usage() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;
    let admin = Uuid::new_v4();

    let request = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await
        .unwrap();
    let rejected = ctx.withdrawals
        .reject(request.id, admin, "Name mismatch".into(), None).await
        .unwrap();

    assert_eq!(rejected.status, WithdrawalStatus::Rejected);
    assert_eq!(rejected.reviewed_by, Some(admin));
    assert_eq!(rejected.failure_reason.as_deref(), Some("Name mismatch"));

    let wallet = ctx.wallets.get_wallet(customer.user_id).await.unwrap();
    assert_amount(wallet.balance, "500");
    assert_amount(wallet.daily_withdrawn_amount, "100");

    let debit = ctx.ledger.get_entry(request.debit_entry_id).await.unwrap();
    assert_eq!(debit.status, EntryStatus::Cancelled);

    let refund = LedgerEntry::find()
        .filter(ledger_entry::Column::ReversesEntryId.eq(debit.id))
        .one(&ctx.db).await
        .unwrap()
        .unwrap();
    assert_eq!(refund.entry_type, EntryType::Refund);
    assert_eq!(refund.direction, EntryDirection::Credit);
    assert_amount(refund.amount, "105");
    assert_amount(refund.balance_after, "500");
}

#[tokio::test]
async fn test_full_payout_completes_debit_and_counts_usage() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;
    let admin = Uuid::new_v4();

    let request = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await
        .unwrap();
    ctx.withdrawals.approve(request.id, admin, Some("ok".into())).await.unwrap();

    let processing = ctx.withdrawals.begin_processing(request.id, admin, None).await.unwrap();
    assert_eq!(processing.status, WithdrawalStatus::Processing);
    assert_eq!(
        ctx.ledger.get_entry(request.debit_entry_id).await.unwrap().status,
        EntryStatus::Processing
    );

    let completed = ctx.withdrawals
        .complete(request.id, admin, "NIP-000123".into(), None).await
        .unwrap();
    assert_eq!(completed.status, WithdrawalStatus::Completed);
    assert_eq!(completed.transaction_reference.as_deref(), Some("NIP-000123"));
    assert!(completed.completed_at.is_some());

    let debit = ctx.ledger.get_entry(request.debit_entry_id).await.unwrap();
    assert_eq!(debit.status, EntryStatus::Completed);
    assert!(debit.processed_at.is_some());

    let wallet = ctx.wallets.get_wallet(customer.user_id).await.unwrap();
    assert_amount(wallet.balance, "395");
    assert_amount(wallet.total_withdrawn, "100");

    let accounts = ctx.bank_accounts.list_accounts(customer.user_id).await.unwrap();
    assert_eq!(accounts[0].usage_count, 1);
    assert!(accounts[0].last_used_at.is_some());
}

#[tokio::test]
async fn test_failed_payout_refunds() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;
    let admin = Uuid::new_v4();

    let request = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "11000")).await
        .unwrap();
    ctx.withdrawals.approve(request.id, admin, None).await.unwrap();
    ctx.withdrawals.begin_processing(request.id, admin, None).await.unwrap();

    let failed = ctx.withdrawals.fail(request.id, admin, "Bank timeout".into()).await.unwrap();
    assert_eq!(failed.status, WithdrawalStatus::Failed);

    let wallet = ctx.wallets.get_wallet(customer.user_id).await.unwrap();
    assert_amount(wallet.balance, "500");
    assert_eq!(
        ctx.ledger.get_entry(request.debit_entry_id).await.unwrap().status,
        EntryStatus::Failed
    );
}

#[tokio::test]
async fn test_user_can_cancel_only_pending_requests() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    let request = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await
        .unwrap();

    let stranger = Uuid::new_v4();
    assert!(
        matches!(ctx.withdrawals.cancel(stranger, request.id).await, Err(AppError::WithdrawalNotFound))
    );

    let cancelled = ctx.withdrawals.cancel(customer.user_id, request.id).await.unwrap();
    assert_eq!(cancelled.status, WithdrawalStatus::Cancelled);
    assert_amount(ctx.wallets.get_wallet(customer.user_id).await.unwrap().balance, "500");

    let again = ctx.withdrawals.cancel(customer.user_id, request.id).await;
    assert!(
        matches!(
            again,
            Err(AppError::InvalidTransition {
                from: WithdrawalStatus::Cancelled,
                to: WithdrawalStatus::Cancelled,
            })
        )
    );

    let approved = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await
        .unwrap();
    ctx.withdrawals.approve(approved.id, Uuid::new_v4(), None).await.unwrap();
    assert!(
        matches!(
            ctx.withdrawals.cancel(customer.user_id, approved.id).await,
            Err(AppError::InvalidTransition { .. })
        )
    );
}

#[tokio::test]
async fn test_invalid_transitions_leave_state_untouched() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;
    let admin = Uuid::new_v4();

    let request = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await
        .unwrap();

    let skip = ctx.withdrawals.complete(request.id, admin, "X".into(), None).await;
    assert!(
        matches!(
            skip,
            Err(AppError::InvalidTransition {
                from: WithdrawalStatus::Pending,
                to: WithdrawalStatus::Completed,
            })
        )
    );
    assert!(
        matches!(
            ctx.withdrawals.begin_processing(request.id, admin, None).await,
            Err(AppError::InvalidTransition { .. })
        )
    );

    let unchanged = ctx.withdrawals.find(request.id).await.unwrap();
    assert_eq!(unchanged.status, WithdrawalStatus::Pending);
    assert_amount(ctx.wallets.get_wallet(customer.user_id).await.unwrap().balance, "395");
}

#[tokio::test]
async fn test_expired_request_cannot_be_reviewed() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    let request = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await
        .unwrap();
    force_overdue(&ctx, request.id).await;

    let result = ctx.withdrawals.approve(request.id, Uuid::new_v4(), None).await;
    assert!(matches!(result, Err(AppError::WithdrawalExpired { .. })));

    let result = ctx.withdrawals.cancel(customer.user_id, request.id).await;
    assert!(matches!(result, Err(AppError::WithdrawalExpired { .. })));
}

#[tokio::test]
async fn test_expiry_sweep_refunds_exactly_once() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    let request = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await
        .unwrap();
    let untouched = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "2200")).await
        .unwrap();
    force_overdue(&ctx, request.id).await;

    let first = tokio::spawn({
        let withdrawals = ctx.withdrawals.clone();
        async move { withdrawals.expire_overdue().await }
    });
    let second = tokio::spawn({
        let withdrawals = ctx.withdrawals.clone();
        async move { withdrawals.expire_overdue().await }
    });
    let expired = first.await.unwrap().unwrap() + second.await.unwrap().unwrap();
    assert_eq!(expired, 1);

    // A later sweep finds nothing left to do
    assert_eq!(ctx.withdrawals.expire_overdue().await.unwrap(), 0);

    let request = ctx.withdrawals.find(request.id).await.unwrap();
    assert_eq!(request.status, WithdrawalStatus::Expired);
    assert_eq!(
        ctx.withdrawals.find(untouched.id).await.unwrap().status,
        WithdrawalStatus::Pending
    );

    let refunds = LedgerEntry::find()
        .filter(ledger_entry::Column::ReversesEntryId.eq(request.debit_entry_id))
        .all(&ctx.db).await
        .unwrap();
    assert_eq!(refunds.len(), 1);

    // 500 - 105 - 15 + 105
    let wallet = ctx.wallets.get_wallet(customer.user_id).await.unwrap();
    assert_amount(wallet.balance, "485");
    assert_eq!(
        ctx.ledger.get_entry(request.debit_entry_id).await.unwrap().status,
        EntryStatus::Expired
    );
}

#[tokio::test]
async fn test_concurrent_submissions_never_overdraw() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let withdrawals = ctx.withdrawals.clone();
        let request = ctx.withdrawal(&customer, "22000");
        let user_id = customer.user_id;
        handles.push(tokio::spawn(async move { withdrawals.submit(user_id, request).await }));
    }

    let mut accepted = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => {
                accepted += 1;
            }
            Err(AppError::InsufficientBalance { .. }) => {
                insufficient += 1;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(accepted, 4);
    assert_eq!(insufficient, 1);

    let wallet = ctx.wallets.get_wallet(customer.user_id).await.unwrap();
    assert_amount(wallet.balance, "80");
    assert_eq!(wallet.withdrawal_count, 4);
}

#[tokio::test]
async fn test_daily_limit_blocks_excess() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    WalletAccount::update_many()
        .set(wallet_account::ActiveModel {
            daily_withdrawal_limit: sea_orm::ActiveValue::Set(dec("150")),
            ..Default::default()
        })
        .filter(wallet_account::Column::Id.eq(customer.wallet_id))
        .exec(&ctx.db).await
        .unwrap();

    ctx.withdrawals.submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await.unwrap();

    let result = ctx.withdrawals.submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await;
    match result {
        Err(AppError::DailyLimitExceeded { limit, remaining }) => {
            assert_amount(limit, "150");
            assert_amount(remaining, "50");
        }
        other => panic!("expected daily limit error, got {other:?}"),
    }
}

async fn set_daily_window(ctx: &TestContext, wallet_id: Uuid, withdrawn: &str, reset_age: Duration) {
    WalletAccount::update_many()
        .set(wallet_account::ActiveModel {
            daily_withdrawal_limit: sea_orm::ActiveValue::Set(dec("150")),
            daily_withdrawn_amount: sea_orm::ActiveValue::Set(dec(withdrawn)),
            last_withdrawal_reset: sea_orm::ActiveValue::Set(Some(Utc::now() - reset_age)),
            ..Default::default()
        })
        .filter(wallet_account::Column::Id.eq(wallet_id))
        .exec(&ctx.db).await
        .unwrap();
}

#[tokio::test]
async fn test_daily_limit_resets_after_a_day() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    set_daily_window(&ctx, customer.wallet_id, "150", Duration::hours(25)).await;
    let before = Utc::now();
    ctx.withdrawals.submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await.unwrap();

    let wallet = WalletAccount::find_by_id(customer.wallet_id).one(&ctx.db).await.unwrap().unwrap();
    assert_amount(wallet.daily_withdrawn_amount, "100");
    assert!(wallet.last_withdrawal_reset.unwrap() >= before - Duration::seconds(1));
}

#[tokio::test]
async fn test_daily_limit_holds_within_the_day() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    set_daily_window(&ctx, customer.wallet_id, "150", Duration::hours(23)).await;
    let result = ctx.withdrawals.submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await;
    match result {
        Err(AppError::DailyLimitExceeded { limit, remaining }) => {
            assert_amount(limit, "150");
            assert_amount(remaining, "0");
        }
        other => panic!("expected daily limit error, got {other:?}"),
    }

    let wallet = WalletAccount::find_by_id(customer.wallet_id).one(&ctx.db).await.unwrap().unwrap();
    assert_amount(wallet.balance, "500");
    assert_amount(wallet.daily_withdrawn_amount, "150");
}

#[tokio::test]
async fn test_submit_rejects_reserved_metadata() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    let mut forged = ctx.withdrawal(&customer, "22000");
    forged.metadata = Some(Metadata::ManualAdjustment {
        reason: "self-approved".into(),
        admin_id: customer.user_id,
    });
    assert!(
        matches!(
            ctx.withdrawals.submit(customer.user_id, forged).await,
            Err(AppError::InvalidInput(_))
        )
    );
    let wallet = WalletAccount::find_by_id(customer.wallet_id).one(&ctx.db).await.unwrap().unwrap();
    assert_amount(wallet.balance, "500");
    assert_eq!(wallet.pin_attempts, 0);

    let mut tagged = ctx.withdrawal(&customer, "22000");
    let context = Metadata::ClientContext {
        ip_address: Some("10.0.0.1".into()),
        user_agent: None,
    };
    tagged.metadata = Some(context.clone());
    let request = ctx.withdrawals.submit(customer.user_id, tagged).await.unwrap();
    let stored = request.metadata.as_deref().map(Metadata::decode).transpose().unwrap();
    assert_eq!(stored, Some(context));
}

#[tokio::test]
async fn test_submit_rejects_unusable_inputs() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;
    let other = ctx.customer().await;

    let mut foreign = ctx.withdrawal(&customer, "22000");
    foreign.bank_account_id = other.bank_account_id;
    assert!(
        matches!(
            ctx.withdrawals.submit(customer.user_id, foreign).await,
            Err(AppError::BankAccountNotOwned)
        )
    );

    let mut unknown = ctx.withdrawal(&customer, "100");
    unknown.currency_code = "XOF".into();
    assert!(
        matches!(
            ctx.withdrawals.submit(customer.user_id, unknown).await,
            Err(AppError::CurrencyNotFound(_))
        )
    );

    assert!(
        matches!(
            ctx.withdrawals.submit(customer.user_id, ctx.withdrawal(&customer, "0")).await,
            Err(AppError::InvalidInput(_))
        )
    );

    let mut wrong_pin = ctx.withdrawal(&customer, "22000");
    wrong_pin.pin = "9999".into();
    assert!(
        matches!(
            ctx.withdrawals.submit(customer.user_id, wrong_pin).await,
            Err(AppError::InvalidPin { attempts_remaining: 4 })
        )
    );

    assert_amount(ctx.wallets.get_wallet(customer.user_id).await.unwrap().balance, "500");
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    let first = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "2200")).await
        .unwrap();
    ctx.withdrawals.submit(customer.user_id, ctx.withdrawal(&customer, "4400")).await.unwrap();
    ctx.withdrawals.cancel(customer.user_id, first.id).await.unwrap();

    let all = ctx.withdrawals.list(customer.user_id, &WithdrawalFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let pending = ctx.withdrawals
        .list(customer.user_id, &WithdrawalFilter {
            status: Some(WithdrawalStatus::Pending),
            ..Default::default()
        }).await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_amount(pending[0].amount_local, "4400");

    let queue = ctx.withdrawals.list_pending(10).await.unwrap();
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_sweeper_run_expires_overdue_requests() {
    let ctx = TestContext::with_naira_rate().await;
    let customer = ctx.customer().await;

    let request = ctx.withdrawals
        .submit(customer.user_id, ctx.withdrawal(&customer, "22000")).await
        .unwrap();
    ctx.withdrawals.approve(request.id, Uuid::new_v4(), None).await.unwrap();
    force_overdue(&ctx, request.id).await;

    let sweeper = tru_wallet::scheduler::ExpirySweeper::new(
        ctx.withdrawals.clone(),
        std::time::Duration::from_secs(60)
    );
    assert_eq!(sweeper.run_once().await, 1);
    assert_eq!(sweeper.run_once().await, 0);

    assert_eq!(ctx.withdrawals.find(request.id).await.unwrap().status, WithdrawalStatus::Expired);
    assert_amount(ctx.wallets.get_wallet(customer.user_id).await.unwrap().balance, "500");
}
