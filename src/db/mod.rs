use std::future::Future;

use crate::error::{ AppError, Result };

pub mod entity;
pub use entity::*;

mod wallet_repository;
pub use wallet_repository::WalletRepository;

/// Attempts per unit of work before a version conflict is surfaced.
pub const MAX_CONFLICT_ATTEMPTS: u32 = 3;

/// Runs `unit` again when it loses an optimistic-concurrency race.
///
/// Each call of `unit` must open and commit its own transaction, so a
/// retry starts from freshly read rows.
pub async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut unit: F) -> Result<T>
    where F: FnMut() -> Fut, Fut: Future<Output = Result<T>>
{
    let mut attempt = 1;
    loop {
        match unit().await {
            Err(AppError::ConcurrentModification(what)) if attempt < MAX_CONFLICT_ATTEMPTS => {
                tracing::debug!(operation, attempt, resource = %what, "Version conflict, retrying");
                attempt += 1;
            }
            other => {
                return other;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{ AtomicU32, Ordering };

    #[tokio::test]
    async fn test_retries_conflicts_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_on_conflict("test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::ConcurrentModification("wallet".into()))
            } else {
                Ok(7)
            }
        }).await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry_on_conflict("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::ConcurrentModification("wallet".into()))
        }).await;

        assert!(matches!(result, Err(AppError::ConcurrentModification(_))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_CONFLICT_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry_on_conflict("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::WalletNotFound)
        }).await;

        assert!(matches!(result, Err(AppError::WalletNotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
