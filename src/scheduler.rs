use std::sync::Arc;

use tokio::time::{ interval, Duration, MissedTickBehavior };
use tracing::{ debug, error, info };

use crate::services::WithdrawalService;

/// Periodically expires withdrawal requests that outlived their deadline,
/// refunding the reserved funds.
pub struct ExpirySweeper {
    withdrawals: Arc<WithdrawalService>,
    period: Duration,
}

impl ExpirySweeper {
    pub fn new(withdrawals: Arc<WithdrawalService>, period: Duration) -> Self {
        Self { withdrawals, period }
    }

    pub async fn start(self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period_secs = self.period.as_secs(), "Withdrawal expiry sweeper started");

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// One sweep. Errors are logged; the next tick tries again.
    pub async fn run_once(&self) -> usize {
        match self.withdrawals.expire_overdue().await {
            Ok(0) => {
                debug!("No overdue withdrawals");
                0
            }
            Ok(count) => {
                info!(count, "Expired overdue withdrawals");
                count
            }
            Err(e) => {
                error!(error = %e, "Withdrawal expiry sweep failed");
                0
            }
        }
    }
}
