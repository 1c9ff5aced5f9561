use std::str::FromStr;

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{ Deserialize, Serialize };

use crate::error::AppError;

// ─── WalletStatus ───────────────────────────────────────────────────

/// Operational status of a wallet account.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum WalletStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "suspended")]
    Suspended,
    #[sea_orm(string_value = "frozen")]
    Frozen,
}

impl WalletStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletStatus::Active => "active",
            WalletStatus::Inactive => "inactive",
            WalletStatus::Suspended => "suspended",
            WalletStatus::Frozen => "frozen",
        }
    }
}

impl FromStr for WalletStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(WalletStatus::Active),
            "inactive" => Ok(WalletStatus::Inactive),
            "suspended" => Ok(WalletStatus::Suspended),
            "frozen" => Ok(WalletStatus::Frozen),
            _ => Err(AppError::InvalidInput(format!("Invalid wallet status: {}", s))),
        }
    }
}

// ─── EntryType ──────────────────────────────────────────────────────

/// Kind of balance-affecting event recorded in the ledger.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    #[sea_orm(string_value = "deposit")]
    Deposit,
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    #[sea_orm(string_value = "bonus")]
    Bonus,
    #[sea_orm(string_value = "refund")]
    Refund,
    #[sea_orm(string_value = "fee")]
    Fee,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "freeze")]
    Freeze,
    #[sea_orm(string_value = "unfreeze")]
    Unfreeze,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Deposit => "deposit",
            EntryType::Withdrawal => "withdrawal",
            EntryType::TransferIn => "transfer_in",
            EntryType::TransferOut => "transfer_out",
            EntryType::Bonus => "bonus",
            EntryType::Refund => "refund",
            EntryType::Fee => "fee",
            EntryType::Adjustment => "adjustment",
            EntryType::Freeze => "freeze",
            EntryType::Unfreeze => "unfreeze",
        }
    }

    /// Whether an entry of this type may move the balance in `direction`.
    /// Adjustments are the only type that can go either way.
    pub fn permits(&self, direction: EntryDirection) -> bool {
        match self {
            | EntryType::Deposit
            | EntryType::TransferIn
            | EntryType::Bonus
            | EntryType::Refund => direction == EntryDirection::Credit,
            EntryType::Withdrawal | EntryType::TransferOut | EntryType::Fee => {
                direction == EntryDirection::Debit
            }
            EntryType::Adjustment => {
                matches!(direction, EntryDirection::Credit | EntryDirection::Debit)
            }
            EntryType::Freeze => direction == EntryDirection::Hold,
            EntryType::Unfreeze => direction == EntryDirection::Release,
        }
    }
}

impl FromStr for EntryType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deposit" => Ok(EntryType::Deposit),
            "withdrawal" => Ok(EntryType::Withdrawal),
            "transfer_in" => Ok(EntryType::TransferIn),
            "transfer_out" => Ok(EntryType::TransferOut),
            "bonus" => Ok(EntryType::Bonus),
            "refund" => Ok(EntryType::Refund),
            "fee" => Ok(EntryType::Fee),
            "adjustment" => Ok(EntryType::Adjustment),
            "freeze" => Ok(EntryType::Freeze),
            "unfreeze" => Ok(EntryType::Unfreeze),
            _ => Err(AppError::InvalidInput(format!("Invalid entry type: {}", s))),
        }
    }
}

// ─── EntryDirection ─────────────────────────────────────────────────

/// How an entry moves money: credits and debits change `balance`,
/// holds and releases change `frozen_balance`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum EntryDirection {
    #[sea_orm(string_value = "credit")]
    Credit,
    #[sea_orm(string_value = "debit")]
    Debit,
    #[sea_orm(string_value = "hold")]
    Hold,
    #[sea_orm(string_value = "release")]
    Release,
}

impl EntryDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryDirection::Credit => "credit",
            EntryDirection::Debit => "debit",
            EntryDirection::Hold => "hold",
            EntryDirection::Release => "release",
        }
    }
}

// ─── EntryStatus ────────────────────────────────────────────────────

/// Status of a ledger entry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Processing => "processing",
            EntryStatus::Completed => "completed",
            EntryStatus::Failed => "failed",
            EntryStatus::Cancelled => "cancelled",
            EntryStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EntryStatus::Pending | EntryStatus::Processing)
    }
}

impl FromStr for EntryStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(EntryStatus::Pending),
            "processing" => Ok(EntryStatus::Processing),
            "completed" => Ok(EntryStatus::Completed),
            "failed" => Ok(EntryStatus::Failed),
            "cancelled" => Ok(EntryStatus::Cancelled),
            "expired" => Ok(EntryStatus::Expired),
            _ => Err(AppError::InvalidInput(format!("Invalid entry status: {}", s))),
        }
    }
}

// ─── ReferenceType ──────────────────────────────────────────────────

/// External workflow object a ledger entry can point at.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    #[sea_orm(string_value = "withdrawal_request")]
    WithdrawalRequest,
}

// ─── WithdrawalStatus ───────────────────────────────────────────────

/// Life cycle of a withdrawal request.
///
/// `can_transition_to` is the single source of truth for the state machine;
/// every status change in the workflow goes through it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
            WithdrawalStatus::Rejected => "rejected",
            WithdrawalStatus::Cancelled => "cancelled",
            WithdrawalStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            WithdrawalStatus::Pending | WithdrawalStatus::Approved | WithdrawalStatus::Processing
        )
    }

    pub fn non_terminal() -> &'static [WithdrawalStatus] {
        &[WithdrawalStatus::Pending, WithdrawalStatus::Approved, WithdrawalStatus::Processing]
    }

    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;

        matches!(
            (self, next),
            (Pending, Approved) |
                (Pending, Rejected) |
                (Pending, Cancelled) |
                (Pending, Expired) |
                (Approved, Processing) |
                (Approved, Expired) |
                (Processing, Completed) |
                (Processing, Failed) |
                (Processing, Expired)
        )
    }

    /// Terminal outcomes that hand the debited tokens back to the wallet.
    pub fn refunds_debit(&self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Failed |
                WithdrawalStatus::Rejected |
                WithdrawalStatus::Cancelled |
                WithdrawalStatus::Expired
        )
    }

    /// Status the withdrawal's debit entry takes when the request lands here.
    pub fn entry_status(&self) -> EntryStatus {
        match self {
            WithdrawalStatus::Pending | WithdrawalStatus::Approved => EntryStatus::Pending,
            WithdrawalStatus::Processing => EntryStatus::Processing,
            WithdrawalStatus::Completed => EntryStatus::Completed,
            WithdrawalStatus::Failed => EntryStatus::Failed,
            WithdrawalStatus::Rejected | WithdrawalStatus::Cancelled => EntryStatus::Cancelled,
            WithdrawalStatus::Expired => EntryStatus::Expired,
        }
    }
}

impl FromStr for WithdrawalStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "processing" => Ok(WithdrawalStatus::Processing),
            "completed" => Ok(WithdrawalStatus::Completed),
            "failed" => Ok(WithdrawalStatus::Failed),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            "cancelled" => Ok(WithdrawalStatus::Cancelled),
            "expired" => Ok(WithdrawalStatus::Expired),
            _ => Err(AppError::InvalidInput(format!("Invalid withdrawal status: {}", s))),
        }
    }
}

// ─── WithdrawalPriority ─────────────────────────────────────────────

/// Review priority. Stored as an integer so the admin queue sorts on it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalPriority {
    #[sea_orm(num_value = 0)]
    Low,
    #[sea_orm(num_value = 1)]
    Normal,
    #[sea_orm(num_value = 2)]
    High,
    #[sea_orm(num_value = 3)]
    Urgent,
}

// ─── BankAccountStatus ──────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
#[serde(rename_all = "snake_case")]
pub enum BankAccountStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "suspended")]
    Suspended,
    #[sea_orm(string_value = "pending_verification")]
    PendingVerification,
}

// ─── BankAccountType ────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum BankAccountType {
    #[sea_orm(string_value = "savings")]
    Savings,
    #[sea_orm(string_value = "current")]
    Current,
    #[sea_orm(string_value = "domiciliary")]
    Domiciliary,
}

impl FromStr for BankAccountType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "savings" => Ok(BankAccountType::Savings),
            "current" | "checking" => Ok(BankAccountType::Current),
            "domiciliary" => Ok(BankAccountType::Domiciliary),
            _ => Err(AppError::InvalidInput(format!(
                "Invalid account type: {}. Supported: savings, current, domiciliary",
                s
            ))),
        }
    }
}

// ─── Lifecycle ──────────────────────────────────────────────────────

/// Record lifecycle shared by reference data and bank accounts.
/// Archived rows stay in place so history keeps resolving.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "archived")]
    Archived,
}

// ─── Role ───────────────────────────────────────────────────────────

/// Caller role as reported by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::Unauthorized(format!("Unknown role: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [WithdrawalStatus; 8] = [
        WithdrawalStatus::Pending,
        WithdrawalStatus::Approved,
        WithdrawalStatus::Processing,
        WithdrawalStatus::Completed,
        WithdrawalStatus::Failed,
        WithdrawalStatus::Rejected,
        WithdrawalStatus::Cancelled,
        WithdrawalStatus::Expired,
    ];

    fn successors(from: WithdrawalStatus) -> Vec<WithdrawalStatus> {
        ALL.iter()
            .copied()
            .filter(|to| from.can_transition_to(*to))
            .collect()
    }

    #[test]
    fn test_pending_successors() {
        assert_eq!(successors(WithdrawalStatus::Pending), vec![
            WithdrawalStatus::Approved,
            WithdrawalStatus::Rejected,
            WithdrawalStatus::Cancelled,
            WithdrawalStatus::Expired
        ]);
    }

    #[test]
    fn test_terminal_states_are_closed() {
        for status in ALL.iter().filter(|s| s.is_terminal()) {
            assert!(successors(*status).is_empty(), "{:?} has successors", status);
        }
    }

    #[test]
    fn test_every_non_terminal_state_can_expire() {
        for status in WithdrawalStatus::non_terminal() {
            assert!(status.can_transition_to(WithdrawalStatus::Expired));
        }
    }

    #[test]
    fn test_refunding_outcomes() {
        let refunding: Vec<_> = ALL.iter()
            .copied()
            .filter(|s| s.refunds_debit())
            .collect();
        assert_eq!(refunding, vec![
            WithdrawalStatus::Failed,
            WithdrawalStatus::Rejected,
            WithdrawalStatus::Cancelled,
            WithdrawalStatus::Expired
        ]);
        assert!(refunding.iter().all(|s| s.is_terminal()));
    }

    #[test]
    fn test_entry_type_directions() {
        assert!(EntryType::Withdrawal.permits(EntryDirection::Debit));
        assert!(!EntryType::Withdrawal.permits(EntryDirection::Credit));
        assert!(EntryType::Refund.permits(EntryDirection::Credit));
        assert!(EntryType::Adjustment.permits(EntryDirection::Credit));
        assert!(EntryType::Adjustment.permits(EntryDirection::Debit));
        assert!(!EntryType::Adjustment.permits(EntryDirection::Hold));
        assert!(EntryType::Freeze.permits(EntryDirection::Hold));
        assert!(EntryType::Unfreeze.permits(EntryDirection::Release));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Pending".parse::<WithdrawalStatus>().unwrap(), WithdrawalStatus::Pending);
        assert_eq!("transfer_out".parse::<EntryType>().unwrap(), EntryType::TransferOut);
        assert!("paid".parse::<WithdrawalStatus>().is_err());
        assert!(matches!("root".parse::<Role>(), Err(AppError::Unauthorized(_))));
    }
}
