pub mod config;
pub mod enums;
pub mod error;
pub mod metadata;
pub mod identity;
pub mod crypto;
pub mod db;
pub mod services;
pub mod api;
pub mod scheduler;

pub use config::Config;
pub use enums::{ EntryStatus, EntryType, WalletStatus, WithdrawalPriority, WithdrawalStatus };
pub use error::{ AppError, Result };
