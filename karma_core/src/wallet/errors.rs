//! Wallet error types.

use thiserror::Error;

use crate::db::StoreError;

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Insufficient balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Gift recipient does not exist
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Sender and recipient are the same account
    #[error("Cannot gift karma to yourself")]
    SelfGift,

    /// Credit would overflow the balance or a running total
    #[error("Balance overflow")]
    BalanceOverflow,
}

impl WalletError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            WalletError::Store(_) => "Something went wrong, please try again".to_string(),
            WalletError::InsufficientBalance { .. } => "Insufficient Karma balance".to_string(),
            WalletError::RecipientNotFound(_) => "Recipient not found".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
