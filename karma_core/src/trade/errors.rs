//! Trade error types.

use thiserror::Error;

use super::models::EscrowId;
use crate::db::StoreError;
use crate::items::ItemId;
use crate::wallet::WalletError;

/// Step of a trade unit of work, reported when the store fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStep {
    Begin,
    Lookup,
    InsertTransaction,
    InsertEscrow,
    DebitBuyer,
    ReserveItem,
    EnsureChat,
    CreditWallet,
    UpdateEscrow,
    UpdateTransaction,
    UpdateItem,
    LogRefund,
    Commit,
}

impl TradeStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStep::Begin => "begin",
            TradeStep::Lookup => "lookup",
            TradeStep::InsertTransaction => "insert_transaction",
            TradeStep::InsertEscrow => "insert_escrow",
            TradeStep::DebitBuyer => "debit_buyer",
            TradeStep::ReserveItem => "reserve_item",
            TradeStep::EnsureChat => "ensure_chat",
            TradeStep::CreditWallet => "credit_wallet",
            TradeStep::UpdateEscrow => "update_escrow",
            TradeStep::UpdateTransaction => "update_transaction",
            TradeStep::UpdateItem => "update_item",
            TradeStep::LogRefund => "log_refund",
            TradeStep::Commit => "commit",
        }
    }
}

impl std::fmt::Display for TradeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trade and escrow errors
#[derive(Debug, Error)]
pub enum TradeError {
    /// Buyer cannot cover the item's value
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Item not found
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// Escrow not found
    #[error("Escrow not found: {0}")]
    EscrowNotFound(EscrowId),

    /// Seller tried to buy their own item
    #[error("Cannot trade for your own item")]
    SelfTrade,

    /// Dispute opened without a reason
    #[error("A dispute needs a reason")]
    MissingDisputeReason,

    /// Entity is not in the status the operation requires
    #[error("Invalid {entity} state: expected {expected}, found {found}")]
    InvalidState {
        entity: &'static str,
        expected: String,
        found: String,
    },

    /// Caller may not act on this escrow
    #[error("Not allowed to act on this escrow")]
    NotParticipant,

    /// Credit would overflow a wallet
    #[error("Balance overflow")]
    BalanceOverflow,

    /// Store failed; the unit of work was rolled back
    #[error("Store error during {step}: {source}")]
    Store {
        step: TradeStep,
        #[source]
        source: StoreError,
    },
}

impl TradeError {
    pub(crate) fn invalid_state(
        entity: &'static str,
        expected: impl Into<String>,
        found: impl std::fmt::Display,
    ) -> Self {
        TradeError::InvalidState {
            entity,
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Map a wallet error raised inside a trade step
    pub(crate) fn from_wallet(err: WalletError, step: TradeStep) -> Self {
        match err {
            WalletError::Store(source) => TradeError::Store { step, source },
            WalletError::InsufficientBalance {
                available,
                required,
            } => TradeError::InsufficientBalance {
                available,
                required,
            },
            WalletError::BalanceOverflow => TradeError::BalanceOverflow,
            other => TradeError::Store {
                step,
                source: StoreError::Corrupt(other.to_string()),
            },
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            TradeError::Store { .. } => "Something went wrong, please try again".to_string(),
            TradeError::InsufficientBalance { .. } => "Insufficient Karma balance".to_string(),
            TradeError::ItemNotFound(_) => "Item not found".to_string(),
            TradeError::EscrowNotFound(_) => "Escrow not found".to_string(),
            TradeError::InvalidState { entity, .. } => {
                format!("This {entity} is no longer available for that action")
            }
            _ => self.to_string(),
        }
    }
}

/// Attach the failing step to a store result
pub(crate) trait AtStep<T> {
    fn at(self, step: TradeStep) -> TradeResult<T>;
}

impl<T> AtStep<T> for Result<T, StoreError> {
    fn at(self, step: TradeStep) -> TradeResult<T> {
        self.map_err(|source| TradeError::Store { step, source })
    }
}

/// Result type for trade operations
pub type TradeResult<T> = Result<T, TradeError>;
