//! Escrow and chat data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::db::ParseEnumError;
use crate::items::{ItemId, ItemStatus};
use crate::wallet::{AccountId, Transaction, TransactionId, Wallet};

/// Escrow ID type
pub type EscrowId = Uuid;

/// Chat ID type
pub type ChatId = Uuid;

/// Points held for a trade until it settles or is refunded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: EscrowId,
    pub transaction_id: TransactionId,
    pub buyer_id: AccountId,
    pub seller_id: AccountId,
    pub item_id: ItemId,
    pub amount: i64,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub dispute_reason: Option<String>,
}

/// Escrow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Held,
    Released,
    Disputed,
    Refunded,
}

impl EscrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscrowStatus::Held => "held",
            EscrowStatus::Released => "released",
            EscrowStatus::Disputed => "disputed",
            EscrowStatus::Refunded => "refunded",
        }
    }

    /// Points are still earmarked and not yet paid out either way
    pub fn is_open(&self) -> bool {
        matches!(self, EscrowStatus::Held | EscrowStatus::Disputed)
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscrowStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "held" => Ok(EscrowStatus::Held),
            "released" => Ok(EscrowStatus::Released),
            "disputed" => Ok(EscrowStatus::Disputed),
            "refunded" => Ok(EscrowStatus::Refunded),
            other => Err(ParseEnumError::new("escrow status", other)),
        }
    }
}

/// New escrow row
#[derive(Debug, Clone)]
pub struct NewEscrow {
    pub transaction_id: TransactionId,
    pub buyer_id: AccountId,
    pub seller_id: AccountId,
    pub item_id: ItemId,
    pub amount: i64,
}

/// Compare-and-set change of an escrow's status
#[derive(Debug, Clone)]
pub struct EscrowTransition {
    pub expected: EscrowStatus,
    pub next: EscrowStatus,
    /// Set when the escrow closes (released or refunded)
    pub released_at: Option<DateTime<Utc>>,
    /// Replaces the stored reason when present
    pub dispute_reason: Option<String>,
}

/// Buyer/seller conversation about one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub item_id: ItemId,
    pub buyer_id: AccountId,
    pub seller_id: AccountId,
    pub created_at: DateTime<Utc>,
}

/// Result of ensuring a chat channel exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub chat: Chat,
    pub created: bool,
}

/// Everything a trade request produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub transaction: Transaction,
    pub escrow: Escrow,
    pub chat: Chat,
    pub buyer_wallet: Wallet,
    /// True when an identical open request already existed and was returned as-is
    pub replayed: bool,
}

/// State after an escrow closed or changed status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowOutcome {
    pub escrow: Escrow,
    pub transaction: Transaction,
    pub item_status: ItemStatus,
    /// Wallet credited by the settlement, if any
    pub credited_wallet: Option<Wallet>,
}

/// How a disputed escrow is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Points go to the seller, item is sold
    SellerWins,
    /// Points return to the buyer, item is relisted
    BuyerWins,
}
