//! Wallet and transaction log data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::db::ParseEnumError;

/// Account ID type (owned by the identity provider)
pub type AccountId = Uuid;

/// Transaction ID type
pub type TransactionId = Uuid;

/// Account as known to the karma economy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
}

/// Wallet model
///
/// `balance` moves only together with exactly one of the running totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub account_id: AccountId,
    pub balance: i64,
    pub earned_total: i64,
    pub spent_total: i64,
    pub gifted_total: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Fresh zero-balance wallet
    pub fn empty(account_id: AccountId) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            balance: 0,
            earned_total: 0,
            spent_total: 0,
            gifted_total: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Running total a debit is booked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitBucket {
    /// Trades and other purchases (`spent_total`)
    Spent,
    /// Peer-to-peer gifts (`gifted_total`)
    Gifted,
}

/// Transaction log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub from_account: Option<AccountId>,
    pub to_account: Option<AccountId>,
    pub item_id: Option<Uuid>,
    pub amount: i64,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New transaction log row
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub from_account: Option<AccountId>,
    pub to_account: Option<AccountId>,
    pub item_id: Option<Uuid>,
    pub amount: i64,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub description: Option<String>,
}

/// Transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Trade,
    Gift,
    Reward,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Trade => "trade",
            TransactionType::Gift => "gift",
            TransactionType::Reward => "reward",
            TransactionType::Refund => "refund",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trade" => Ok(TransactionType::Trade),
            "gift" => Ok(TransactionType::Gift),
            "reward" => Ok(TransactionType::Reward),
            "refund" => Ok(TransactionType::Refund),
            other => Err(ParseEnumError::new("transaction type", other)),
        }
    }
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(TransactionStatus::Completed),
            "pending" => Ok(TransactionStatus::Pending),
            "failed" => Ok(TransactionStatus::Failed),
            "refunded" => Ok(TransactionStatus::Refunded),
            other => Err(ParseEnumError::new("transaction status", other)),
        }
    }
}

/// Result of a successful gift
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftReceipt {
    pub sender: Wallet,
    pub recipient: Account,
    pub transaction: Transaction,
}

/// Whether the storefront prices in currency or karma points
///
/// Supplied by the caller's configuration; the ledger never stores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Cash,
    #[default]
    Karma,
}

impl FromStr for TradingMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(TradingMode::Cash),
            "karma" => Ok(TradingMode::Karma),
            other => Err(ParseEnumError::new("trading mode", other)),
        }
    }
}
