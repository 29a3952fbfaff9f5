//! Wallet ledger: per-account karma balances and the transaction log.
//!
//! This module implements:
//! - Guarded debits that never take a balance below zero
//! - Rewards and peer-to-peer gifts, each logged as one transaction
//! - Newest-first transaction history
//!
//! Every operation runs in a single store unit of work, so a failure
//! partway through leaves balances and the log untouched.
//!
//! ## Example
//!
//! ```no_run
//! use karma_core::db::InMemoryStore;
//! use karma_core::wallet::WalletManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::new();
//!     let alice = store.add_account("alice").await;
//!     store.add_account("bob").await;
//!
//!     let wallets = WalletManager::new(Arc::new(store));
//!     wallets.add(alice, 100, "welcome bonus").await?;
//!     let receipt = wallets.gift(alice, "bob", 25).await?;
//!     println!("Alice now has {} karma", receipt.sender.balance);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub(crate) mod ledger;
pub mod manager;
pub mod models;

pub use errors::{WalletError, WalletResult};
pub use manager::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, WalletManager};
pub use models::{
    Account, AccountId, DebitBucket, GiftReceipt, NewTransaction, Transaction, TransactionId,
    TransactionStatus, TransactionType, TradingMode, Wallet,
};
