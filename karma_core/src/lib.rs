//! # Karma Core
//!
//! A points economy for a second-hand marketplace. Sellers list items that
//! are priced in karma points, buyers request them with points held in
//! escrow, and users can gift points to each other.
//!
//! ## Architecture
//!
//! - **Valuation**: deterministic pricing from category, condition and
//!   brand, plus a bounded demand adjustment from an injected signal
//! - **Wallet**: per-account balances with running totals and an
//!   append-only transaction log
//! - **Trade**: escrow state machine from request through release,
//!   refund or dispute
//! - **Items**: server-side priced listings
//! - **Db**: the store seam, with PostgreSQL and in-memory backends
//!
//! Every balance change happens inside one store unit of work, so a
//! failure never leaves a half-applied trade or gift behind.
//!
//! ## Example
//!
//! ```no_run
//! use karma_core::db::InMemoryStore;
//! use karma_core::items::{ListingManager, NewListing};
//! use karma_core::trade::TradeManager;
//! use karma_core::valuation::{Condition, ValuationEngine};
//! use karma_core::wallet::WalletManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::new();
//!     let seller = store.add_account("sam").await;
//!     let buyer = store.add_account("bea").await;
//!     let store = Arc::new(store);
//!
//!     let listings = ListingManager::new(store.clone(), ValuationEngine::default());
//!     let wallets = WalletManager::new(store.clone());
//!     let trades = TradeManager::new(store);
//!
//!     let item = listings
//!         .list_item(
//!             seller,
//!             NewListing {
//!                 title: "Phone".to_string(),
//!                 description: None,
//!                 category: "electronics".to_string(),
//!                 condition: Condition::New,
//!                 brand: Some("apple".to_string()),
//!                 images: vec![],
//!                 location: None,
//!             },
//!         )
//!         .await?;
//!
//!     wallets.add(buyer, 1_000, "welcome bonus").await?;
//!     let receipt = trades.request_trade(buyer, item.id).await?;
//!     trades.release_escrow(buyer, receipt.escrow.id).await?;
//!     Ok(())
//! }
//! ```

/// Persistence: store traits, PostgreSQL and in-memory backends.
pub mod db;

/// Listed items and their server-side pricing.
pub mod items;

/// Escrow-backed trades.
pub mod trade;

/// Item valuation.
pub mod valuation;

/// Karma balances and the transaction log.
pub mod wallet;

pub use db::{InMemoryStore, KarmaStore, PgKarmaStore, StoreError};
pub use items::{Item, ListingError, ListingManager};
pub use trade::{TradeError, TradeManager};
pub use valuation::{ValuationBreakdown, ValuationEngine};
pub use wallet::{TradingMode, Wallet, WalletError, WalletManager};
