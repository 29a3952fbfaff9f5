//! Store trait definitions for testability and dependency injection.
//!
//! Managers never talk to a database directly. They open a unit of work with
//! [`KarmaStore::begin`], issue the data-access verbs on the returned
//! [`StoreTx`], and [`StoreTx::commit`] once every step has succeeded.
//! Dropping a `StoreTx` without committing discards all of its writes.

use async_trait::async_trait;

use super::errors::StoreResult;
use crate::items::{Item, ItemFilter, ItemId, ItemStatus, NewItem};
use crate::trade::{Chat, Escrow, EscrowId, EscrowTransition, NewEscrow};
use crate::valuation::CategoryActivity;
use crate::wallet::{
    Account, AccountId, DebitBucket, NewTransaction, Transaction, TransactionId,
    TransactionStatus, Wallet,
};

/// Entry point to a karma store backend
#[async_trait]
pub trait KarmaStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Check that the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// One atomic unit of work against the store
///
/// Conditional operations return `None`/`false` when their guard does not
/// match instead of failing; the caller decides what that means.
#[async_trait]
pub trait StoreTx: Send {
    /// Find an account by its public username
    async fn find_account_by_username(&mut self, username: &str) -> StoreResult<Option<Account>>;

    /// Get the wallet for an account
    async fn find_wallet(&mut self, account_id: AccountId) -> StoreResult<Option<Wallet>>;

    /// Insert a zero-balance wallet, returning the existing one if present
    async fn insert_wallet(&mut self, account_id: AccountId) -> StoreResult<Wallet>;

    /// Debit `amount` and book it against `bucket`, only if `balance >= amount`
    async fn debit_wallet(
        &mut self,
        account_id: AccountId,
        amount: i64,
        bucket: DebitBucket,
    ) -> StoreResult<Option<Wallet>>;

    /// Credit `amount` to the balance and `earned_total`
    async fn credit_wallet(&mut self, account_id: AccountId, amount: i64)
    -> StoreResult<Option<Wallet>>;

    /// Append a transaction log row
    async fn insert_transaction(&mut self, new: NewTransaction) -> StoreResult<Transaction>;

    /// Get a transaction by ID
    async fn find_transaction(&mut self, id: TransactionId) -> StoreResult<Option<Transaction>>;

    /// Change a transaction's status if it is currently `expected`
    async fn set_transaction_status(
        &mut self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> StoreResult<Option<Transaction>>;

    /// Transactions sent or received by an account, newest first
    async fn transaction_history(
        &mut self,
        account_id: AccountId,
        limit: i64,
    ) -> StoreResult<Vec<Transaction>>;

    /// Insert a listed item with status `available`
    async fn insert_item(&mut self, new: NewItem) -> StoreResult<Item>;

    /// Get an item by ID
    async fn find_item(&mut self, id: ItemId) -> StoreResult<Option<Item>>;

    /// Change an item's status if it is currently `expected`
    async fn set_item_status(
        &mut self,
        id: ItemId,
        expected: ItemStatus,
        next: ItemStatus,
    ) -> StoreResult<bool>;

    /// Available items matching `filter`, newest first
    async fn list_available_items(
        &mut self,
        filter: &ItemFilter,
        limit: i64,
    ) -> StoreResult<Vec<Item>>;

    /// Live listing and request counts for a category (case-insensitive)
    async fn category_activity(&mut self, category: &str) -> StoreResult<CategoryActivity>;

    /// Insert an escrow with status `held`
    async fn insert_escrow(&mut self, new: NewEscrow) -> StoreResult<Escrow>;

    /// Get an escrow by ID
    async fn find_escrow(&mut self, id: EscrowId) -> StoreResult<Option<Escrow>>;

    /// The held or disputed escrow for an (item, buyer) pair, if any
    async fn find_open_escrow(
        &mut self,
        item_id: ItemId,
        buyer_id: AccountId,
    ) -> StoreResult<Option<Escrow>>;

    /// Apply a compare-and-set status change to an escrow
    async fn transition_escrow(
        &mut self,
        id: EscrowId,
        change: EscrowTransition,
    ) -> StoreResult<Option<Escrow>>;

    /// The chat for an (item, buyer) pair, if any
    async fn find_chat(&mut self, item_id: ItemId, buyer_id: AccountId)
    -> StoreResult<Option<Chat>>;

    /// Insert the chat for an (item, buyer) pair, returning the existing one if present
    async fn insert_chat(
        &mut self,
        item_id: ItemId,
        buyer_id: AccountId,
        seller_id: AccountId,
    ) -> StoreResult<Chat>;

    /// Make every write of this unit visible
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
