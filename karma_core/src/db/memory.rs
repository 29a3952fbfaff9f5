//! In-memory store for tests and local development.
//!
//! Units of work are serialized behind an async mutex and applied
//! copy-on-commit, so an uncommitted unit never leaks partial writes.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::repository::{KarmaStore, StoreTx};
use crate::items::{Item, ItemFilter, ItemId, ItemStatus, NewItem};
use crate::trade::{Chat, Escrow, EscrowId, EscrowStatus, EscrowTransition, NewEscrow};
use crate::valuation::CategoryActivity;
use crate::wallet::{
    Account, AccountId, DebitBucket, NewTransaction, Transaction, TransactionId,
    TransactionStatus, Wallet,
};

/// Store operation that can be made to fail on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Begin,
    InsertWallet,
    DebitWallet,
    CreditWallet,
    InsertTransaction,
    SetTransactionStatus,
    InsertItem,
    SetItemStatus,
    InsertEscrow,
    TransitionEscrow,
    InsertChat,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    wallets: HashMap<AccountId, Wallet>,
    /// Append order doubles as creation order
    transactions: Vec<Transaction>,
    items: HashMap<ItemId, Item>,
    /// Item IDs in listing order
    item_order: Vec<ItemId>,
    escrows: HashMap<EscrowId, Escrow>,
    chats: Vec<Chat>,
}

/// In-memory [`KarmaStore`]
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<AsyncMutex<MemoryState>>,
    fail_on: Arc<Mutex<Option<StoreOp>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account the way the identity provider would
    pub async fn add_account(&self, username: &str) -> AccountId {
        let id = Uuid::new_v4();
        self.state.lock().await.accounts.insert(
            id,
            Account {
                id,
                username: username.to_string(),
            },
        );
        id
    }

    /// Make every later unit of work fail at `op` with `StoreError::Unavailable`
    pub fn fail_on(&self, op: StoreOp) {
        *self.fail_on.lock().unwrap_or_else(|e| e.into_inner()) = Some(op);
    }

    /// Stop injecting failures
    pub fn clear_failure(&self) {
        *self.fail_on.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub async fn wallet(&self, account_id: AccountId) -> Option<Wallet> {
        self.state.lock().await.wallets.get(&account_id).cloned()
    }

    pub async fn wallets(&self) -> Vec<Wallet> {
        self.state.lock().await.wallets.values().cloned().collect()
    }

    pub async fn item(&self, item_id: ItemId) -> Option<Item> {
        self.state.lock().await.items.get(&item_id).cloned()
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().await.transactions.clone()
    }

    pub async fn escrows(&self) -> Vec<Escrow> {
        self.state.lock().await.escrows.values().cloned().collect()
    }

    pub async fn chats(&self) -> Vec<Chat> {
        self.state.lock().await.chats.clone()
    }

    fn injected_failure(&self) -> Option<StoreOp> {
        *self.fail_on.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KarmaStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let fail_on = self.injected_failure();
        if fail_on == Some(StoreOp::Begin) {
            return Err(injected(StoreOp::Begin));
        }
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_on,
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn injected(op: StoreOp) -> StoreError {
    StoreError::Unavailable(format!("injected failure at {op:?}"))
}

/// Unit of work over a private copy of the state
struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_on: Option<StoreOp>,
}

impl MemoryTx {
    fn check(&self, op: StoreOp) -> StoreResult<()> {
        if self.fail_on == Some(op) {
            Err(injected(op))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_account_by_username(&mut self, username: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .working
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_wallet(&mut self, account_id: AccountId) -> StoreResult<Option<Wallet>> {
        Ok(self.working.wallets.get(&account_id).cloned())
    }

    async fn insert_wallet(&mut self, account_id: AccountId) -> StoreResult<Wallet> {
        self.check(StoreOp::InsertWallet)?;
        Ok(self
            .working
            .wallets
            .entry(account_id)
            .or_insert_with(|| Wallet::empty(account_id))
            .clone())
    }

    async fn debit_wallet(
        &mut self,
        account_id: AccountId,
        amount: i64,
        bucket: DebitBucket,
    ) -> StoreResult<Option<Wallet>> {
        self.check(StoreOp::DebitWallet)?;
        let Some(wallet) = self.working.wallets.get_mut(&account_id) else {
            return Ok(None);
        };
        if wallet.balance < amount {
            return Ok(None);
        }
        wallet.balance -= amount;
        match bucket {
            DebitBucket::Spent => wallet.spent_total += amount,
            DebitBucket::Gifted => wallet.gifted_total += amount,
        }
        wallet.updated_at = Utc::now();
        Ok(Some(wallet.clone()))
    }

    async fn credit_wallet(
        &mut self,
        account_id: AccountId,
        amount: i64,
    ) -> StoreResult<Option<Wallet>> {
        self.check(StoreOp::CreditWallet)?;
        let Some(wallet) = self.working.wallets.get_mut(&account_id) else {
            return Ok(None);
        };
        wallet.balance += amount;
        wallet.earned_total += amount;
        wallet.updated_at = Utc::now();
        Ok(Some(wallet.clone()))
    }

    async fn insert_transaction(&mut self, new: NewTransaction) -> StoreResult<Transaction> {
        self.check(StoreOp::InsertTransaction)?;
        let transaction = Transaction {
            id: Uuid::new_v4(),
            from_account: new.from_account,
            to_account: new.to_account,
            item_id: new.item_id,
            amount: new.amount,
            transaction_type: new.transaction_type,
            status: new.status,
            description: new.description,
            created_at: Utc::now(),
        };
        self.working.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn find_transaction(&mut self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        Ok(self
            .working
            .transactions
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn set_transaction_status(
        &mut self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> StoreResult<Option<Transaction>> {
        self.check(StoreOp::SetTransactionStatus)?;
        Ok(self
            .working
            .transactions
            .iter_mut()
            .find(|t| t.id == id && t.status == expected)
            .map(|t| {
                t.status = next;
                t.clone()
            }))
    }

    async fn transaction_history(
        &mut self,
        account_id: AccountId,
        limit: i64,
    ) -> StoreResult<Vec<Transaction>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .working
            .transactions
            .iter()
            .rev()
            .filter(|t| t.from_account == Some(account_id) || t.to_account == Some(account_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_item(&mut self, new: NewItem) -> StoreResult<Item> {
        self.check(StoreOp::InsertItem)?;
        let now = Utc::now();
        let NewItem {
            seller_id,
            listing,
            valuation,
        } = new;
        let item = Item {
            id: Uuid::new_v4(),
            seller_id,
            title: listing.title,
            description: listing.description,
            category: listing.category,
            condition: listing.condition,
            brand: listing.brand,
            karma_value: valuation.total,
            valuation_breakdown: valuation,
            images: listing.images,
            status: ItemStatus::Available,
            location: listing.location,
            created_at: now,
            updated_at: now,
        };
        self.working.item_order.push(item.id);
        self.working.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn find_item(&mut self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.working.items.get(&id).cloned())
    }

    async fn set_item_status(
        &mut self,
        id: ItemId,
        expected: ItemStatus,
        next: ItemStatus,
    ) -> StoreResult<bool> {
        self.check(StoreOp::SetItemStatus)?;
        match self.working.items.get_mut(&id) {
            Some(item) if item.status == expected => {
                item.status = next;
                item.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_available_items(
        &mut self,
        filter: &ItemFilter,
        limit: i64,
    ) -> StoreResult<Vec<Item>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .working
            .item_order
            .iter()
            .rev()
            .filter_map(|id| self.working.items.get(id))
            .filter(|item| item.status == ItemStatus::Available && filter.matches(item))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn category_activity(&mut self, category: &str) -> StoreResult<CategoryActivity> {
        let key = category.trim().to_lowercase();
        let in_category = |item: &Item| item.category.trim().to_lowercase() == key;
        let available_listings = self
            .working
            .items
            .values()
            .filter(|item| in_category(item) && item.status == ItemStatus::Available)
            .count() as i64;
        let open_requests = self
            .working
            .escrows
            .values()
            .filter(|escrow| escrow.status == EscrowStatus::Held)
            .filter(|escrow| {
                self.working
                    .items
                    .get(&escrow.item_id)
                    .is_some_and(|item| in_category(item))
            })
            .count() as i64;
        Ok(CategoryActivity {
            available_listings,
            open_requests,
        })
    }

    async fn insert_escrow(&mut self, new: NewEscrow) -> StoreResult<Escrow> {
        self.check(StoreOp::InsertEscrow)?;
        let duplicate = self.working.escrows.values().any(|e| {
            e.item_id == new.item_id && e.buyer_id == new.buyer_id && e.status.is_open()
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "open escrow already exists for item {} and buyer {}",
                new.item_id, new.buyer_id
            )));
        }
        let escrow = Escrow {
            id: Uuid::new_v4(),
            transaction_id: new.transaction_id,
            buyer_id: new.buyer_id,
            seller_id: new.seller_id,
            item_id: new.item_id,
            amount: new.amount,
            status: EscrowStatus::Held,
            created_at: Utc::now(),
            released_at: None,
            dispute_reason: None,
        };
        self.working.escrows.insert(escrow.id, escrow.clone());
        Ok(escrow)
    }

    async fn find_escrow(&mut self, id: EscrowId) -> StoreResult<Option<Escrow>> {
        Ok(self.working.escrows.get(&id).cloned())
    }

    async fn find_open_escrow(
        &mut self,
        item_id: ItemId,
        buyer_id: AccountId,
    ) -> StoreResult<Option<Escrow>> {
        Ok(self
            .working
            .escrows
            .values()
            .find(|e| e.item_id == item_id && e.buyer_id == buyer_id && e.status.is_open())
            .cloned())
    }

    async fn transition_escrow(
        &mut self,
        id: EscrowId,
        change: EscrowTransition,
    ) -> StoreResult<Option<Escrow>> {
        self.check(StoreOp::TransitionEscrow)?;
        match self.working.escrows.get_mut(&id) {
            Some(escrow) if escrow.status == change.expected => {
                escrow.status = change.next;
                if change.released_at.is_some() {
                    escrow.released_at = change.released_at;
                }
                if change.dispute_reason.is_some() {
                    escrow.dispute_reason = change.dispute_reason;
                }
                Ok(Some(escrow.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn find_chat(
        &mut self,
        item_id: ItemId,
        buyer_id: AccountId,
    ) -> StoreResult<Option<Chat>> {
        Ok(self
            .working
            .chats
            .iter()
            .find(|c| c.item_id == item_id && c.buyer_id == buyer_id)
            .cloned())
    }

    async fn insert_chat(
        &mut self,
        item_id: ItemId,
        buyer_id: AccountId,
        seller_id: AccountId,
    ) -> StoreResult<Chat> {
        self.check(StoreOp::InsertChat)?;
        if let Some(existing) = self.find_chat(item_id, buyer_id).await? {
            return Ok(existing);
        }
        let chat = Chat {
            id: Uuid::new_v4(),
            item_id,
            buyer_id,
            seller_id,
            created_at: Utc::now(),
        };
        self.working.chats.push(chat.clone());
        Ok(chat)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.check(StoreOp::Commit)?;
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
