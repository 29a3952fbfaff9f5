//! Wallet manager: balances, rewards, gifts and history.

use std::sync::Arc;

use super::{
    errors::{WalletError, WalletResult},
    ledger::{self, DebitOutcome},
    models::{
        AccountId, DebitBucket, GiftReceipt, NewTransaction, Transaction, TransactionStatus,
        TransactionType, Wallet,
    },
};
use crate::db::KarmaStore;

/// History page size when the caller does not ask for one
pub const DEFAULT_HISTORY_LIMIT: i64 = 10;

/// Largest history page served
pub const MAX_HISTORY_LIMIT: i64 = 50;

/// Wallet manager
#[derive(Clone)]
pub struct WalletManager {
    store: Arc<dyn KarmaStore>,
    history_page: i64,
}

impl WalletManager {
    /// Create a new wallet manager
    ///
    /// # Arguments
    ///
    /// * `store` - Store backend
    pub fn new(store: Arc<dyn KarmaStore>) -> Self {
        Self {
            store,
            history_page: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Override the default history page size (clamped to `1..=50`)
    pub fn with_history_page_size(mut self, page: i64) -> Self {
        self.history_page = page.clamp(1, MAX_HISTORY_LIMIT);
        self
    }

    /// Get the account's wallet, creating a zero-balance one on first access
    pub async fn get_or_create(&self, account_id: AccountId) -> WalletResult<Wallet> {
        let mut tx = self.store.begin().await?;
        let wallet = ledger::ensure_wallet(tx.as_mut(), account_id).await?;
        tx.commit().await?;
        Ok(wallet)
    }

    /// Deduct karma from an account
    ///
    /// The debit only happens if the balance covers it; a completed `trade`
    /// transaction is logged with `reason` as its description.
    ///
    /// # Arguments
    ///
    /// * `account_id` - Account to debit
    /// * `amount` - Positive amount
    /// * `reason` - Human-readable description
    ///
    /// # Returns
    ///
    /// * `WalletResult<Wallet>` - Updated wallet or `InsufficientBalance`
    pub async fn deduct(
        &self,
        account_id: AccountId,
        amount: i64,
        reason: &str,
    ) -> WalletResult<Wallet> {
        ledger::validate_amount(amount)?;

        let mut tx = self.store.begin().await?;
        let outcome = ledger::debit(tx.as_mut(), account_id, amount, DebitBucket::Spent).await?;
        let wallet = match outcome.into_result(amount) {
            Ok(wallet) => wallet,
            Err(e) => {
                log::warn!("Rejected deduct of {} from account {}: {}", amount, account_id, e);
                return Err(e);
            }
        };

        tx.insert_transaction(NewTransaction {
            from_account: Some(account_id),
            to_account: None,
            item_id: None,
            amount,
            transaction_type: TransactionType::Trade,
            status: TransactionStatus::Completed,
            description: Some(reason.to_string()),
        })
        .await?;
        tx.commit().await?;

        log::info!("Deducted {} karma from account {}", amount, account_id);
        Ok(wallet)
    }

    /// Add karma to an account and log a completed `reward` transaction
    pub async fn add(&self, account_id: AccountId, amount: i64, reason: &str) -> WalletResult<Wallet> {
        ledger::validate_amount(amount)?;

        let mut tx = self.store.begin().await?;
        let wallet = ledger::credit(tx.as_mut(), account_id, amount).await?;
        tx.insert_transaction(NewTransaction {
            from_account: None,
            to_account: Some(account_id),
            item_id: None,
            amount,
            transaction_type: TransactionType::Reward,
            status: TransactionStatus::Completed,
            description: Some(reason.to_string()),
        })
        .await?;
        tx.commit().await?;

        log::info!("Added {} karma to account {}", amount, account_id);
        Ok(wallet)
    }

    /// Gift karma to another user by username
    ///
    /// Debits the sender, credits the recipient and logs one `gift`
    /// transaction in a single unit of work. The recipient's wallet is
    /// created if it does not exist yet.
    pub async fn gift(
        &self,
        from: AccountId,
        to_username: &str,
        amount: i64,
    ) -> WalletResult<GiftReceipt> {
        ledger::validate_amount(amount)?;

        let mut tx = self.store.begin().await?;
        let recipient = tx
            .find_account_by_username(to_username)
            .await?
            .ok_or_else(|| WalletError::RecipientNotFound(to_username.to_string()))?;
        if recipient.id == from {
            return Err(WalletError::SelfGift);
        }

        let sender = match ledger::debit(tx.as_mut(), from, amount, DebitBucket::Gifted).await? {
            DebitOutcome::Debited(wallet) => wallet,
            DebitOutcome::Insufficient { available } => {
                log::warn!(
                    "Rejected gift of {} from account {} to {}: balance {}",
                    amount,
                    from,
                    recipient.username,
                    available
                );
                return Err(WalletError::InsufficientBalance {
                    available,
                    required: amount,
                });
            }
        };
        ledger::credit(tx.as_mut(), recipient.id, amount).await?;

        let transaction = tx
            .insert_transaction(NewTransaction {
                from_account: Some(from),
                to_account: Some(recipient.id),
                item_id: None,
                amount,
                transaction_type: TransactionType::Gift,
                status: TransactionStatus::Completed,
                description: Some(format!("Gift to {}", recipient.username)),
            })
            .await?;
        tx.commit().await?;

        log::info!(
            "Account {} gifted {} karma to {} ({})",
            from,
            amount,
            recipient.username,
            recipient.id
        );
        Ok(GiftReceipt {
            sender,
            recipient,
            transaction,
        })
    }

    /// Transactions the account sent or received, newest first
    ///
    /// `limit` defaults to the configured page size and is capped at
    /// [`MAX_HISTORY_LIMIT`].
    pub async fn history(
        &self,
        account_id: AccountId,
        limit: Option<i64>,
    ) -> WalletResult<Vec<Transaction>> {
        let limit = limit
            .unwrap_or(self.history_page)
            .clamp(1, MAX_HISTORY_LIMIT);

        let mut tx = self.store.begin().await?;
        let history = tx.transaction_history(account_id, limit).await?;
        Ok(history)
    }
}
