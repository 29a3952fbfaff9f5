//! Balance mutation helpers shared by every unit of work that moves karma.
//!
//! These run inside a caller-owned [`StoreTx`]; nothing here commits.

use super::errors::{WalletError, WalletResult};
use super::models::{AccountId, DebitBucket, Wallet};
use crate::db::{StoreError, StoreResult, StoreTx};

/// Outcome of a guarded debit
#[derive(Debug, Clone)]
pub(crate) enum DebitOutcome {
    Debited(Wallet),
    Insufficient { available: i64 },
}

impl DebitOutcome {
    /// Turn a rejected debit into [`WalletError::InsufficientBalance`]
    pub(crate) fn into_result(self, required: i64) -> WalletResult<Wallet> {
        match self {
            DebitOutcome::Debited(wallet) => Ok(wallet),
            DebitOutcome::Insufficient { available } => Err(WalletError::InsufficientBalance {
                available,
                required,
            }),
        }
    }
}

/// Amounts must be strictly positive
pub(crate) fn validate_amount(amount: i64) -> WalletResult<()> {
    if amount <= 0 {
        return Err(WalletError::InvalidAmount(amount));
    }
    Ok(())
}

/// Find the account's wallet, creating a zero-balance one if missing
pub(crate) async fn ensure_wallet(tx: &mut dyn StoreTx, account_id: AccountId) -> StoreResult<Wallet> {
    match tx.find_wallet(account_id).await? {
        Some(wallet) => Ok(wallet),
        None => tx.insert_wallet(account_id).await,
    }
}

/// Debit `amount` only if the balance covers it
pub(crate) async fn debit(
    tx: &mut dyn StoreTx,
    account_id: AccountId,
    amount: i64,
    bucket: DebitBucket,
) -> StoreResult<DebitOutcome> {
    let current = ensure_wallet(tx, account_id).await?;
    match tx.debit_wallet(account_id, amount, bucket).await? {
        Some(wallet) => Ok(DebitOutcome::Debited(wallet)),
        None => Ok(DebitOutcome::Insufficient {
            available: current.balance,
        }),
    }
}

/// Credit `amount` to balance and `earned_total`, rejecting overflow
pub(crate) async fn credit(
    tx: &mut dyn StoreTx,
    account_id: AccountId,
    amount: i64,
) -> WalletResult<Wallet> {
    let current = ensure_wallet(tx, account_id).await?;
    if current.balance.checked_add(amount).is_none()
        || current.earned_total.checked_add(amount).is_none()
    {
        return Err(WalletError::BalanceOverflow);
    }

    let wallet = tx.credit_wallet(account_id, amount).await?.ok_or_else(|| {
        StoreError::Conflict(format!("wallet {account_id} disappeared during credit"))
    })?;
    Ok(wallet)
}
