//! Trade manager: escrow-backed trade requests and their settlement.

use chrono::Utc;
use std::sync::Arc;

use super::errors::{AtStep, TradeError, TradeResult, TradeStep};
use super::models::{
    ChatOutcome, Escrow, EscrowId, EscrowOutcome, EscrowStatus, EscrowTransition, NewEscrow,
    Resolution, TradeReceipt,
};
use crate::db::{KarmaStore, StoreError, StoreTx};
use crate::items::{ItemId, ItemStatus};
use crate::wallet::ledger::{self, DebitOutcome};
use crate::wallet::{
    AccountId, DebitBucket, NewTransaction, Transaction, TransactionStatus, TransactionType,
    Wallet,
};

/// Trade manager
#[derive(Clone)]
pub struct TradeManager {
    store: Arc<dyn KarmaStore>,
}

impl TradeManager {
    /// Create a new trade manager
    pub fn new(store: Arc<dyn KarmaStore>) -> Self {
        Self { store }
    }

    /// Request an item, holding its karma value in escrow
    ///
    /// Logs a pending trade transaction, opens a held escrow, debits the
    /// buyer, reserves the item and opens the buyer/seller chat, all in one
    /// unit of work. If an open escrow already exists for this buyer and
    /// item, it is returned with `replayed` set and nothing is written.
    ///
    /// # Arguments
    ///
    /// * `buyer` - Requesting account
    /// * `item_id` - Item to trade for
    ///
    /// # Returns
    ///
    /// * `TradeResult<TradeReceipt>` - Everything the request produced
    pub async fn request_trade(&self, buyer: AccountId, item_id: ItemId) -> TradeResult<TradeReceipt> {
        let mut tx = self.store.begin().await.at(TradeStep::Begin)?;

        let item = tx
            .find_item(item_id)
            .await
            .at(TradeStep::Lookup)?
            .ok_or(TradeError::ItemNotFound(item_id))?;

        if let Some(escrow) = tx.find_open_escrow(item_id, buyer).await.at(TradeStep::Lookup)? {
            return self.replay(tx, escrow).await;
        }

        if item.status != ItemStatus::Available {
            return Err(TradeError::invalid_state("item", "available", item.status));
        }
        if item.seller_id == buyer {
            return Err(TradeError::SelfTrade);
        }

        let price = item.karma_value;
        let available = tx
            .find_wallet(buyer)
            .await
            .at(TradeStep::Lookup)?
            .map_or(0, |w| w.balance);
        if available < price {
            log::warn!(
                "Rejected trade request by {} for item {}: balance {} below {}",
                buyer,
                item_id,
                available,
                price
            );
            return Err(TradeError::InsufficientBalance {
                available,
                required: price,
            });
        }

        let transaction = tx
            .insert_transaction(NewTransaction {
                from_account: Some(buyer),
                to_account: Some(item.seller_id),
                item_id: Some(item_id),
                amount: price,
                transaction_type: TransactionType::Trade,
                status: TransactionStatus::Pending,
                description: Some(format!("Trade for {}", item.title)),
            })
            .await
            .at(TradeStep::InsertTransaction)?;

        let escrow = match tx
            .insert_escrow(NewEscrow {
                transaction_id: transaction.id,
                buyer_id: buyer,
                seller_id: item.seller_id,
                item_id,
                amount: price,
            })
            .await
        {
            Ok(escrow) => escrow,
            Err(StoreError::Conflict(_)) => {
                return Err(TradeError::invalid_state("escrow", "none open", "open"));
            }
            Err(source) => {
                return Err(TradeError::Store {
                    step: TradeStep::InsertEscrow,
                    source,
                });
            }
        };

        let buyer_wallet = match ledger::debit(tx.as_mut(), buyer, price, DebitBucket::Spent)
            .await
            .at(TradeStep::DebitBuyer)?
        {
            DebitOutcome::Debited(wallet) => wallet,
            DebitOutcome::Insufficient { available } => {
                return Err(TradeError::InsufficientBalance {
                    available,
                    required: price,
                });
            }
        };

        let reserved = tx
            .set_item_status(item_id, ItemStatus::Available, ItemStatus::Pending)
            .await
            .at(TradeStep::ReserveItem)?;
        if !reserved {
            return Err(TradeError::invalid_state("item", "available", "changed"));
        }

        let chat = ensure_chat_in(tx.as_mut(), item_id, buyer, item.seller_id).await?.chat;

        tx.commit().await.at(TradeStep::Commit)?;

        log::info!(
            "Trade requested: buyer {} item {} escrow {} amount {}",
            buyer,
            item_id,
            escrow.id,
            price
        );
        Ok(TradeReceipt {
            transaction,
            escrow,
            chat,
            buyer_wallet,
            replayed: false,
        })
    }

    async fn replay(&self, mut tx: Box<dyn StoreTx>, escrow: Escrow) -> TradeResult<TradeReceipt> {
        let transaction = load_transaction(tx.as_mut(), &escrow).await?;
        let buyer_wallet = ledger::ensure_wallet(tx.as_mut(), escrow.buyer_id)
            .await
            .at(TradeStep::Lookup)?;
        let chat = ensure_chat_in(tx.as_mut(), escrow.item_id, escrow.buyer_id, escrow.seller_id)
            .await?
            .chat;
        tx.commit().await.at(TradeStep::Commit)?;

        log::debug!(
            "Replayed trade request: buyer {} item {} escrow {}",
            escrow.buyer_id,
            escrow.item_id,
            escrow.id
        );
        Ok(TradeReceipt {
            transaction,
            escrow,
            chat,
            buyer_wallet,
            replayed: true,
        })
    }

    /// Buyer confirms receipt; pays the seller from a held or disputed escrow
    pub async fn release_escrow(&self, actor: AccountId, escrow_id: EscrowId) -> TradeResult<EscrowOutcome> {
        let mut tx = self.store.begin().await.at(TradeStep::Begin)?;
        let escrow = load_escrow(tx.as_mut(), escrow_id).await?;
        if actor != escrow.buyer_id {
            return Err(TradeError::NotParticipant);
        }
        let outcome = settle(tx.as_mut(), escrow).await?;
        tx.commit().await.at(TradeStep::Commit)?;
        log_outcome("released", &outcome);
        Ok(outcome)
    }

    /// Cancel a held escrow, or concede a disputed one as the seller
    ///
    /// Either participant may cancel while the escrow is held. Once disputed,
    /// only the seller may give the points back; otherwise an operator
    /// settles it through [`resolve_dispute`](Self::resolve_dispute). The
    /// buyer is credited, the item goes back on offer and a `refund`
    /// transaction is logged.
    pub async fn refund_escrow(&self, actor: AccountId, escrow_id: EscrowId) -> TradeResult<EscrowOutcome> {
        let mut tx = self.store.begin().await.at(TradeStep::Begin)?;
        let escrow = load_escrow(tx.as_mut(), escrow_id).await?;
        if actor != escrow.buyer_id && actor != escrow.seller_id {
            return Err(TradeError::NotParticipant);
        }
        if escrow.status == EscrowStatus::Disputed && actor != escrow.seller_id {
            return Err(TradeError::invalid_state("escrow", "held", escrow.status));
        }
        let outcome = refund(tx.as_mut(), escrow).await?;
        tx.commit().await.at(TradeStep::Commit)?;
        log_outcome("refunded", &outcome);
        Ok(outcome)
    }

    /// Flag a held escrow as disputed
    pub async fn open_dispute(
        &self,
        actor: AccountId,
        escrow_id: EscrowId,
        reason: &str,
    ) -> TradeResult<EscrowOutcome> {
        let mut tx = self.store.begin().await.at(TradeStep::Begin)?;
        let escrow = load_escrow(tx.as_mut(), escrow_id).await?;
        if actor != escrow.buyer_id && actor != escrow.seller_id {
            return Err(TradeError::NotParticipant);
        }
        if escrow.status != EscrowStatus::Held {
            return Err(TradeError::invalid_state("escrow", "held", escrow.status));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TradeError::MissingDisputeReason);
        }

        let escrow = transition(
            tx.as_mut(),
            &escrow,
            EscrowTransition {
                expected: EscrowStatus::Held,
                next: EscrowStatus::Disputed,
                released_at: None,
                dispute_reason: Some(reason.to_string()),
            },
        )
        .await?;
        let transaction = load_transaction(tx.as_mut(), &escrow).await?;
        let item_status = tx
            .find_item(escrow.item_id)
            .await
            .at(TradeStep::Lookup)?
            .map_or(ItemStatus::Pending, |item| item.status);
        tx.commit().await.at(TradeStep::Commit)?;

        log::info!("Escrow {} disputed by {}", escrow.id, actor);
        Ok(EscrowOutcome {
            escrow,
            transaction,
            item_status,
            credited_wallet: None,
        })
    }

    /// Settle a disputed escrow
    ///
    /// Callers are expected to restrict this to operators.
    pub async fn resolve_dispute(
        &self,
        escrow_id: EscrowId,
        resolution: Resolution,
    ) -> TradeResult<EscrowOutcome> {
        let mut tx = self.store.begin().await.at(TradeStep::Begin)?;
        let escrow = load_escrow(tx.as_mut(), escrow_id).await?;
        if escrow.status != EscrowStatus::Disputed {
            return Err(TradeError::invalid_state("escrow", "disputed", escrow.status));
        }

        let outcome = match resolution {
            Resolution::SellerWins => settle(tx.as_mut(), escrow).await?,
            Resolution::BuyerWins => refund(tx.as_mut(), escrow).await?,
        };
        tx.commit().await.at(TradeStep::Commit)?;
        log_outcome("resolved", &outcome);
        Ok(outcome)
    }

    /// Make sure a chat exists between the buyer and the item's seller
    pub async fn ensure_chat(&self, buyer: AccountId, item_id: ItemId) -> TradeResult<ChatOutcome> {
        let mut tx = self.store.begin().await.at(TradeStep::Begin)?;
        let item = tx
            .find_item(item_id)
            .await
            .at(TradeStep::Lookup)?
            .ok_or(TradeError::ItemNotFound(item_id))?;
        if item.seller_id == buyer {
            return Err(TradeError::SelfTrade);
        }

        let outcome = ensure_chat_in(tx.as_mut(), item_id, buyer, item.seller_id).await?;
        tx.commit().await.at(TradeStep::Commit)?;
        Ok(outcome)
    }

    /// Get an escrow by ID
    pub async fn escrow(&self, escrow_id: EscrowId) -> TradeResult<Escrow> {
        let mut tx = self.store.begin().await.at(TradeStep::Begin)?;
        load_escrow(tx.as_mut(), escrow_id).await
    }
}

fn log_outcome(action: &str, outcome: &EscrowOutcome) {
    log::info!(
        "Escrow {} {}: status {} item {} amount {}",
        outcome.escrow.id,
        action,
        outcome.escrow.status,
        outcome.escrow.item_id,
        outcome.escrow.amount
    );
}

async fn load_escrow(tx: &mut dyn StoreTx, escrow_id: EscrowId) -> TradeResult<Escrow> {
    tx.find_escrow(escrow_id)
        .await
        .at(TradeStep::Lookup)?
        .ok_or(TradeError::EscrowNotFound(escrow_id))
}

async fn load_transaction(tx: &mut dyn StoreTx, escrow: &Escrow) -> TradeResult<Transaction> {
    tx.find_transaction(escrow.transaction_id)
        .await
        .at(TradeStep::Lookup)?
        .ok_or_else(|| TradeError::Store {
            step: TradeStep::Lookup,
            source: StoreError::Corrupt(format!(
                "escrow {} references missing transaction {}",
                escrow.id, escrow.transaction_id
            )),
        })
}

async fn ensure_chat_in(
    tx: &mut dyn StoreTx,
    item_id: ItemId,
    buyer: AccountId,
    seller: AccountId,
) -> TradeResult<ChatOutcome> {
    if let Some(chat) = tx.find_chat(item_id, buyer).await.at(TradeStep::EnsureChat)? {
        return Ok(ChatOutcome {
            chat,
            created: false,
        });
    }
    let chat = tx
        .insert_chat(item_id, buyer, seller)
        .await
        .at(TradeStep::EnsureChat)?;
    Ok(ChatOutcome {
        chat,
        created: true,
    })
}

async fn transition(
    tx: &mut dyn StoreTx,
    escrow: &Escrow,
    change: EscrowTransition,
) -> TradeResult<Escrow> {
    let expected = change.expected;
    tx.transition_escrow(escrow.id, change)
        .await
        .at(TradeStep::UpdateEscrow)?
        .ok_or_else(|| TradeError::invalid_state("escrow", expected.as_str(), "changed"))
}

async fn credit(tx: &mut dyn StoreTx, account_id: AccountId, amount: i64) -> TradeResult<Wallet> {
    ledger::credit(tx, account_id, amount)
        .await
        .map_err(|e| TradeError::from_wallet(e, TradeStep::CreditWallet))
}

async fn set_transaction_status(
    tx: &mut dyn StoreTx,
    escrow: &Escrow,
    next: TransactionStatus,
) -> TradeResult<Transaction> {
    tx.set_transaction_status(escrow.transaction_id, TransactionStatus::Pending, next)
        .await
        .at(TradeStep::UpdateTransaction)?
        .ok_or_else(|| TradeError::invalid_state("transaction", "pending", "changed"))
}

async fn set_item_status(tx: &mut dyn StoreTx, escrow: &Escrow, next: ItemStatus) -> TradeResult<()> {
    let updated = tx
        .set_item_status(escrow.item_id, ItemStatus::Pending, next)
        .await
        .at(TradeStep::UpdateItem)?;
    if !updated {
        return Err(TradeError::invalid_state("item", "pending", "changed"));
    }
    Ok(())
}

/// Pay the seller: escrow released, transaction completed, item sold
async fn settle(tx: &mut dyn StoreTx, escrow: Escrow) -> TradeResult<EscrowOutcome> {
    if !escrow.status.is_open() {
        return Err(TradeError::invalid_state(
            "escrow",
            "held or disputed",
            escrow.status,
        ));
    }

    let escrow = transition(
        tx,
        &escrow,
        EscrowTransition {
            expected: escrow.status,
            next: EscrowStatus::Released,
            released_at: Some(Utc::now()),
            dispute_reason: None,
        },
    )
    .await?;
    let seller_wallet = credit(tx, escrow.seller_id, escrow.amount).await?;
    let transaction = set_transaction_status(tx, &escrow, TransactionStatus::Completed).await?;
    set_item_status(tx, &escrow, ItemStatus::Sold).await?;

    Ok(EscrowOutcome {
        escrow,
        transaction,
        item_status: ItemStatus::Sold,
        credited_wallet: Some(seller_wallet),
    })
}

/// Return the points to the buyer and put the item back on offer
async fn refund(tx: &mut dyn StoreTx, escrow: Escrow) -> TradeResult<EscrowOutcome> {
    if !escrow.status.is_open() {
        return Err(TradeError::invalid_state(
            "escrow",
            "held or disputed",
            escrow.status,
        ));
    }

    let escrow = transition(
        tx,
        &escrow,
        EscrowTransition {
            expected: escrow.status,
            next: EscrowStatus::Refunded,
            released_at: Some(Utc::now()),
            dispute_reason: None,
        },
    )
    .await?;
    let buyer_wallet = credit(tx, escrow.buyer_id, escrow.amount).await?;
    let transaction = set_transaction_status(tx, &escrow, TransactionStatus::Refunded).await?;
    set_item_status(tx, &escrow, ItemStatus::Available).await?;

    tx.insert_transaction(NewTransaction {
        from_account: None,
        to_account: Some(escrow.buyer_id),
        item_id: Some(escrow.item_id),
        amount: escrow.amount,
        transaction_type: TransactionType::Refund,
        status: TransactionStatus::Completed,
        description: Some(format!("Refund for escrow {}", escrow.id)),
    })
    .await
    .at(TradeStep::LogRefund)?;

    Ok(EscrowOutcome {
        escrow,
        transaction,
        item_status: ItemStatus::Available,
        credited_wallet: Some(buyer_wallet),
    })
}
