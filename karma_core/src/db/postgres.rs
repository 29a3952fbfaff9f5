//! PostgreSQL store backed by sqlx.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, Row, Transaction as SqlxTransaction};
use uuid::Uuid;

use super::errors::StoreResult;
use super::repository::{KarmaStore, StoreTx};
use super::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_default_timeout, with_timeout};
use crate::items::{Item, ItemFilter, ItemId, ItemStatus, NewItem};
use crate::trade::{Chat, Escrow, EscrowId, EscrowTransition, NewEscrow};
use crate::valuation::{CategoryActivity, ValuationBreakdown};
use crate::wallet::{
    Account, AccountId, DebitBucket, NewTransaction, Transaction, TransactionId,
    TransactionStatus, Wallet,
};

const WALLET_COLUMNS: &str =
    "account_id, balance, earned_total, spent_total, gifted_total, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, from_account, to_account, item_id, amount, \
     transaction_type, status, description, created_at";

const ITEM_COLUMNS: &str = "id, seller_id, title, description, category, condition, brand, \
     karma_value, valuation_breakdown, images, status, location, created_at, updated_at";

const ESCROW_COLUMNS: &str = "id, transaction_id, buyer_id, seller_id, item_id, amount, \
     status, dispute_reason, created_at, released_at";

const CHAT_COLUMNS: &str = "id, item_id, buyer_id, seller_id, created_at";

/// PostgreSQL implementation of [`KarmaStore`]
#[derive(Clone)]
pub struct PgKarmaStore {
    pool: PgPool,
}

impl PgKarmaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KarmaStore for PgKarmaStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = with_timeout(DEFAULT_TRANSACTION_TIMEOUT, self.pool.begin()).await?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}

/// Unit of work over one database transaction
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PgStoreTx {
    tx: SqlxTransaction<'static, Postgres>,
}

/// Escape `LIKE` wildcards so user text matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn wallet_from_row(row: &PgRow) -> Wallet {
    Wallet {
        account_id: row.get("account_id"),
        balance: row.get("balance"),
        earned_total: row.get("earned_total"),
        spent_total: row.get("spent_total"),
        gifted_total: row.get("gifted_total"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    }
}

fn transaction_from_row(row: &PgRow) -> StoreResult<Transaction> {
    Ok(Transaction {
        id: row.get("id"),
        from_account: row.get("from_account"),
        to_account: row.get("to_account"),
        item_id: row.get("item_id"),
        amount: row.get("amount"),
        transaction_type: row.get::<String, _>("transaction_type").parse()?,
        status: row.get::<String, _>("status").parse()?,
        description: row.get("description"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}

fn item_from_row(row: &PgRow) -> StoreResult<Item> {
    let Json(valuation_breakdown) = row.get::<Json<ValuationBreakdown>, _>("valuation_breakdown");
    Ok(Item {
        id: row.get("id"),
        seller_id: row.get("seller_id"),
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        condition: row.get::<String, _>("condition").parse()?,
        brand: row.get("brand"),
        karma_value: row.get("karma_value"),
        valuation_breakdown,
        images: row.get("images"),
        status: row.get::<String, _>("status").parse()?,
        location: row.get("location"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    })
}

fn escrow_from_row(row: &PgRow) -> StoreResult<Escrow> {
    Ok(Escrow {
        id: row.get("id"),
        transaction_id: row.get("transaction_id"),
        buyer_id: row.get("buyer_id"),
        seller_id: row.get("seller_id"),
        item_id: row.get("item_id"),
        amount: row.get("amount"),
        status: row.get::<String, _>("status").parse()?,
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        released_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("released_at")
            .map(|dt| dt.and_utc()),
        dispute_reason: row.get("dispute_reason"),
    })
}

fn chat_from_row(row: &PgRow) -> Chat {
    Chat {
        id: row.get("id"),
        item_id: row.get("item_id"),
        buyer_id: row.get("buyer_id"),
        seller_id: row.get("seller_id"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn find_account_by_username(&mut self, username: &str) -> StoreResult<Option<Account>> {
        let row = with_default_timeout(
            sqlx::query("SELECT id, username FROM accounts WHERE username = $1")
                .bind(username)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.map(|row| Account {
            id: row.get("id"),
            username: row.get("username"),
        }))
    }

    async fn find_wallet(&mut self, account_id: AccountId) -> StoreResult<Option<Wallet>> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM karma_wallets WHERE account_id = $1");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(account_id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.as_ref().map(wallet_from_row))
    }

    async fn insert_wallet(&mut self, account_id: AccountId) -> StoreResult<Wallet> {
        // No-op update so RETURNING also yields a pre-existing row
        let sql = format!(
            "INSERT INTO karma_wallets (account_id) VALUES ($1)
             ON CONFLICT (account_id) DO UPDATE SET account_id = EXCLUDED.account_id
             RETURNING {WALLET_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(account_id)
                .fetch_one(&mut *self.tx),
        )
        .await?;

        Ok(wallet_from_row(&row))
    }

    async fn debit_wallet(
        &mut self,
        account_id: AccountId,
        amount: i64,
        bucket: DebitBucket,
    ) -> StoreResult<Option<Wallet>> {
        let counter = match bucket {
            DebitBucket::Spent => "spent_total",
            DebitBucket::Gifted => "gifted_total",
        };
        let sql = format!(
            "UPDATE karma_wallets
             SET balance = balance - $1, {counter} = {counter} + $1, updated_at = NOW()
             WHERE account_id = $2 AND balance >= $1
             RETURNING {WALLET_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(amount)
                .bind(account_id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.as_ref().map(wallet_from_row))
    }

    async fn credit_wallet(
        &mut self,
        account_id: AccountId,
        amount: i64,
    ) -> StoreResult<Option<Wallet>> {
        let sql = format!(
            "UPDATE karma_wallets
             SET balance = balance + $1, earned_total = earned_total + $1, updated_at = NOW()
             WHERE account_id = $2
             RETURNING {WALLET_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(amount)
                .bind(account_id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.as_ref().map(wallet_from_row))
    }

    async fn insert_transaction(&mut self, new: NewTransaction) -> StoreResult<Transaction> {
        let sql = format!(
            "INSERT INTO karma_transactions
                (id, from_account, to_account, item_id, amount, transaction_type, status, description)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {TRANSACTION_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(new.from_account)
                .bind(new.to_account)
                .bind(new.item_id)
                .bind(new.amount)
                .bind(new.transaction_type.as_str())
                .bind(new.status.as_str())
                .bind(&new.description)
                .fetch_one(&mut *self.tx),
        )
        .await?;

        transaction_from_row(&row)
    }

    async fn find_transaction(&mut self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM karma_transactions WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&mut *self.tx))
            .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn set_transaction_status(
        &mut self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> StoreResult<Option<Transaction>> {
        let sql = format!(
            "UPDATE karma_transactions SET status = $1
             WHERE id = $2 AND status = $3
             RETURNING {TRANSACTION_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(next.as_str())
                .bind(id)
                .bind(expected.as_str())
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn transaction_history(
        &mut self,
        account_id: AccountId,
        limit: i64,
    ) -> StoreResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM karma_transactions
             WHERE from_account = $1 OR to_account = $1
             ORDER BY seq DESC
             LIMIT $2"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(account_id)
                .bind(limit)
                .fetch_all(&mut *self.tx),
        )
        .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    async fn insert_item(&mut self, new: NewItem) -> StoreResult<Item> {
        let NewItem {
            seller_id,
            listing,
            valuation,
        } = new;
        let sql = format!(
            "INSERT INTO karma_items
                (id, seller_id, title, description, category, condition, brand,
                 karma_value, valuation_breakdown, images, location)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {ITEM_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(seller_id)
                .bind(&listing.title)
                .bind(&listing.description)
                .bind(&listing.category)
                .bind(listing.condition.as_str())
                .bind(&listing.brand)
                .bind(valuation.total)
                .bind(Json(&valuation))
                .bind(&listing.images)
                .bind(&listing.location)
                .fetch_one(&mut *self.tx),
        )
        .await?;

        item_from_row(&row)
    }

    async fn find_item(&mut self, id: ItemId) -> StoreResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM karma_items WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&mut *self.tx))
            .await?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn set_item_status(
        &mut self,
        id: ItemId,
        expected: ItemStatus,
        next: ItemStatus,
    ) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                "UPDATE karma_items SET status = $1, updated_at = NOW()
                 WHERE id = $2 AND status = $3",
            )
            .bind(next.as_str())
            .bind(id)
            .bind(expected.as_str())
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_available_items(
        &mut self,
        filter: &ItemFilter,
        limit: i64,
    ) -> StoreResult<Vec<Item>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM karma_items
             WHERE status = 'available'
               AND ($1::TEXT IS NULL OR LOWER(category) = $1)
               AND ($2::TEXT IS NULL OR condition = $2)
               AND ($3::TEXT IS NULL OR title ILIKE $3 OR description ILIKE $3)
             ORDER BY seq DESC
             LIMIT $4"
        );
        let pattern = filter
            .search
            .as_deref()
            .map(|search| format!("%{}%", escape_like(search)));
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(&filter.category)
                .bind(filter.condition.map(|c| c.as_str()))
                .bind(pattern)
                .bind(limit)
                .fetch_all(&mut *self.tx),
        )
        .await?;

        rows.iter().map(item_from_row).collect()
    }

    async fn category_activity(&mut self, category: &str) -> StoreResult<CategoryActivity> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT
                    (SELECT COUNT(*) FROM karma_items
                     WHERE LOWER(category) = LOWER(TRIM($1)) AND status = 'available')
                        AS available_listings,
                    (SELECT COUNT(*) FROM karma_escrow e
                     JOIN karma_items i ON i.id = e.item_id
                     WHERE LOWER(i.category) = LOWER(TRIM($1)) AND e.status = 'held')
                        AS open_requests",
            )
            .bind(category)
            .fetch_one(&mut *self.tx),
        )
        .await?;

        Ok(CategoryActivity {
            available_listings: row.get("available_listings"),
            open_requests: row.get("open_requests"),
        })
    }

    async fn insert_escrow(&mut self, new: NewEscrow) -> StoreResult<Escrow> {
        let sql = format!(
            "INSERT INTO karma_escrow (id, transaction_id, buyer_id, seller_id, item_id, amount)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ESCROW_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(new.transaction_id)
                .bind(new.buyer_id)
                .bind(new.seller_id)
                .bind(new.item_id)
                .bind(new.amount)
                .fetch_one(&mut *self.tx),
        )
        .await?;

        escrow_from_row(&row)
    }

    async fn find_escrow(&mut self, id: EscrowId) -> StoreResult<Option<Escrow>> {
        let sql = format!("SELECT {ESCROW_COLUMNS} FROM karma_escrow WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&mut *self.tx))
            .await?;

        row.as_ref().map(escrow_from_row).transpose()
    }

    async fn find_open_escrow(
        &mut self,
        item_id: ItemId,
        buyer_id: AccountId,
    ) -> StoreResult<Option<Escrow>> {
        let sql = format!(
            "SELECT {ESCROW_COLUMNS} FROM karma_escrow
             WHERE item_id = $1 AND buyer_id = $2 AND status IN ('held', 'disputed')
             FOR UPDATE"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(item_id)
                .bind(buyer_id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(escrow_from_row).transpose()
    }

    async fn transition_escrow(
        &mut self,
        id: EscrowId,
        change: EscrowTransition,
    ) -> StoreResult<Option<Escrow>> {
        let sql = format!(
            "UPDATE karma_escrow
             SET status = $1,
                 released_at = COALESCE($2, released_at),
                 dispute_reason = COALESCE($3, dispute_reason)
             WHERE id = $4 AND status = $5
             RETURNING {ESCROW_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(change.next.as_str())
                .bind(change.released_at.map(|dt| dt.naive_utc()))
                .bind(&change.dispute_reason)
                .bind(id)
                .bind(change.expected.as_str())
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(escrow_from_row).transpose()
    }

    async fn find_chat(
        &mut self,
        item_id: ItemId,
        buyer_id: AccountId,
    ) -> StoreResult<Option<Chat>> {
        let sql = format!("SELECT {CHAT_COLUMNS} FROM karma_chats WHERE item_id = $1 AND buyer_id = $2");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(item_id)
                .bind(buyer_id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.as_ref().map(chat_from_row))
    }

    async fn insert_chat(
        &mut self,
        item_id: ItemId,
        buyer_id: AccountId,
        seller_id: AccountId,
    ) -> StoreResult<Chat> {
        let sql = format!(
            "INSERT INTO karma_chats (id, item_id, buyer_id, seller_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (item_id, buyer_id) DO UPDATE SET item_id = EXCLUDED.item_id
             RETURNING {CHAT_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(item_id)
                .bind(buyer_id)
                .bind(seller_id)
                .fetch_one(&mut *self.tx),
        )
        .await?;

        Ok(chat_from_row(&row))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, self.tx.commit()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50% off_now"), "50\\% off\\_now");
        assert_eq!(escape_like("plain"), "plain");
    }
}
