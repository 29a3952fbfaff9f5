//! Wallet API handlers.
//!
//! # Examples
//!
//! Gift karma to another user:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/wallet/gift \
//!   -H "x-account-id: 6f1c..." \
//!   -H "Content-Type: application/json" \
//!   -d '{"recipient_username": "bob", "amount": 25}'
//! ```

use axum::{
    Json,
    extract::{Extension, Query, State},
    http::StatusCode,
};
use karma_core::wallet::{AccountId, GiftReceipt, Transaction, Wallet};
use serde::Deserialize;

use super::AppState;
use super::errors::{ApiError, error_response, wallet_error};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GiftRequest {
    pub recipient_username: String,
    pub amount: i64,
}

/// Caller's wallet, created with a zero balance on first access
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
) -> Result<Json<Wallet>, ApiError> {
    state
        .wallets
        .get_or_create(account_id)
        .await
        .map(Json)
        .map_err(|e| wallet_error("get_wallet", e))
}

/// Caller's transactions, newest first
///
/// `limit` defaults to the configured page size and is capped at 50.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    state
        .wallets
        .history(account_id, query.limit)
        .await
        .map(Json)
        .map_err(|e| wallet_error("history", e))
}

/// Gift karma to another user by username
///
/// # Errors
///
/// - `400 Bad Request`: Non-positive amount or gift to self
/// - `402 Payment Required`: Balance does not cover the gift
/// - `404 Not Found`: No user with that username
/// - `409 Conflict`: Karma trading is disabled
/// - `503 Service Unavailable`: Store failure
pub async fn gift(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Json(request): Json<GiftRequest>,
) -> Result<Json<GiftReceipt>, ApiError> {
    if !state.karma_trading_enabled() {
        return Err(error_response(StatusCode::CONFLICT, "Karma trading is disabled"));
    }

    let receipt = state
        .wallets
        .gift(account_id, request.recipient_username.trim(), request.amount)
        .await
        .map_err(|e| wallet_error("gift", e))?;

    logging::log_ledger_event(
        "gift",
        Some(account_id),
        request.amount,
        &format!("Gift to {}", receipt.recipient.username),
    );
    metrics::gift_recorded(request.amount);
    Ok(Json(receipt))
}
