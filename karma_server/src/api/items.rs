//! Item API handlers: valuation preview, listings, chats and trade requests.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use karma_core::items::{Item, ItemFilter, ItemId, NewListing};
use karma_core::trade::{ChatOutcome, TradeReceipt};
use karma_core::valuation::{Condition, ValuationBreakdown, ValuationInput};
use karma_core::wallet::AccountId;
use serde::Deserialize;

use super::AppState;
use super::errors::{ApiError, error_response, listing_error, trade_error};
use crate::{logging, metrics};

/// Price an item without listing it
pub async fn preview_valuation(
    State(state): State<AppState>,
    Json(input): Json<ValuationInput>,
) -> Result<Json<ValuationBreakdown>, ApiError> {
    state
        .listings
        .preview(&input)
        .await
        .map(Json)
        .map_err(|e| listing_error("preview", e))
}

/// List an item; the price is computed server side
pub async fn create_item(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Json(listing): Json<NewListing>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let item = state
        .listings
        .list_item(account_id, listing)
        .await
        .map_err(|e| listing_error("list_item", e))?;

    metrics::listing_value(&item.category, item.karma_value);
    Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub category: Option<String>,
    pub condition: Option<Condition>,
    /// Text to find in the title or description
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// Karma market: available items, newest first
///
/// ```bash
/// curl "http://localhost:6969/api/v1/items?category=electronics&condition=good&q=phone&limit=20"
/// ```
pub async fn browse_items(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let filter = ItemFilter {
        category: query.category,
        condition: query.condition,
        search: query.q,
    };
    state
        .listings
        .browse(filter, query.limit)
        .await
        .map(Json)
        .map_err(|e| listing_error("browse", e))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
) -> Result<Json<Item>, ApiError> {
    state
        .listings
        .get_item(item_id)
        .await
        .map(Json)
        .map_err(|e| listing_error("get_item", e))
}

/// Seller withdraws an available listing
pub async fn remove_item(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Path(item_id): Path<ItemId>,
) -> Result<Json<Item>, ApiError> {
    state
        .listings
        .remove_item(account_id, item_id)
        .await
        .map(Json)
        .map_err(|e| listing_error("remove_item", e))
}

/// Open (or reopen) the chat with the item's seller
pub async fn ensure_chat(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Path(item_id): Path<ItemId>,
) -> Result<Json<ChatOutcome>, ApiError> {
    state
        .trades
        .ensure_chat(account_id, item_id)
        .await
        .map(Json)
        .map_err(|e| trade_error("ensure_chat", e))
}

/// Request an item, holding its karma value in escrow
///
/// # Response
///
/// - `201 Created` for a new request
/// - `200 OK` when an open request already existed and was replayed
///
/// # Errors
///
/// - `402 Payment Required`: Balance below the item's value
/// - `404 Not Found`: Item does not exist
/// - `409 Conflict`: Item not available, or karma trading disabled
pub async fn request_trade(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Path(item_id): Path<ItemId>,
) -> Result<(StatusCode, Json<TradeReceipt>), ApiError> {
    if !state.karma_trading_enabled() {
        return Err(error_response(StatusCode::CONFLICT, "Karma trading is disabled"));
    }

    let receipt = match state.trades.request_trade(account_id, item_id).await {
        Ok(receipt) => receipt,
        Err(e) => {
            metrics::trade_requests_total("rejected");
            return Err(trade_error("request_trade", e));
        }
    };

    if receipt.replayed {
        metrics::trade_requests_total("replayed");
        return Ok((StatusCode::OK, Json(receipt)));
    }

    metrics::trade_requests_total("created");
    metrics::escrow_amount(receipt.escrow.amount);
    logging::log_ledger_event(
        "trade_requested",
        Some(account_id),
        receipt.escrow.amount,
        &format!("Escrow {} held for item {}", receipt.escrow.id, item_id),
    );
    Ok((StatusCode::CREATED, Json(receipt)))
}
