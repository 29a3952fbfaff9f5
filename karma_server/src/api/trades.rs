//! Escrow API handlers.
//!
//! Buyers release their own escrows. Either party can cancel a held escrow
//! or dispute it; once disputed, only the seller can refund.
//! Disputes are settled by operator accounts listed in
//! `KARMA_OPERATOR_ACCOUNTS`.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use karma_core::trade::{Escrow, EscrowId, EscrowOutcome, Resolution};
use karma_core::wallet::AccountId;
use serde::Deserialize;

use super::AppState;
use super::errors::{ApiError, error_response, trade_error};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct DisputeRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub resolution: Resolution,
}

/// Escrow details, visible to its buyer, its seller and operators
pub async fn get_escrow(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Path(escrow_id): Path<EscrowId>,
) -> Result<Json<Escrow>, ApiError> {
    let escrow = state
        .trades
        .escrow(escrow_id)
        .await
        .map_err(|e| trade_error("get_escrow", e))?;

    let participant = escrow.buyer_id == account_id || escrow.seller_id == account_id;
    if !participant && !state.karma.is_operator(account_id) {
        logging::log_access_denied(account_id, &format!("escrow {}", escrow_id), "not a participant");
        return Err(error_response(
            StatusCode::FORBIDDEN,
            "Not a participant in this escrow",
        ));
    }

    Ok(Json(escrow))
}

/// Buyer confirms receipt; the seller is paid
pub async fn release_escrow(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Path(escrow_id): Path<EscrowId>,
) -> Result<Json<EscrowOutcome>, ApiError> {
    let outcome = state
        .trades
        .release_escrow(account_id, escrow_id)
        .await
        .map_err(|e| trade_error("release_escrow", e))?;
    record_settlement("release", &outcome);
    Ok(Json(outcome))
}

/// Cancel the trade and return the points to the buyer
pub async fn refund_escrow(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Path(escrow_id): Path<EscrowId>,
) -> Result<Json<EscrowOutcome>, ApiError> {
    let outcome = state
        .trades
        .refund_escrow(account_id, escrow_id)
        .await
        .map_err(|e| trade_error("refund_escrow", e))?;
    record_settlement("refund", &outcome);
    Ok(Json(outcome))
}

pub async fn open_dispute(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Path(escrow_id): Path<EscrowId>,
    Json(request): Json<DisputeRequest>,
) -> Result<Json<EscrowOutcome>, ApiError> {
    let outcome = state
        .trades
        .open_dispute(account_id, escrow_id, &request.reason)
        .await
        .map_err(|e| trade_error("open_dispute", e))?;

    tracing::info!(
        escrow_id = %escrow_id,
        account_id = %account_id,
        "Escrow disputed"
    );
    metrics::escrow_transitions_total(outcome.escrow.status.as_str());
    Ok(Json(outcome))
}

/// Settle a disputed escrow
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an operator
/// - `409 Conflict`: Escrow is not disputed
pub async fn resolve_dispute(
    State(state): State<AppState>,
    Extension(account_id): Extension<AccountId>,
    Path(escrow_id): Path<EscrowId>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<EscrowOutcome>, ApiError> {
    if !state.karma.is_operator(account_id) {
        logging::log_access_denied(account_id, &format!("escrow {}", escrow_id), "not an operator");
        return Err(error_response(
            StatusCode::FORBIDDEN,
            "Only operators can resolve disputes",
        ));
    }

    let outcome = state
        .trades
        .resolve_dispute(escrow_id, request.resolution)
        .await
        .map_err(|e| trade_error("resolve_dispute", e))?;
    record_settlement("resolve", &outcome);
    Ok(Json(outcome))
}

fn record_settlement(action: &str, outcome: &EscrowOutcome) {
    let escrow = &outcome.escrow;
    let credited = outcome.credited_wallet.as_ref().map(|w| w.account_id);
    logging::log_ledger_event(
        action,
        credited,
        escrow.amount,
        &format!("Escrow {} {}", escrow.id, escrow.status),
    );
    metrics::escrow_transitions_total(escrow.status.as_str());
    metrics::escrow_amount(escrow.amount);
}
