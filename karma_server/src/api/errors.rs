//! Error responses and the mapping from domain errors to HTTP status codes.

use axum::{Json, http::StatusCode};
use karma_core::{ListingError, TradeError, WalletError};
use serde::{Deserialize, Serialize};

use crate::metrics;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler's result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn wallet_error(operation: &str, err: WalletError) -> ApiError {
    let status = match &err {
        WalletError::Store(e) => {
            tracing::error!(operation = operation, error = %e, "Wallet store failure");
            metrics::store_errors_total(operation);
            StatusCode::SERVICE_UNAVAILABLE
        }
        WalletError::InsufficientBalance { .. } => {
            metrics::ledger_rejections_total("insufficient");
            StatusCode::PAYMENT_REQUIRED
        }
        WalletError::RecipientNotFound(_) => StatusCode::NOT_FOUND,
        WalletError::InvalidAmount(_) | WalletError::SelfGift => {
            metrics::ledger_rejections_total("invalid");
            StatusCode::BAD_REQUEST
        }
        WalletError::BalanceOverflow => StatusCode::CONFLICT,
    };
    error_response(status, err.client_message())
}

pub fn trade_error(operation: &str, err: TradeError) -> ApiError {
    let status = match &err {
        TradeError::Store { step, source } => {
            tracing::error!(
                operation = operation,
                step = %step,
                error = %source,
                "Trade store failure, unit of work rolled back"
            );
            metrics::store_errors_total(operation);
            StatusCode::SERVICE_UNAVAILABLE
        }
        TradeError::InsufficientBalance { .. } => {
            metrics::ledger_rejections_total("insufficient");
            StatusCode::PAYMENT_REQUIRED
        }
        TradeError::ItemNotFound(_) | TradeError::EscrowNotFound(_) => StatusCode::NOT_FOUND,
        TradeError::SelfTrade | TradeError::MissingDisputeReason => StatusCode::BAD_REQUEST,
        TradeError::NotParticipant => StatusCode::FORBIDDEN,
        TradeError::InvalidState { .. } | TradeError::BalanceOverflow => StatusCode::CONFLICT,
    };
    error_response(status, err.client_message())
}

pub fn listing_error(operation: &str, err: ListingError) -> ApiError {
    let status = match &err {
        ListingError::Store(e) => {
            tracing::error!(operation = operation, error = %e, "Listing store failure");
            metrics::store_errors_total(operation);
            StatusCode::SERVICE_UNAVAILABLE
        }
        ListingError::InvalidListing(_) => StatusCode::BAD_REQUEST,
        ListingError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        ListingError::NotSeller => StatusCode::FORBIDDEN,
        ListingError::InvalidState { .. } => StatusCode::CONFLICT,
    };
    error_response(status, err.client_message())
}
