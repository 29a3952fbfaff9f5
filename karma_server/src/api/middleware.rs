//! Identity middleware for protected endpoints.
//!
//! Authentication happens upstream. The identity provider forwards the
//! caller's account ID in the `x-account-id` header, and this middleware
//! turns it into an [`AccountId`] request extension for handlers.
//!
//! # Extracting the Account ID
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use karma_core::wallet::AccountId;
//!
//! async fn protected_handler(Extension(account_id): Extension<AccountId>) -> String {
//!     format!("Acting as {}", account_id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use karma_core::wallet::AccountId;

use super::errors::{ApiError, error_response};

/// Header carrying the authenticated account ID
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Require a well-formed `x-account-id` header and inject it into extensions
///
/// - **Success**: injects `AccountId` and calls the next handler
/// - **Missing or malformed header**: `401 Unauthorized`
pub async fn identity_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let account_id = request
        .headers()
        .get(ACCOUNT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<AccountId>().ok());

    match account_id {
        Some(account_id) => {
            request.extensions_mut().insert(account_id);
            Ok(next.run(request).await)
        }
        None => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Missing or invalid account identity",
        )),
    }
}
