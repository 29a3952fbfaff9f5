//! Structured logging configuration.
//!
//! Library crates log through the `log` facade; `tracing-subscriber`
//! bridges those records so everything lands in one formatted stream.

use karma_core::wallet::AccountId;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Store calls slower than this are logged as warnings
pub const SLOW_STORE_OPERATION_MS: u64 = 100;

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use karma_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a completed ledger movement
///
/// # Example
///
/// ```
/// use karma_server::logging::log_ledger_event;
///
/// log_ledger_event("gift", Some(uuid::Uuid::new_v4()), 25, "Gift to bob");
/// ```
pub fn log_ledger_event(event_type: &str, account_id: Option<AccountId>, amount: i64, message: &str) {
    tracing::info!(
        event_type = event_type,
        account_id = ?account_id,
        amount = amount,
        "LEDGER: {}",
        message
    );
}

/// Log a request that was refused for authorization reasons
pub fn log_access_denied(account_id: AccountId, resource: &str, reason: &str) {
    tracing::warn!(
        account_id = %account_id,
        resource = resource,
        "ACCESS DENIED: {}",
        reason
    );
}

/// Log a store operation, warning when it was slow
pub fn log_store_operation(operation: &str, duration_ms: u64) {
    tracing::debug!(
        operation = operation,
        duration_ms = duration_ms,
        "Store operation"
    );

    if duration_ms > SLOW_STORE_OPERATION_MS {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Slow store operation detected"
        );
    }
}

/// Log API request/response
pub fn log_api_request(method: &str, path: &str, status_code: u16, duration_ms: u64) {
    tracing::info!(
        http_method = method,
        http_path = path,
        http_status = status_code,
        duration_ms = duration_ms,
        "API request completed"
    );
}
