//! HTTP API for the karma economy.
//!
//! # Modules
//!
//! - [`items`]: valuation preview, listings, chats and trade requests
//! - [`trades`]: escrow reads, release, refund and disputes
//! - [`wallet`]: balances, history and gifts
//! - [`middleware`]: identity extraction for protected endpoints
//! - [`request_id`]: request correlation
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                public
//! GET  /api/v1/config                         public
//! POST /api/v1/valuations                     public
//! GET  /api/v1/items?category&condition&q    public
//! GET  /api/v1/items/{item_id}                public
//! POST /api/v1/items                          x-account-id required
//! POST /api/v1/items/{item_id}/remove         x-account-id required
//! POST /api/v1/items/{item_id}/chat           x-account-id required
//! POST /api/v1/items/{item_id}/trade          x-account-id required
//! GET  /api/v1/wallet                         x-account-id required
//! GET  /api/v1/wallet/history?limit=N         x-account-id required
//! POST /api/v1/wallet/gift                    x-account-id required
//! GET  /api/v1/escrows/{escrow_id}            x-account-id required
//! POST /api/v1/escrows/{escrow_id}/release    x-account-id required
//! POST /api/v1/escrows/{escrow_id}/refund     x-account-id required
//! POST /api/v1/escrows/{escrow_id}/dispute    x-account-id required
//! POST /api/v1/escrows/{escrow_id}/resolve    operator only
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod errors;
pub mod items;
pub mod middleware;
pub mod request_id;
pub mod trades;
pub mod wallet;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use karma_core::{
    KarmaStore, ListingManager, TradeManager, TradingMode, ValuationEngine, WalletManager,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

use crate::config::KarmaConfig;
use crate::{logging, metrics};

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KarmaStore>,
    pub wallets: Arc<WalletManager>,
    pub trades: Arc<TradeManager>,
    pub listings: Arc<ListingManager>,
    pub karma: Arc<KarmaConfig>,
}

impl AppState {
    /// Build the managers over one store
    pub fn new(store: Arc<dyn KarmaStore>, karma: KarmaConfig) -> Self {
        let engine = ValuationEngine::new(karma.demand_signal());
        Self {
            wallets: Arc::new(
                WalletManager::new(store.clone()).with_history_page_size(karma.history_page),
            ),
            trades: Arc::new(TradeManager::new(store.clone())),
            listings: Arc::new(ListingManager::new(store.clone(), engine)),
            karma: Arc::new(karma),
            store,
        }
    }

    /// Karma trades and gifts only run in karma mode
    pub(crate) fn karma_trading_enabled(&self) -> bool {
        self.karma.trading_mode == TradingMode::Karma
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// use karma_server::api::{create_router, AppState};
/// use karma_server::config::KarmaConfig;
/// use karma_core::InMemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let state = AppState::new(Arc::new(InMemoryStore::new()), KarmaConfig::default());
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    // Public routes (no identity required)
    let public_routes = Router::new()
        .route("/config", get(get_config))
        .route("/valuations", post(items::preview_valuation))
        .route("/items", get(items::browse_items))
        .route("/items/{item_id}", get(items::get_item));

    // Protected routes (require x-account-id)
    let protected_routes = Router::new()
        .route("/items", post(items::create_item))
        .route("/items/{item_id}/remove", post(items::remove_item))
        .route("/items/{item_id}/chat", post(items::ensure_chat))
        .route("/items/{item_id}/trade", post(items::request_trade))
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/history", get(wallet::get_history))
        .route("/wallet/gift", post(wallet::gift))
        .route("/escrows/{escrow_id}", get(trades::get_escrow))
        .route("/escrows/{escrow_id}/release", post(trades::release_escrow))
        .route("/escrows/{escrow_id}/refund", post(trades::refund_escrow))
        .route("/escrows/{escrow_id}/dispute", post(trades::open_dispute))
        .route("/escrows/{escrow_id}/resolve", post(trades::resolve_dispute))
        .route_layer(axum::middleware::from_fn(middleware::identity_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub trading_mode: TradingMode,
}

/// Trading mode the storefront should present
async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        trading_mode: state.karma.trading_mode,
    })
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if the store answers a ping, or `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","store":true,"version":"0.1.0","timestamp":"2026-10-19T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let store_healthy = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store ping failed");
            false
        }
    };
    let elapsed = started.elapsed();
    logging::log_store_operation("ping", elapsed.as_millis() as u64);
    metrics::store_ping_duration_ms(elapsed.as_secs_f64() * 1000.0);

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
