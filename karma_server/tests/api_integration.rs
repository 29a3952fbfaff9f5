//! HTTP integration tests for the karma API.
//!
//! Every test runs the full router against an in-memory store, so no
//! database is required.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use karma_core::db::InMemoryStore;
use karma_core::wallet::{AccountId, TradingMode, WalletManager};
use karma_server::api::{AppState, create_router};
use karma_server::config::KarmaConfig;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

struct TestServer {
    app: axum::Router,
    store: InMemoryStore,
}

impl TestServer {
    fn new(karma: KarmaConfig) -> Self {
        let store = InMemoryStore::new();
        let state = AppState::new(Arc::new(store.clone()), karma);
        Self {
            app: create_router(state),
            store,
        }
    }

    /// Create an account holding `balance` points
    async fn account(&self, username: &str, balance: i64) -> AccountId {
        let id = self.store.add_account(username).await;
        if balance > 0 {
            WalletManager::new(Arc::new(self.store.clone()))
                .add(id, balance, "test funding")
                .await
                .unwrap();
        }
        id
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        account: Option<AccountId>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(account) = account {
            builder = builder.header("x-account-id", account.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            // Extractor rejections answer in plain text
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    async fn list_phone(&self, seller: AccountId) -> Value {
        let (status, item) = self
            .send(
                "POST",
                "/api/v1/items",
                Some(seller),
                Some(json!({
                    "title": "Galaxy phone",
                    "category": "electronics",
                    "condition": "good",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        item
    }
}

// ============================================================================
// Health and identity
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let server = TestServer::new(KarmaConfig::default());

    let (status, body) = server.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], true);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = TestServer::new(KarmaConfig::default());
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-123")
        .body(Body::empty())
        .unwrap();

    let response = server.app.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "trace-123"
    );
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let server = TestServer::new(KarmaConfig::default());
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = server.app.clone().oneshot(request).await.unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_protected_routes_require_identity() {
    let server = TestServer::new(KarmaConfig::default());

    let (status, body) = server.send("GET", "/api/v1/wallet", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("account identity"));

    let request = Request::builder()
        .uri("/api/v1/wallet")
        .header("x-account-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_config_reports_trading_mode() {
    let server = TestServer::new(KarmaConfig {
        trading_mode: TradingMode::Cash,
        ..KarmaConfig::default()
    });

    let (status, body) = server.send("GET", "/api/v1/config", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trading_mode"], "cash");
}

// ============================================================================
// Wallet
// ============================================================================

#[tokio::test]
async fn test_wallet_created_on_first_read() {
    let server = TestServer::new(KarmaConfig::default());
    let alice = server.account("alice", 0).await;

    let (status, body) = server.send("GET", "/api/v1/wallet", Some(alice), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 0);
    assert_eq!(body["account_id"], alice.to_string());
}

#[tokio::test]
async fn test_gift_moves_points() {
    let server = TestServer::new(KarmaConfig::default());
    let alice = server.account("alice", 100).await;
    let bob = server.account("bob", 0).await;

    let (status, body) = server
        .send(
            "POST",
            "/api/v1/wallet/gift",
            Some(alice),
            Some(json!({"recipient_username": "bob", "amount": 40})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sender"]["balance"], 60);
    assert_eq!(body["transaction"]["transaction_type"], "gift");

    let (_, wallet) = server.send("GET", "/api/v1/wallet", Some(bob), None).await;
    assert_eq!(wallet["balance"], 40);

    let (status, history) = server
        .send("GET", "/api/v1/wallet/history?limit=5", Some(alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["transaction_type"], "gift");
    assert_eq!(history[1]["transaction_type"], "reward");
}

#[tokio::test]
async fn test_gift_rejections() {
    let server = TestServer::new(KarmaConfig::default());
    let alice = server.account("alice", 10).await;
    server.account("bob", 0).await;

    let gift = |recipient: &str, amount: i64| {
        Some(json!({"recipient_username": recipient, "amount": amount}))
    };

    let (status, _) = server
        .send("POST", "/api/v1/wallet/gift", Some(alice), gift("bob", 11))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (status, _) = server
        .send("POST", "/api/v1/wallet/gift", Some(alice), gift("nobody", 1))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .send("POST", "/api/v1/wallet/gift", Some(alice), gift("bob", 0))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .send("POST", "/api/v1/wallet/gift", Some(alice), gift("alice", 1))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, wallet) = server.send("GET", "/api/v1/wallet", Some(alice), None).await;
    assert_eq!(wallet["balance"], 10);
}

// ============================================================================
// Listings and valuation
// ============================================================================

#[tokio::test]
async fn test_valuation_preview() {
    let server = TestServer::new(KarmaConfig::default());

    let (status, body) = server
        .send(
            "POST",
            "/api/v1/valuations",
            None,
            Some(json!({"condition": "new", "category": "laptops", "brand": "Apple"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category_baseline"], 800);
    assert_eq!(body["total"], 1200);
}

#[tokio::test]
async fn test_listing_is_priced_server_side() {
    let server = TestServer::new(KarmaConfig::default());
    let seller = server.account("seller", 0).await;

    let item = server.list_phone(seller).await;

    assert_eq!(item["karma_value"], 375);
    assert_eq!(item["status"], "available");
    assert_eq!(item["valuation_breakdown"]["total"], 375);

    let uri = format!("/api/v1/items/{}", item["id"].as_str().unwrap());
    let (status, fetched) = server.send("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], item["id"]);
}

#[tokio::test]
async fn test_only_seller_removes_listing() {
    let server = TestServer::new(KarmaConfig::default());
    let seller = server.account("seller", 0).await;
    let other = server.account("other", 0).await;
    let item = server.list_phone(seller).await;
    let uri = format!("/api/v1/items/{}/remove", item["id"].as_str().unwrap());

    let (status, _) = server.send("POST", &uri, Some(other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.send("POST", &uri, Some(seller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "removed");

    let (status, _) = server.send("POST", &uri, Some(seller), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_market_browse_is_public_and_filtered() {
    let server = TestServer::new(KarmaConfig::default());
    let seller = server.account("seller", 0).await;
    let buyer = server.account("buyer", 1000).await;
    let phone = server.list_phone(seller).await;
    let (_, chair) = server
        .send(
            "POST",
            "/api/v1/items",
            Some(seller),
            Some(json!({
                "title": "Oak chair",
                "description": "Solid wood",
                "category": "furniture",
                "condition": "fair",
            })),
        )
        .await;

    let (status, items) = server.send("GET", "/api/v1/items", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], chair["id"]);
    assert_eq!(items[1]["id"], phone["id"]);

    let (_, filtered) = server
        .send("GET", "/api/v1/items?category=furniture&condition=fair", None, None)
        .await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);

    let (_, searched) = server
        .send("GET", "/api/v1/items?q=wood&limit=5", None, None)
        .await;
    assert_eq!(searched.as_array().unwrap()[0]["id"], chair["id"]);

    // Requested items leave the market
    let trade_uri = format!("/api/v1/items/{}/trade", phone["id"].as_str().unwrap());
    server.send("POST", &trade_uri, Some(buyer), None).await;
    let (_, items) = server.send("GET", "/api/v1/items", None, None).await;
    assert_eq!(items.as_array().unwrap().len(), 1);

    let (status, _) = server
        .send("GET", "/api/v1/items?condition=mint", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_item_is_not_found() {
    let server = TestServer::new(KarmaConfig::default());

    let uri = format!("/api/v1/items/{}", uuid::Uuid::new_v4());
    let (status, _) = server.send("GET", &uri, None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Trades and escrow
// ============================================================================

#[tokio::test]
async fn test_trade_request_and_release() {
    let server = TestServer::new(KarmaConfig::default());
    let seller = server.account("seller", 0).await;
    let buyer = server.account("buyer", 1000).await;
    let item = server.list_phone(seller).await;
    let item_id = item["id"].as_str().unwrap().to_string();

    let trade_uri = format!("/api/v1/items/{item_id}/trade");
    let (status, receipt) = server.send("POST", &trade_uri, Some(buyer), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["buyer_wallet"]["balance"], 625);
    assert_eq!(receipt["escrow"]["status"], "held");
    assert_eq!(receipt["replayed"], false);

    // Replays return the same escrow without charging again
    let (status, replay) = server.send("POST", &trade_uri, Some(buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["escrow"]["id"], receipt["escrow"]["id"]);
    assert_eq!(replay["buyer_wallet"]["balance"], 625);

    let escrow_id = receipt["escrow"]["id"].as_str().unwrap().to_string();
    let (status, escrow) = server
        .send("GET", &format!("/api/v1/escrows/{escrow_id}"), Some(seller), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(escrow["amount"], 375);

    let release_uri = format!("/api/v1/escrows/{escrow_id}/release");
    let (status, _) = server.send("POST", &release_uri, Some(seller), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, outcome) = server.send("POST", &release_uri, Some(buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["escrow"]["status"], "released");
    assert_eq!(outcome["item_status"], "sold");
    assert_eq!(outcome["transaction"]["status"], "completed");

    let (_, wallet) = server.send("GET", "/api/v1/wallet", Some(seller), None).await;
    assert_eq!(wallet["balance"], 375);

    let (status, _) = server.send("POST", &release_uri, Some(buyer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_trade_rejections() {
    let server = TestServer::new(KarmaConfig::default());
    let seller = server.account("seller", 0).await;
    let poor = server.account("poor", 100).await;
    let item = server.list_phone(seller).await;
    let trade_uri = format!("/api/v1/items/{}/trade", item["id"].as_str().unwrap());

    let (status, body) = server.send("POST", &trade_uri, Some(poor), None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["error"].as_str().is_some());

    let (status, _) = server.send("POST", &trade_uri, Some(seller), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = format!("/api/v1/items/{}/trade", uuid::Uuid::new_v4());
    let (status, _) = server.send("POST", &missing, Some(poor), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(server.store.escrows().await.is_empty());
}

#[tokio::test]
async fn test_outsider_cannot_read_escrow() {
    let server = TestServer::new(KarmaConfig::default());
    let seller = server.account("seller", 0).await;
    let buyer = server.account("buyer", 500).await;
    let outsider = server.account("outsider", 0).await;
    let item = server.list_phone(seller).await;
    let trade_uri = format!("/api/v1/items/{}/trade", item["id"].as_str().unwrap());
    let (_, receipt) = server.send("POST", &trade_uri, Some(buyer), None).await;
    let uri = format!("/api/v1/escrows/{}", receipt["escrow"]["id"].as_str().unwrap());

    let (status, _) = server.send("GET", &uri, Some(outsider), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_dispute_resolved_by_operator() {
    let operator = uuid::Uuid::new_v4();
    let server = TestServer::new(KarmaConfig {
        operators: vec![operator],
        ..KarmaConfig::default()
    });
    let seller = server.account("seller", 0).await;
    let buyer = server.account("buyer", 500).await;
    let item = server.list_phone(seller).await;
    let trade_uri = format!("/api/v1/items/{}/trade", item["id"].as_str().unwrap());
    let (_, receipt) = server.send("POST", &trade_uri, Some(buyer), None).await;
    let escrow_id = receipt["escrow"]["id"].as_str().unwrap().to_string();

    let dispute_uri = format!("/api/v1/escrows/{escrow_id}/dispute");
    let (status, _) = server
        .send("POST", &dispute_uri, Some(buyer), Some(json!({"reason": "  "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, disputed) = server
        .send(
            "POST",
            &dispute_uri,
            Some(buyer),
            Some(json!({"reason": "  never arrived  "})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(disputed["escrow"]["status"], "disputed");
    assert_eq!(disputed["escrow"]["dispute_reason"], "never arrived");

    // Only an operator closes a dispute in the buyer's favour
    let (status, _) = server
        .send(
            "POST",
            &format!("/api/v1/escrows/{escrow_id}/refund"),
            Some(buyer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let resolve_uri = format!("/api/v1/escrows/{escrow_id}/resolve");
    let resolve = Some(json!({"resolution": "buyer_wins"}));
    let (status, _) = server
        .send("POST", &resolve_uri, Some(buyer), resolve.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Operators can read escrows they are not part of
    let (status, _) = server
        .send("GET", &format!("/api/v1/escrows/{escrow_id}"), Some(operator), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, outcome) = server
        .send("POST", &resolve_uri, Some(operator), resolve)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["escrow"]["status"], "refunded");
    assert_eq!(outcome["item_status"], "available");

    let (_, wallet) = server.send("GET", "/api/v1/wallet", Some(buyer), None).await;
    assert_eq!(wallet["balance"], 500);
}

#[tokio::test]
async fn test_chat_is_shared_with_trade() {
    let server = TestServer::new(KarmaConfig::default());
    let seller = server.account("seller", 0).await;
    let buyer = server.account("buyer", 500).await;
    let item = server.list_phone(seller).await;
    let item_id = item["id"].as_str().unwrap().to_string();

    let (status, chat) = server
        .send("POST", &format!("/api/v1/items/{item_id}/chat"), Some(buyer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chat["created"], true);

    let (_, receipt) = server
        .send("POST", &format!("/api/v1/items/{item_id}/trade"), Some(buyer), None)
        .await;
    assert_eq!(receipt["chat"]["id"], chat["chat"]["id"]);
    assert_eq!(server.store.chats().await.len(), 1);
}

#[tokio::test]
async fn test_cash_mode_disables_karma_transfers() {
    let server = TestServer::new(KarmaConfig {
        trading_mode: TradingMode::Cash,
        ..KarmaConfig::default()
    });
    let seller = server.account("seller", 0).await;
    let buyer = server.account("buyer", 500).await;
    let item = server.list_phone(seller).await;

    let trade_uri = format!("/api/v1/items/{}/trade", item["id"].as_str().unwrap());
    let (status, body) = server.send("POST", &trade_uri, Some(buyer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Karma trading is disabled");

    let (status, _) = server
        .send(
            "POST",
            "/api/v1/wallet/gift",
            Some(buyer),
            Some(json!({"recipient_username": "seller", "amount": 5})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, wallet) = server.send("GET", "/api/v1/wallet", Some(buyer), None).await;
    assert_eq!(wallet["balance"], 500);
}
