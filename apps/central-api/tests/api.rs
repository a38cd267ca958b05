//! REST surface driven through the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use central_api::auth::hash_password;
use central_api::{router, AppState, JwtManager};
use ledger_core::{
    Account, AccountStatus, Money, NewOrder, NewOrderLine, OrderSyncState, PriceLevelSyncState,
    TaxRate,
};
use ledger_db::{Database, DbConfig, NewAccount, NewProduct};
use ledger_sync::SyncClient;

const PASSWORD: &str = "correct horse";

// =============================================================================
// Fixtures
// =============================================================================

struct Harness {
    app: Router,
    db: Database,
}

async fn harness() -> Harness {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let state = Arc::new(AppState {
        db: db.clone(),
        jwt: JwtManager::new("test-secret".to_string(), 3600),
        terminal: SyncClient::new(Duration::from_secs(2)).unwrap(),
        scheduler: None,
    });
    Harness {
        app: router(state),
        db,
    }
}

async fn account(db: &Database, username: &str, parent: Option<&Account>) -> Account {
    db.accounts()
        .create(&NewAccount {
            parent_id: parent.map(|p| p.id.clone()),
            username: username.to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
            erp_host: parent.is_none().then(|| "127.0.0.1".to_string()),
            erp_port: parent.is_none().then_some(9000),
            sales_ledger: None,
        })
        .await
        .unwrap()
}

async fn order(db: &Database, owner: &Account, product_name: &str) -> String {
    let tenant_id = owner.parent_id.clone().unwrap_or_else(|| owner.id.clone());
    let product = db
        .products()
        .insert(&NewProduct {
            account_id: tenant_id,
            name: product_name.to_string(),
            base_price: Money::from_cents(10000),
            stock: 5.0,
        })
        .await
        .unwrap();
    let (order, _) = db
        .orders()
        .create(&NewOrder {
            account_id: owner.id.clone(),
            customer_name: "Acme Traders".into(),
            price_level: None,
            payment_mode: None,
            lines: vec![NewOrderLine {
                product_id: product.id,
                quantity: 2,
                tax_rate: TaxRate::from_bps(0),
            }],
        })
        .await
        .unwrap();
    order.id
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, username: &str) -> String {
    let (status, body) = call(
        app,
        post(
            "/auth/login",
            None,
            json!({ "username": username, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access_token"].as_str().unwrap().to_string()
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_issues_bearer_token() {
    let h = harness().await;
    account(&h.db, "acme", None).await;

    let (status, body) = call(
        &h.app,
        post("/auth/login", None, json!({ "username": "acme", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_login_refuses_bad_credentials_and_inactive_accounts() {
    let h = harness().await;
    let tenant = account(&h.db, "acme", None).await;
    account(&h.db, "cashier", Some(&tenant)).await;

    let (status, body) = call(
        &h.app,
        post("/auth/login", None, json!({ "username": "acme", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = call(
        &h.app,
        post("/auth/login", None, json!({ "username": "ghost", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // An inactive tenant locks out its employees too
    h.db.accounts()
        .set_status(&tenant.id, AccountStatus::Inactive)
        .await
        .unwrap();
    let (status, _) = call(
        &h.app,
        post("/auth/login", None, json!({ "username": "cashier", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_integration_routes_require_a_token() {
    let h = harness().await;

    let (status, _) = call(&h.app, get("/integration/pending-orders", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&h.app, get("/integration/pending-orders", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Pending Work
// =============================================================================

#[tokio::test]
async fn test_pending_orders_are_tenant_scoped() {
    let h = harness().await;
    let acme = account(&h.db, "acme", None).await;
    let cashier = account(&h.db, "cashier", Some(&acme)).await;
    let other = account(&h.db, "globex", None).await;

    let own = order(&h.db, &cashier, "Widget").await;
    order(&h.db, &other, "Widget").await;

    let token = login(&h.app, "cashier").await;
    let (status, body) = call(&h.app, get("/integration/pending-orders?limit=10", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["order"]["id"], own.as_str());
    assert_eq!(orders[0]["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_pending_price_levels_are_tenant_scoped() {
    let h = harness().await;
    let acme = account(&h.db, "acme", None).await;
    let other = account(&h.db, "globex", None).await;
    h.db.price_levels().create(&acme.id, "Wholesale", true).await.unwrap();
    h.db.price_levels().create(&acme.id, "Staff", false).await.unwrap();
    h.db.price_levels().create(&other.id, "Wholesale", true).await.unwrap();

    let token = login(&h.app, "acme").await;
    let (status, body) = call(&h.app, get("/integration/pending-price-levels", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let levels = body["price_levels"].as_array().unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0]["name"], "Wholesale");
    assert_eq!(levels[0]["account_id"], acme.id.as_str());
}

// =============================================================================
// Status Updates
// =============================================================================

#[tokio::test]
async fn test_order_status_moves_forward_once() {
    let h = harness().await;
    let acme = account(&h.db, "acme", None).await;
    let order_id = order(&h.db, &acme, "Widget").await;
    let token = login(&h.app, "acme").await;

    let (status, body) = call(
        &h.app,
        post(
            "/integration/update-order-status",
            Some(&token),
            json!({ "order_id": order_id, "status": "posted_to_erp", "voucher_number": "V-1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], true);

    let (status, body) = call(
        &h.app,
        post(
            "/integration/update-order-status",
            Some(&token),
            json!({ "order_id": order_id, "status": "posted_to_erp", "voucher_number": "V-2" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], false);

    let stored = h.db.orders().get(&order_id).await.unwrap().unwrap();
    assert_eq!(stored.sync_state, OrderSyncState::PostedToErp);
    assert_eq!(stored.voucher_number.as_deref(), Some("V-1"));
}

#[tokio::test]
async fn test_order_status_rejects_backward_and_foreign_updates() {
    let h = harness().await;
    let acme = account(&h.db, "acme", None).await;
    let other = account(&h.db, "globex", None).await;
    let own = order(&h.db, &acme, "Widget").await;
    let foreign = order(&h.db, &other, "Widget").await;
    let token = login(&h.app, "acme").await;

    let (status, _) = call(
        &h.app,
        post(
            "/integration/update-order-status",
            Some(&token),
            json!({ "order_id": own, "status": "pending" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &h.app,
        post(
            "/integration/update-order-status",
            Some(&token),
            json!({ "order_id": foreign, "status": "posted_to_erp" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let untouched = h.db.orders().get(&foreign).await.unwrap().unwrap();
    assert_eq!(untouched.sync_state, OrderSyncState::Pending);
}

#[tokio::test]
async fn test_price_level_status_only_moves_to_synced() {
    let h = harness().await;
    let acme = account(&h.db, "acme", None).await;
    let level = h.db.price_levels().create(&acme.id, "Wholesale", true).await.unwrap();
    let token = login(&h.app, "acme").await;

    let (status, _) = call(
        &h.app,
        post(
            "/integration/update-price-level-status",
            Some(&token),
            json!({ "id": level.id, "status": "pending_sync" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &h.app,
        post(
            "/integration/update-price-level-status",
            Some(&token),
            json!({ "id": level.id, "status": "synced" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], true);

    let stored = h.db.price_levels().get(&level.id).await.unwrap().unwrap();
    assert_eq!(stored.sync_state, PriceLevelSyncState::Synced);
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_sync_products_upserts_catalog() {
    let h = harness().await;
    let acme = account(&h.db, "acme", None).await;
    h.db.price_levels().create(&acme.id, "Wholesale", true).await.unwrap();
    let token = login(&h.app, "acme").await;

    let payload = json!({
        "products": [{
            "name": "Widget",
            "stock": 12.0,
            "price": 120000,
            "guid": "guid-widget",
            "prices": [
                { "level": "Standard", "price": 120000 },
                { "level": "Wholesale", "price": 96000 },
                { "level": "Retail", "price": 144000 }
            ]
        }]
    });

    let (status, body) = call(&h.app, post("/integration/sync-products", Some(&token), payload)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["products"], 1);
    assert_eq!(body["prices"], 2);
    assert_eq!(body["skipped_tiers"], 1);

    let products = h.db.products().list(&acme.id).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].erp_guid.as_deref(), Some("guid-widget"));
}

// =============================================================================
// ERP Connection Test + Health
// =============================================================================

#[tokio::test]
async fn test_erp_connection_test_reports_reachability() {
    let h = harness().await;
    account(&h.db, "acme", None).await;
    let token = login(&h.app, "acme").await;

    let terminal = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ENVELOPE/>"))
        .mount(&terminal)
        .await;

    let (status, body) = call(
        &h.app,
        post(
            "/erp/test",
            Some(&token),
            json!({ "host": "127.0.0.1", "port": terminal.address().port() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reachable"], true);

    let closed = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let (status, body) = call(
        &h.app,
        post("/erp/test", Some(&token), json!({ "host": "127.0.0.1", "port": closed })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reachable"], false);
}

#[tokio::test]
async fn test_health() {
    let h = harness().await;

    let (status, body) = call(&h.app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
    assert_eq!(body["scheduler_running"], false);
}
