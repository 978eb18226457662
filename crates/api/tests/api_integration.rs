//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::GeoPoint;
use domain::{AccountService, Passwords};
use gateways::{InMemoryGeocoder, InMemoryPaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@kopi.example";
const ADMIN_PASSWORD: &str = "admin-secret";
const BRANCH_ADDRESS: &str = "Jl. Medan Merdeka, Jakarta Pusat";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    router: axum::Router,
    payments: InMemoryPaymentGateway,
}

async fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let payments = InMemoryPaymentGateway::default();
    let geocoder = InMemoryGeocoder::new();
    geocoder.insert(BRANCH_ADDRESS, GeoPoint::new(-6.1754, 106.8272));

    let accounts = AccountService::new(store.clone())
        .with_passwords(Passwords::with_cost(8, 1).unwrap());
    accounts
        .ensure_admin("Shop Admin", ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    let state = api::AppState::new(store, Arc::new(payments.clone()), Arc::new(geocoder))
        .with_accounts(accounts);
    let router = api::create_app(Arc::new(state), get_metrics_handle(), &[]);

    TestApp { router, payments }
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, json) = self
            .send(
                "POST",
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {json}");
        json["data"]["token"].as_str().unwrap().to_string()
    }

    async fn register_and_login(&self, email: &str) -> String {
        let (status, _) = self
            .send(
                "POST",
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "name": "Rina Kusuma",
                    "email": email,
                    "phone": "081234567890",
                    "password": "secret123"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(email, "secret123").await
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Creates a branch and a product; returns their ids.
    async fn seed_catalog(&self, stock: u32) -> (String, String) {
        let admin = self.admin_token().await;
        let (status, branch) = self
            .send(
                "POST",
                "/api/v1/branches",
                Some(&admin),
                Some(json!({
                    "name": "Monas",
                    "address": BRANCH_ADDRESS,
                    "phone": "0215551234",
                    "operatingHours": { "monday": { "open": "07:00", "close": "22:00" } }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{branch}");

        let (status, product) = self
            .send(
                "POST",
                "/api/v1/products",
                Some(&admin),
                Some(json!({
                    "name": "Kopi Susu",
                    "description": "Espresso with palm sugar and fresh milk",
                    "price": 28000,
                    "category": "Coffee",
                    "image": "https://cdn.kopi.example/kopi-susu.jpg",
                    "stock": stock
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{product}");

        (
            branch["data"]["id"].as_str().unwrap().to_string(),
            product["data"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn place_order(
        &self,
        token: &str,
        branch_id: &str,
        product_id: &str,
        quantity: i64,
        method: &str,
    ) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/v1/orders",
            Some(token),
            Some(json!({
                "branchId": branch_id,
                "items": [{ "productId": product_id, "quantity": quantity }],
                "paymentMethod": method
            })),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;
    let (status, json) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let app = setup().await;
    let (status, json) = app.send("GET", "/api/v1/coupons", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("/api/v1/coupons"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;
    app.admin_token().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("logins_total"), "missing login counter: {text}");
}

mod accounts {
    use super::*;

    #[tokio::test]
    async fn test_register_login_and_profile() {
        let app = setup().await;
        let token = app.register_and_login("rina@example.com").await;

        let (status, json) = app.send("GET", "/api/v1/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["email"], "rina@example.com");
        assert_eq!(json["data"]["role"], "USER");
        assert!(json["data"].get("passwordHash").is_none());

        let (status, json) = app
            .send(
                "PUT",
                "/api/v1/profile",
                Some(&token),
                Some(json!({ "name": "Rina K." })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Rina K.");
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let app = setup().await;
        app.register_and_login("rina@example.com").await;

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "name": "Someone Else",
                    "email": "RINA@example.com",
                    "phone": "081234567891",
                    "password": "another1"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "Email already registered");
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let app = setup().await;
        app.register_and_login("rina@example.com").await;

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": "rina@example.com", "password": "wrong-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let app = setup().await;
        let token = app.register_and_login("rina@example.com").await;

        let (status, _) = app.send("POST", "/api/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.send("GET", "/api/v1/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let app = setup().await;
        let old_token = app.register_and_login("rina@example.com").await;

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/auth/forgot-password",
                None,
                Some(json!({ "email": "rina@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let reset_token = json["data"]["token"].as_str().unwrap().to_string();
        assert!(json["data"]["expiresAt"].is_string());

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/auth/reset-password",
                None,
                Some(json!({ "token": reset_token, "password": "newsecret1" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Password reset successfully");

        let (status, _) = app.send("GET", "/api/v1/profile", Some(&old_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        app.login("rina@example.com", "newsecret1").await;

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/auth/reset-password",
                None,
                Some(json!({ "token": reset_token, "password": "another12" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid or expired reset token");
    }

    #[tokio::test]
    async fn test_forgot_password_for_unknown_email() {
        let app = setup().await;
        let (status, json) = app
            .send(
                "POST",
                "/api/v1/auth/forgot-password",
                None,
                Some(json!({ "email": "ghost@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Email not found");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = setup().await;
        let (status, json) = app
            .send(
                "POST",
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": "rina@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn test_product_writes_require_admin() {
        let app = setup().await;
        let body = json!({
            "name": "Kopi Susu",
            "description": "Espresso with palm sugar and fresh milk",
            "price": 28000,
            "category": "Coffee",
            "image": "https://cdn.kopi.example/kopi-susu.jpg",
            "stock": 5
        });

        let (status, _) = app
            .send("POST", "/api/v1/products", None, Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = app.register_and_login("rina@example.com").await;
        let (status, json) = app
            .send("POST", "/api/v1/products", Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "Insufficient permissions");
    }

    #[tokio::test]
    async fn test_product_requires_image() {
        let app = setup().await;
        let admin = app.admin_token().await;
        let (status, json) = app
            .send(
                "POST",
                "/api/v1/products",
                Some(&admin),
                Some(json!({
                    "name": "Kopi Susu",
                    "description": "Espresso with palm sugar and fresh milk",
                    "price": 28000,
                    "category": "Coffee",
                    "stock": 5
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("image"));
    }

    #[tokio::test]
    async fn test_public_listing_and_lookup() {
        let app = setup().await;
        let (_, product_id) = app.seed_catalog(5).await;

        let (status, json) = app
            .send("GET", "/api/v1/products?category=Coffee&limit=5", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["pagination"]["total"], 1);
        assert_eq!(json["pagination"]["limit"], 5);

        let (status, json) = app
            .send("GET", &format!("/api/v1/products/{product_id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["price"], 28000);
        assert_eq!(json["data"]["isAvailable"], true);

        let (status, _) = app
            .send("GET", "/api/v1/products/not-a-uuid", None, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_nearby_branches() {
        let app = setup().await;
        app.seed_catalog(5).await;

        let (status, json) = app
            .send(
                "GET",
                "/api/v1/branches/nearby?lat=-6.18&lng=106.83&radius=5",
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let branches = json["data"].as_array().unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0]["name"], "Monas");
        assert!(branches[0]["distance"].as_f64().unwrap() < 5.0);

        let (status, _) = app
            .send(
                "GET",
                "/api/v1/branches/nearby?lat=-6.18&lng=106.83&radius=80",
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn test_cash_order_decrements_stock() {
        let app = setup().await;
        let (branch_id, product_id) = app.seed_catalog(5).await;
        let token = app.register_and_login("rina@example.com").await;

        let (status, json) = app
            .place_order(&token, &branch_id, &product_id, 2, "CASH")
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        let order = &json["data"]["order"];
        assert_eq!(order["status"], "PROCESSING");
        assert_eq!(order["paymentStatus"], "SUCCESS");
        assert_eq!(order["totalAmount"], 56000);
        assert!(json["data"].get("paymentToken").is_none());

        let (_, product) = app
            .send("GET", &format!("/api/v1/products/{product_id}"), None, None)
            .await;
        assert_eq!(product["data"]["stock"], 3);
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_rejected() {
        let app = setup().await;
        let (branch_id, product_id) = app.seed_catalog(1).await;
        let token = app.register_and_login("rina@example.com").await;

        let (status, json) = app
            .place_order(&token, &branch_id, &product_id, 2, "CASH")
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Insufficient stock for Kopi Susu");
    }

    #[tokio::test]
    async fn test_orders_require_authentication() {
        let app = setup().await;
        let (status, _) = app.send("GET", "/api/v1/orders", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_customers_cannot_see_other_orders() {
        let app = setup().await;
        let (branch_id, product_id) = app.seed_catalog(5).await;
        let rina = app.register_and_login("rina@example.com").await;
        let budi = app.register_and_login("budi@example.com").await;

        let (_, json) = app
            .place_order(&rina, &branch_id, &product_id, 1, "CASH")
            .await;
        let order_id = json["data"]["order"]["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .send("GET", &format!("/api/v1/orders/{order_id}"), Some(&rina), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .send("GET", &format!("/api/v1/orders/{order_id}"), Some(&budi), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, json) = app.send("GET", "/api/v1/orders", Some(&budi), None).await;
        assert_eq!(json["pagination"]["total"], 0);

        let (status, _) = app
            .send("GET", "/api/v1/admin/orders", Some(&budi), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_updates_status() {
        let app = setup().await;
        let (branch_id, product_id) = app.seed_catalog(5).await;
        let token = app.register_and_login("rina@example.com").await;
        let (_, json) = app
            .place_order(&token, &branch_id, &product_id, 1, "CASH")
            .await;
        let order_id = json["data"]["order"]["id"].as_str().unwrap().to_string();

        let admin = app.admin_token().await;
        let (status, json) = app
            .send(
                "PUT",
                &format!("/api/v1/admin/orders/{order_id}/status"),
                Some(&admin),
                Some(json!({ "status": "COMPLETED" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "COMPLETED");

        let (_, json) = app
            .send(
                "GET",
                "/api/v1/admin/orders?status=COMPLETED",
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
    }
}

mod payments {
    use super::*;

    async fn midtrans_order(app: &TestApp) -> (String, String, String) {
        let (branch_id, product_id) = app.seed_catalog(5).await;
        let token = app.register_and_login("rina@example.com").await;
        let (status, json) = app
            .place_order(&token, &branch_id, &product_id, 1, "MIDTRANS")
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert!(json["data"]["paymentToken"].as_str().is_some());
        assert!(json["data"]["paymentUrl"].as_str().is_some());
        (
            token,
            json["data"]["order"]["id"].as_str().unwrap().to_string(),
            json["data"]["order"]["orderNumber"]
                .as_str()
                .unwrap()
                .to_string(),
        )
    }

    #[tokio::test]
    async fn test_settlement_callback_marks_order_paid() {
        let app = setup().await;
        let (token, order_id, order_number) = midtrans_order(&app).await;

        let notification =
            app.payments
                .signed_notification(&order_number, "200", "28000.00", "settlement");
        let (status, json) = app
            .send(
                "POST",
                "/api/v1/payments/midtrans/callback",
                None,
                Some(serde_json::to_value(&notification).unwrap()),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");

        let (_, json) = app
            .send("GET", &format!("/api/v1/orders/{order_id}"), Some(&token), None)
            .await;
        assert_eq!(json["data"]["paymentStatus"], "SUCCESS");
        assert_eq!(json["data"]["status"], "PROCESSING");
        assert_eq!(
            json["data"]["paymentDetails"]["transactionStatus"],
            "settlement"
        );
    }

    #[tokio::test]
    async fn test_callback_with_bad_signature_is_rejected() {
        let app = setup().await;
        let (token, order_id, order_number) = midtrans_order(&app).await;

        let mut notification =
            app.payments
                .signed_notification(&order_number, "200", "28000.00", "settlement");
        notification.signature_key = "0".repeat(128);
        let (status, json) = app
            .send(
                "POST",
                "/api/v1/payments/midtrans/callback",
                None,
                Some(serde_json::to_value(&notification).unwrap()),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (_, json) = app
            .send("GET", &format!("/api/v1/orders/{order_id}"), Some(&token), None)
            .await;
        assert_eq!(json["data"]["paymentStatus"], "PENDING");
    }

    #[tokio::test]
    async fn test_callback_for_unknown_order_is_acknowledged() {
        let app = setup().await;
        let notification =
            app.payments
                .signed_notification("ORDER-1-cafebabe", "200", "1.00", "settlement");
        let (status, json) = app
            .send(
                "POST",
                "/api/v1/payments/midtrans/callback",
                None,
                Some(serde_json::to_value(&notification).unwrap()),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }
}

mod analytics {
    use super::*;

    #[tokio::test]
    async fn test_sales_only_count_successful_payments() {
        let app = setup().await;
        let (branch_id, product_id) = app.seed_catalog(10).await;
        let token = app.register_and_login("rina@example.com").await;

        app.place_order(&token, &branch_id, &product_id, 2, "CASH")
            .await;
        app.place_order(&token, &branch_id, &product_id, 1, "MIDTRANS")
            .await;

        let admin = app.admin_token().await;
        let (status, json) = app
            .send("GET", "/api/v1/admin/analytics/sales", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["totalOrders"], 1);
        assert_eq!(json["data"]["totalSales"], 56000);

        let (_, json) = app
            .send(
                "GET",
                "/api/v1/admin/analytics/top-products?limit=3",
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(json["data"][0]["productName"], "Kopi Susu");
        assert_eq!(json["data"][0]["totalQuantity"], 2);

        let (_, json) = app
            .send("GET", "/api/v1/admin/analytics/branches", Some(&admin), None)
            .await;
        assert_eq!(json["data"][0]["branchName"], "Monas");

        let (status, _) = app
            .send(
                "GET",
                "/api/v1/admin/analytics/sales",
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
