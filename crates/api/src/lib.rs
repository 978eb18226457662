//! HTTP API server for the coffee shop backend.
//!
//! Provides REST endpoints under `/api/v1` for accounts, products, branches,
//! orders, payment callbacks and admin reports, with structured logging
//! (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use domain::{AccountService, AnalyticsService, BranchService, CatalogService, OrderService};
use gateways::{Geocoder, PaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub accounts: AccountService<S>,
    pub catalog: CatalogService<S>,
    pub branches: BranchService<S>,
    pub orders: OrderService<S>,
    pub analytics: AnalyticsService<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(
        store: S,
        payments: Arc<dyn PaymentGateway>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            branches: BranchService::new(store.clone(), geocoder),
            orders: OrderService::new(store.clone(), payments),
            analytics: AnalyticsService::new(store),
        }
    }

    /// Replaces the account service, e.g. to change the session lifetime.
    pub fn with_accounts(mut self, accounts: AccountService<S>) -> Self {
        self.accounts = accounts;
        self
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

fn api_routes<S: Store>() -> Router<Arc<AppState<S>>> {
    use routes::{admin, auth, branches, orders, payments, products, profile};

    Router::new()
        .route("/auth/register", post(auth::register::<S>))
        .route("/auth/login", post(auth::login::<S>))
        .route("/auth/logout", post(auth::logout::<S>))
        .route("/auth/logout-all", post(auth::logout_all::<S>))
        .route("/auth/forgot-password", post(auth::forgot_password::<S>))
        .route("/auth/reset-password", post(auth::reset_password::<S>))
        .route("/profile", get(profile::get::<S>).put(profile::update::<S>))
        .route(
            "/products",
            get(products::list::<S>).post(products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(products::get::<S>)
                .put(products::update::<S>)
                .delete(products::delete::<S>),
        )
        .route(
            "/branches",
            get(branches::list::<S>).post(branches::create::<S>),
        )
        .route("/branches/nearby", get(branches::nearby::<S>))
        .route(
            "/branches/{id}",
            get(branches::get::<S>)
                .put(branches::update::<S>)
                .delete(branches::delete::<S>),
        )
        .route("/orders", post(orders::create::<S>).get(orders::list::<S>))
        .route("/orders/{id}", get(orders::get::<S>))
        .route("/admin/orders", get(admin::list_orders::<S>))
        .route(
            "/admin/orders/{id}/status",
            put(admin::update_order_status::<S>),
        )
        .route("/admin/analytics/sales", get(admin::sales::<S>))
        .route("/admin/analytics/top-products", get(admin::top_products::<S>))
        .route("/admin/analytics/branches", get(admin::branch_performance::<S>))
        .route(
            "/payments/midtrans/callback",
            post(payments::midtrans_callback::<S>),
        )
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    allowed_origins: &[String],
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api/v1", api_routes::<S>())
        .fallback(routes::health::not_found)
        .with_state(state)
        .merge(metrics_router)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
