//! Prometheus scrape endpoint.
//!
//! Series recorded by the services:
//! - `orders_placed_total{payment_method}`
//! - `payment_notifications_total{outcome}`: `processed`, `invalid_signature`
//!   or `unknown_order`
//! - `logins_total{outcome}`: `success` or `failure`

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
