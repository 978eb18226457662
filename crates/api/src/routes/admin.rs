//! Administrator endpoints: every order, status changes and sales reports.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use domain::{BranchPerformance, ProductSales, SalesSummary};
use serde::Deserialize;
use store::{OrderStatus, Store};

use super::orders::{ListOrdersParams, OrderResponse};
use super::{date_range, parse_id};
use crate::AppState;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::response::{self, ApiResponse};

/// Largest `limit` the ranking reports accept.
const MAX_REPORT_LIMIT: usize = 100;

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<usize>,
}

impl ReportParams {
    fn limit(&self) -> Result<Option<usize>, ApiError> {
        match self.limit {
            Some(limit) if limit == 0 || limit > MAX_REPORT_LIMIT => Err(ApiError::BadRequest(
                format!("limit must be between 1 and {MAX_REPORT_LIMIT}"),
            )),
            limit => Ok(limit),
        }
    }
}

/// GET /api/v1/admin/orders
#[tracing::instrument(skip(state, admin, params), fields(admin = %admin.0.user_id))]
pub async fn list_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ApiError> {
    let Query(params) = params?;
    let (filter, page) = params.into_filter()?;
    let orders = state.orders.all_orders(filter, page).await?;
    Ok(response::page(orders.map(OrderResponse::from)))
}

/// PUT /api/v1/admin/orders/{id}/status
#[tracing::instrument(skip(state, admin, payload), fields(admin = %admin.0.user_id))]
pub async fn update_order_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let Json(req) = payload?;
    let order = state
        .orders
        .update_status(parse_id(&id)?, req.status)
        .await?;
    Ok(response::ok(order.into()))
}

/// GET /api/v1/admin/analytics/sales
#[tracing::instrument(skip(state, admin, params), fields(admin = %admin.0.user_id))]
pub async fn sales<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    params: Result<Query<ReportParams>, QueryRejection>,
) -> Result<Json<ApiResponse<SalesSummary>>, ApiError> {
    let Query(params) = params?;
    let range = date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    Ok(response::ok(state.analytics.sales(range).await?))
}

/// GET /api/v1/admin/analytics/top-products
#[tracing::instrument(skip(state, admin, params), fields(admin = %admin.0.user_id))]
pub async fn top_products<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    params: Result<Query<ReportParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<ProductSales>>>, ApiError> {
    let Query(params) = params?;
    let range = date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    let products = state.analytics.top_products(range, params.limit()?).await?;
    Ok(response::ok(products))
}

/// GET /api/v1/admin/analytics/branches
#[tracing::instrument(skip(state, admin, params), fields(admin = %admin.0.user_id))]
pub async fn branch_performance<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    params: Result<Query<ReportParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<BranchPerformance>>>, ApiError> {
    let Query(params) = params?;
    let range = date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    let branches = state
        .analytics
        .branch_performance(range, params.limit()?)
        .await?;
    Ok(response::ok(branches))
}
