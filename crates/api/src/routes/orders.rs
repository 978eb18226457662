//! Customer order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{BranchId, Money, OrderId, PageRequest, ProductId, UserId};
use domain::{OrderFilter, OrderItemInput, PlaceOrder, PlacedOrder};
use serde::{Deserialize, Serialize};
use store::{Order, OrderLine, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, Store};

use super::{date_range, parse_id};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::response::{self, ApiResponse};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub branch_id: BranchId,
    pub items: Vec<OrderItemRequest>,
    pub payment_method: PaymentMethod,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Query filters shared by the customer and admin order listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersParams {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub branch_id: Option<BranchId>,
    pub user_id: Option<UserId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListOrdersParams {
    pub(crate) fn into_filter(self) -> Result<(OrderFilter, PageRequest), ApiError> {
        let created = date_range(self.start_date.as_deref(), self.end_date.as_deref())?;
        Ok((
            OrderFilter {
                user_id: self.user_id,
                branch_id: self.branch_id,
                status: self.status,
                payment_status: self.payment_status,
                created,
            },
            PageRequest::new(self.page, self.limit),
        ))
    }
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub subtotal: Money,
}

impl From<OrderLine> for OrderItemResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            subtotal: line.total_price(),
            product_id: line.product_id,
            name: line.name,
            price: line.unit_price,
            quantity: line.quantity,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub branch_id: BranchId,
    pub branch_name: String,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_details: PaymentDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            order_number: o.order_number,
            user_id: o.user_id,
            branch_id: o.branch_id,
            branch_name: o.branch_name,
            items: o.items.into_iter().map(Into::into).collect(),
            total_amount: o.total_amount,
            status: o.status,
            payment_method: o.payment_method,
            payment_status: o.payment_status,
            payment_details: o.payment_details,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedResponse {
    pub order: OrderResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

impl From<PlacedOrder> for OrderCreatedResponse {
    fn from(placed: PlacedOrder) -> Self {
        Self {
            order: placed.order.into(),
            payment_token: placed.payment_token,
            payment_url: placed.payment_url,
        }
    }
}

// -- Handlers --

/// POST /api/v1/orders: place an order for the caller.
#[tracing::instrument(skip(state, user, payload), fields(user_id = %user.principal.user_id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<OrderCreatedResponse>>), ApiError> {
    let Json(req) = payload?;
    let placed = state
        .orders
        .place_order(
            user.principal.user_id,
            PlaceOrder {
                branch_id: req.branch_id,
                items: req
                    .items
                    .into_iter()
                    .map(|item| OrderItemInput {
                        product_id: item.product_id,
                        quantity: item.quantity,
                    })
                    .collect(),
                payment_method: req.payment_method,
            },
        )
        .await?;
    Ok(response::created(placed.into()))
}

/// GET /api/v1/orders: the caller's orders, newest first.
#[tracing::instrument(skip(state, user, params), fields(user_id = %user.principal.user_id))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ApiError> {
    let Query(params) = params?;
    let (filter, page) = params.into_filter()?;
    let orders = state
        .orders
        .user_orders(user.principal.user_id, filter, page)
        .await?;
    Ok(response::page(orders.map(OrderResponse::from)))
}

/// GET /api/v1/orders/{id}
#[tracing::instrument(skip(state, user), fields(user_id = %user.principal.user_id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let order = state
        .orders
        .get_order(&user.principal, parse_id(&id)?)
        .await?;
    Ok(response::ok(order.into()))
}
