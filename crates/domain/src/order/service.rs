use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use common::{BranchId, Money, OrderId, Page, PageRequest, ProductId, UserId};
use gateways::{CustomerDetails, PaymentGateway, PaymentNotification, SnapItem, SnapTransaction};
use store::{
    DateRange, Order, OrderLine, OrderQuery, OrderStatus, PaymentDetails, PaymentMethod,
    PaymentStatus, Store, StoreError,
};
use tracing::{info, warn};

use super::notification::transition_for;
use super::number::generate_order_number;
use crate::account::Principal;
use crate::error::{DomainError, Result};
use crate::validation::Validator;

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemInput {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Input for [`OrderService::place_order`].
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub branch_id: BranchId,
    pub items: Vec<OrderItemInput>,
    pub payment_method: PaymentMethod,
}

/// The stored order plus the checkout session for gateway payments.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment_token: Option<String>,
    pub payment_url: Option<String>,
}

/// Filters shared by the customer and admin order listings.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub branch_id: Option<BranchId>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub created: DateRange,
}

/// Result of processing a gateway notification.
#[derive(Debug, Clone)]
pub enum NotificationOutcome {
    Updated(Order),
    /// The notification named an order this shop does not know. It is
    /// acknowledged so the gateway stops retrying.
    UnknownOrder,
}

fn validate_items(items: &[OrderItemInput]) -> Result<Vec<(ProductId, u32)>> {
    let mut v = Validator::new();
    v.check(!items.is_empty(), "Order must contain at least one item");

    let mut seen = HashSet::new();
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        match u32::try_from(item.quantity) {
            Ok(quantity) if quantity >= 1 => lines.push((item.product_id, quantity)),
            _ => {
                v.check(false, format!("Quantity for product {} must be at least 1", item.product_id));
            }
        }
        if !seen.insert(item.product_id) {
            v.check(false, format!("Product {} appears more than once", item.product_id));
        }
    }
    v.finish()?;
    Ok(lines)
}

/// Sum of the line totals, rejecting amounts that do not fit in `Money`.
fn order_total(lines: &[OrderLine]) -> Result<Money> {
    lines
        .iter()
        .try_fold(Money::zero(), |total, line| {
            line.unit_price
                .checked_multiply(line.quantity)
                .and_then(|subtotal| total.checked_add(subtotal))
        })
        .ok_or_else(|| DomainError::Validation("Order total is too large".into()))
}

/// Order placement, lookup and payment notifications.
pub struct OrderService<S: Store> {
    store: S,
    payments: Arc<dyn PaymentGateway>,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S, payments: Arc<dyn PaymentGateway>) -> Self {
        Self { store, payments }
    }

    /// Places an order.
    ///
    /// Stock is reserved before the payment gateway is called. If the gateway
    /// call fails the reservation stays in place and the failure is returned.
    #[tracing::instrument(skip(self, request), fields(%user_id, branch_id = %request.branch_id))]
    pub async fn place_order(&self, user_id: UserId, request: PlaceOrder) -> Result<PlacedOrder> {
        let requested = validate_items(&request.items)?;

        let branch = self
            .store
            .find_branch(request.branch_id)
            .await?
            .filter(|b| b.is_active)
            .ok_or(DomainError::BranchUnavailable)?;

        let ids: Vec<ProductId> = requested.iter().map(|(id, _)| *id).collect();
        let products = self.store.find_products(&ids).await?;

        let mut lines = Vec::with_capacity(requested.len());
        for (product_id, quantity) in &requested {
            let product = products
                .iter()
                .find(|p| p.id == *product_id)
                .ok_or_else(|| DomainError::not_found("Product", product_id))?;
            if !product.is_available {
                return Err(DomainError::ProductUnavailable(product.name.clone()));
            }
            if product.stock < *quantity {
                return Err(DomainError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock,
                    requested: *quantity,
                });
            }
            lines.push(OrderLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity: *quantity,
            });
        }
        let total = order_total(&lines)?;

        let now = Utc::now();
        let order_number = generate_order_number(now);

        for line in &lines {
            self.store
                .reserve_stock(line.product_id, line.quantity)
                .await
                .map_err(|e| match e {
                    StoreError::Conflict(_) => {
                        warn!(%order_number, product_id = %line.product_id, "Stock ran out during reservation");
                        DomainError::InsufficientStock {
                            product: line.name.clone(),
                            available: 0,
                            requested: line.quantity,
                        }
                    }
                    other => other.into(),
                })?;
        }

        let mut order = Order {
            id: OrderId::new(),
            order_number: order_number.clone(),
            user_id,
            branch_id: branch.id,
            branch_name: branch.name.clone(),
            items: lines,
            total_amount: total,
            status: OrderStatus::Pending,
            payment_method: request.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_details: PaymentDetails::default(),
            created_at: now,
            updated_at: now,
        };

        let mut payment_token = None;
        let mut payment_url = None;
        match request.payment_method {
            PaymentMethod::Cash => {
                order.payment_status = PaymentStatus::Success;
                order.status = OrderStatus::Processing;
                order.payment_details.paid_at = Some(now);
            }
            PaymentMethod::Midtrans => {
                let customer = self
                    .store
                    .find_user(user_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("User", user_id))?;
                let transaction = SnapTransaction {
                    order_id: order_number.clone(),
                    gross_amount: total,
                    items: order
                        .items
                        .iter()
                        .map(|line| SnapItem {
                            id: line.product_id.to_string(),
                            name: line.name.clone(),
                            price: line.unit_price,
                            quantity: line.quantity,
                        })
                        .collect(),
                    customer: CustomerDetails::from_full_name(
                        &customer.name,
                        customer.email.as_str(),
                        &customer.phone,
                    ),
                };

                let session = self.payments.create_transaction(transaction).await.map_err(|e| {
                    warn!(%order_number, error = %e, "Payment gateway failed after stock was reserved");
                    DomainError::PaymentGateway(e)
                })?;

                order.payment_details.snap_token = Some(session.token.clone());
                order.payment_details.snap_redirect_url = Some(session.redirect_url.clone());
                order.payment_details.gateway_order_id = Some(order_number.clone());
                payment_token = Some(session.token);
                payment_url = Some(session.redirect_url);
            }
        }

        self.store.insert_order(&order).await?;

        metrics::counter!("orders_placed_total", "payment_method" => order.payment_method.as_str())
            .increment(1);
        info!(order_id = %order.id, %order_number, total = %order.total_amount, "Order placed");

        Ok(PlacedOrder {
            order,
            payment_token,
            payment_url,
        })
    }

    /// Orders of one customer, newest first.
    #[tracing::instrument(skip(self, filter))]
    pub async fn user_orders(
        &self,
        user_id: UserId,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        self.all_orders(
            OrderFilter {
                user_id: Some(user_id),
                ..filter
            },
            page,
        )
        .await
    }

    /// Every order matching `filter`, newest first.
    #[tracing::instrument(skip(self, filter))]
    pub async fn all_orders(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        let query = OrderQuery {
            user_id: filter.user_id,
            branch_id: filter.branch_id,
            status: filter.status,
            payment_status: filter.payment_status,
            created: filter.created,
            page,
        };
        Ok(self.store.list_orders(&query).await?)
    }

    /// Loads an order on behalf of `viewer`. Customers only see their own
    /// orders; anyone else's are reported as missing.
    #[tracing::instrument(skip(self, viewer), fields(viewer = %viewer.user_id))]
    pub async fn get_order(&self, viewer: &Principal, id: OrderId) -> Result<Order> {
        self.store
            .find_order(id)
            .await?
            .filter(|o| viewer.is_admin() || o.user_id == viewer.user_id)
            .ok_or_else(|| DomainError::not_found("Order", id))
    }

    /// Sets the fulfillment status of an order.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut order = self
            .store
            .find_order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", id))?;

        let previous = order.status;
        order.status = status;
        order.updated_at = Utc::now();
        self.store.update_order(&order).await?;

        info!(order_id = %id, from = %previous, to = %status, "Order status updated");
        Ok(order)
    }

    /// Applies a payment gateway notification.
    #[tracing::instrument(
        skip(self, notification),
        fields(order_number = %notification.order_id, transaction_status = %notification.transaction_status)
    )]
    pub async fn handle_payment_notification(
        &self,
        notification: PaymentNotification,
    ) -> Result<NotificationOutcome> {
        let Some(mut order) = self
            .store
            .find_order_by_number(&notification.order_id)
            .await?
        else {
            warn!("Notification for unknown order");
            metrics::counter!("payment_notifications_total", "outcome" => "unknown_order")
                .increment(1);
            return Ok(NotificationOutcome::UnknownOrder);
        };

        if !self.payments.verify_notification(&notification) {
            warn!("Notification signature mismatch");
            metrics::counter!("payment_notifications_total", "outcome" => "invalid_signature")
                .increment(1);
            return Err(DomainError::InvalidSignature);
        }

        let now = Utc::now();
        let transition = transition_for(&notification.transaction_status, order.status);
        order.payment_status = transition.payment_status;
        if let Some(status) = transition.order_status {
            order.status = status;
        }

        let details = &mut order.payment_details;
        details.transaction_status = Some(notification.transaction_status.clone());
        details.status_code = Some(notification.status_code.clone());
        details.updated_at = Some(now);
        if let Some(transaction_id) = notification.transaction_id {
            details.transaction_id = Some(transaction_id);
        }
        if transition.payment_status == PaymentStatus::Success && details.paid_at.is_none() {
            details.paid_at = Some(now);
        }
        order.updated_at = now;

        self.store.update_order(&order).await?;

        metrics::counter!("payment_notifications_total", "outcome" => "processed").increment(1);
        info!(
            order_id = %order.id,
            payment_status = %order.payment_status,
            status = %order.status,
            "Payment notification applied"
        );
        Ok(NotificationOutcome::Updated(order))
    }
}
