//! Mapping gateway transaction states onto orders.

use store::{OrderStatus, PaymentStatus};

/// What a gateway `transaction_status` means for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentTransition {
    pub payment_status: PaymentStatus,
    /// New fulfillment status, or `None` to keep the current one.
    pub order_status: Option<OrderStatus>,
}

/// Maps a gateway transaction status. `current` is the order's status
/// before the notification.
pub fn transition_for(transaction_status: &str, current: OrderStatus) -> PaymentTransition {
    match transaction_status {
        "settlement" | "capture" => PaymentTransition {
            payment_status: PaymentStatus::Success,
            order_status: (current == OrderStatus::Pending).then_some(OrderStatus::Processing),
        },
        "cancel" | "expire" => PaymentTransition {
            payment_status: PaymentStatus::Canceled,
            order_status: Some(OrderStatus::Cancelled),
        },
        "deny" => PaymentTransition {
            payment_status: PaymentStatus::Failed,
            order_status: None,
        },
        _ => PaymentTransition {
            payment_status: PaymentStatus::Pending,
            order_status: None,
        },
    }
}
