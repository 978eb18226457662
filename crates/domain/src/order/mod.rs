//! Order placement and payment processing.

mod notification;
mod number;
mod service;

pub use notification::{PaymentTransition, transition_for};
pub use number::generate_order_number;
pub use service::{
    NotificationOutcome, OrderFilter, OrderItemInput, OrderService, PlaceOrder, PlacedOrder,
};
