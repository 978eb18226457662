//! Payment gateway callbacks.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use domain::NotificationOutcome;
use gateways::PaymentNotification;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::response::{self, ApiResponse};

/// POST /api/v1/payments/midtrans/callback
///
/// Authenticated by the notification signature rather than a bearer token.
/// Notifications for unknown orders are acknowledged so the gateway stops
/// retrying them.
#[tracing::instrument(skip(state, payload))]
pub async fn midtrans_callback<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<PaymentNotification>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(notification) = payload?;
    match state.orders.handle_payment_notification(notification).await? {
        NotificationOutcome::Updated(_) => Ok(response::message("Notification processed")),
        NotificationOutcome::UnknownOrder => Ok(response::message("Order not found, notification ignored")),
    }
}
