//! Payment gateway trait and its Midtrans Snap, in-memory and disabled
//! implementations.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use common::Money;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};
use crate::signature;

const PRODUCTION_URL: &str = "https://app.midtrans.com";
const SANDBOX_URL: &str = "https://app.sandbox.midtrans.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A line item sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapItem {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerDetails {
    /// Splits a full name at the first space into first and last name.
    pub fn from_full_name(full_name: &str, email: &str, phone: &str) -> Self {
        let trimmed = full_name.trim();
        let (first, last) = match trimmed.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim()),
            None => (trimmed, ""),
        };
        Self {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        }
    }
}

/// A hosted-checkout transaction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapTransaction {
    pub order_id: String,
    pub gross_amount: Money,
    pub items: Vec<SnapItem>,
    pub customer: CustomerDetails,
}

/// The session the gateway opened for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnapSession {
    pub token: String,
    pub redirect_url: String,
}

/// Body of an HTTP notification posted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraud_status: Option<String>,
}

/// Trait for payment gateway operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted-checkout session for an order.
    async fn create_transaction(&self, transaction: SnapTransaction) -> Result<SnapSession>;

    /// Checks the signature of an incoming notification.
    fn verify_notification(&self, notification: &PaymentNotification) -> bool;
}

/// Midtrans credentials.
#[derive(Clone)]
pub struct MidtransConfig {
    pub server_key: SecretString,
    pub client_key: Option<String>,
    pub is_production: bool,
}

impl MidtransConfig {
    pub fn base_url(&self) -> &'static str {
        if self.is_production {
            PRODUCTION_URL
        } else {
            SANDBOX_URL
        }
    }
}

impl std::fmt::Debug for MidtransConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidtransConfig")
            .field("server_key", &"[REDACTED]")
            .field("client_key", &self.client_key)
            .field("is_production", &self.is_production)
            .finish()
    }
}

#[derive(Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Serialize)]
struct ItemDetails<'a> {
    id: &'a str,
    name: &'a str,
    price: i64,
    quantity: u32,
}

#[derive(Serialize)]
struct SnapRequest<'a> {
    transaction_details: TransactionDetails<'a>,
    item_details: Vec<ItemDetails<'a>>,
    customer_details: &'a CustomerDetails,
}

#[derive(Deserialize)]
struct SnapErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
}

/// Item names longer than this are rejected by the gateway.
const MAX_ITEM_NAME: usize = 50;

fn truncate_name(name: &str) -> &str {
    match name.char_indices().nth(MAX_ITEM_NAME) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Midtrans Snap API client.
#[derive(Clone)]
pub struct MidtransSnapGateway {
    client: reqwest::Client,
    config: MidtransConfig,
}

impl MidtransSnapGateway {
    /// Create a new Midtrans client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: MidtransConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PaymentGateway for MidtransSnapGateway {
    #[tracing::instrument(skip(self, transaction), fields(order_id = %transaction.order_id))]
    async fn create_transaction(&self, transaction: SnapTransaction) -> Result<SnapSession> {
        let url = format!("{}/snap/v1/transactions", self.config.base_url());
        let body = SnapRequest {
            transaction_details: TransactionDetails {
                order_id: &transaction.order_id,
                gross_amount: transaction.gross_amount.amount(),
            },
            item_details: transaction
                .items
                .iter()
                .map(|item| ItemDetails {
                    id: &item.id,
                    name: truncate_name(&item.name),
                    price: item.price.amount(),
                    quantity: item.quantity,
                })
                .collect(),
            customer_details: &transaction.customer,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(self.config.server_key.expose_secret(), Some(""))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<SnapErrorBody>(&text)
                .ok()
                .filter(|b| !b.error_messages.is_empty())
                .map(|b| b.error_messages.join("; "))
                .unwrap_or(text);
            warn!(status = status.as_u16(), %message, "Snap transaction rejected");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SnapSession = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;
        debug!("Snap transaction created");
        Ok(session)
    }

    fn verify_notification(&self, notification: &PaymentNotification) -> bool {
        signature::verify(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
            self.config.server_key.expose_secret(),
            &notification.signature_key,
        )
    }
}

/// Used when no server key is configured: transactions fail and no
/// notification verifies.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPaymentGateway;

#[async_trait]
impl PaymentGateway for DisabledPaymentGateway {
    async fn create_transaction(&self, _transaction: SnapTransaction) -> Result<SnapSession> {
        Err(GatewayError::NotConfigured("payment gateway"))
    }

    fn verify_notification(&self, _notification: &PaymentNotification) -> bool {
        false
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    transactions: Vec<SnapTransaction>,
    fail_on_create: bool,
}

/// In-memory payment gateway for testing.
///
/// Notifications are verified with the same signature scheme as Midtrans,
/// using the configured server key.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentGateway {
    server_key: String,
    state: Arc<Mutex<InMemoryPaymentState>>,
}

impl Default for InMemoryPaymentGateway {
    fn default() -> Self {
        Self::new("test-server-key")
    }
}

impl InMemoryPaymentGateway {
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            server_key: server_key.into(),
            state: Arc::default(),
        }
    }

    pub fn server_key(&self) -> &str {
        &self.server_key
    }

    /// Configures the gateway to fail on subsequent transactions.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.lock().fail_on_create = fail;
    }

    /// Returns the transactions created so far.
    pub fn transactions(&self) -> Vec<SnapTransaction> {
        self.lock().transactions.clone()
    }

    /// Builds a correctly signed notification for `order_id`.
    pub fn signed_notification(
        &self,
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        transaction_status: &str,
    ) -> PaymentNotification {
        PaymentNotification {
            order_id: order_id.to_string(),
            status_code: status_code.to_string(),
            gross_amount: gross_amount.to_string(),
            signature_key: signature::notification_signature(
                order_id,
                status_code,
                gross_amount,
                &self.server_key,
            ),
            transaction_status: transaction_status.to_string(),
            ..Default::default()
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryPaymentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_transaction(&self, transaction: SnapTransaction) -> Result<SnapSession> {
        let mut state = self.lock();
        if state.fail_on_create {
            return Err(GatewayError::Rejected("transaction declined".to_string()));
        }

        let token = format!("snap-{:04}", state.transactions.len() + 1);
        let session = SnapSession {
            redirect_url: format!("{SANDBOX_URL}/snap/v2/vtweb/{token}"),
            token,
        };
        state.transactions.push(transaction);
        Ok(session)
    }

    fn verify_notification(&self, notification: &PaymentNotification) -> bool {
        signature::verify(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
            &self.server_key,
            &notification.signature_key,
        )
    }
}
