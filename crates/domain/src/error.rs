//! Domain error types.

use gateways::GatewayError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input failed validation. The message lists every failed rule.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    /// Missing, unknown or expired bearer token.
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Branch not found or inactive")]
    BranchUnavailable,

    #[error("Product {0} is not available")]
    ProductUnavailable(String),

    #[error("Insufficient stock for {product}")]
    InsufficientStock {
        product: String,
        available: u32,
        requested: u32,
    },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Payment gateway error: {0}")]
    PaymentGateway(#[source] GatewayError),

    #[error("Geocoding failed: {0}")]
    Geocoding(#[source] GatewayError),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[source] StoreError),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::Conflict(message) => DomainError::Conflict(message),
            other => DomainError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
