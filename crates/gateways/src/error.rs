use thiserror::Error;

/// Errors raised by external service clients.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The service has no credentials configured.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body could not be understood.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The geocoder could not resolve an address.
    #[error("Could not geocode address: {0}")]
    AddressNotFound(String),

    /// A test double was told to fail.
    #[error("Gateway rejected the request: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
