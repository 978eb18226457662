//! Clients for the managed services the shop talks to: the Midtrans Snap
//! payment gateway and the Google Maps geocoder.
//!
//! Each service sits behind a trait with three implementations: the real
//! HTTP client, an in-memory double for tests, and a disabled variant used
//! when credentials are missing.

pub mod error;
pub mod geocoding;
pub mod payment;
pub mod signature;

pub use error::GatewayError;
pub use geocoding::{DisabledGeocoder, GeocodedAddress, Geocoder, GoogleGeocoder, InMemoryGeocoder};
pub use payment::{
    CustomerDetails, DisabledPaymentGateway, InMemoryPaymentGateway, MidtransConfig,
    MidtransSnapGateway, PaymentGateway, PaymentNotification, SnapItem, SnapSession,
    SnapTransaction,
};
pub use signature::{constant_time_compare, notification_signature};
