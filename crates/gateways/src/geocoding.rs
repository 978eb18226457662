//! Address geocoding.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use common::GeoPoint;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::{GatewayError, Result};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// A resolved address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    pub formatted_address: String,
    pub location: GeoPoint,
}

/// Resolves free-form addresses to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress>;
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl GeocodeResponse {
    fn into_address(self, address: &str) -> Result<GeocodedAddress> {
        if self.status != "OK" {
            let detail = self
                .error_message
                .map(|m| format!("{}: {m}", self.status))
                .unwrap_or(self.status);
            return Err(GatewayError::AddressNotFound(format!("{address} ({detail})")));
        }
        let first = self
            .results
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::AddressNotFound(address.to_string()))?;
        Ok(GeocodedAddress {
            formatted_address: first.formatted_address,
            location: GeoPoint::new(first.geometry.location.lat, first.geometry.location.lng),
        })
    }
}

/// Google Maps Geocoding API client.
#[derive(Clone)]
pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: SecretString,
}

impl GoogleGeocoder {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    #[tracing::instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress> {
        let response = self
            .client
            .get(GEOCODE_URL)
            .query(&[("address", address), ("key", self.api_key.expose_secret())])
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;
        let resolved = body.into_address(address)?;
        debug!(formatted = %resolved.formatted_address, "Address geocoded");
        Ok(resolved)
    }
}

/// Used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, _address: &str) -> Result<GeocodedAddress> {
        Err(GatewayError::NotConfigured("geocoder"))
    }
}

#[derive(Debug, Default)]
struct InMemoryGeocoderState {
    addresses: HashMap<String, GeoPoint>,
    calls: Vec<String>,
}

/// In-memory geocoder for testing. Only registered addresses resolve.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeocoder {
    state: Arc<Mutex<InMemoryGeocoderState>>,
}

impl InMemoryGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the coordinates `address` resolves to.
    pub fn insert(&self, address: impl Into<String>, location: GeoPoint) {
        self.lock().addresses.insert(address.into(), location);
    }

    /// Addresses looked up so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryGeocoderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Geocoder for InMemoryGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress> {
        let mut state = self.lock();
        state.calls.push(address.to_string());
        match state.addresses.get(address) {
            Some(location) => Ok(GeocodedAddress {
                formatted_address: format!("{address}, Indonesia"),
                location: *location,
            }),
            None => Err(GatewayError::AddressNotFound(address.to_string())),
        }
    }
}
