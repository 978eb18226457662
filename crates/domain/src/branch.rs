//! Branches and proximity search.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use common::{BranchId, GeoPoint, Page};
use gateways::{GatewayError, Geocoder};
use store::{Branch, BranchQuery, OpeningHours, Store, Weekday};
use tracing::info;

use crate::error::{DomainError, Result};
use crate::validation::{Validator, is_valid_time};

/// Radius used when a nearby search does not give one.
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 10.0;
/// Largest radius a nearby search accepts.
pub const MAX_NEARBY_RADIUS_KM: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct NewBranch {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub operating_hours: BTreeMap<Weekday, OpeningHours>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct BranchChanges {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub operating_hours: Option<BTreeMap<Weekday, OpeningHours>>,
    pub is_active: Option<bool>,
}

/// A branch together with its distance from the search point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyBranch {
    pub branch: Branch,
    pub distance_km: f64,
}

fn check_hours(v: &mut Validator, hours: &BTreeMap<Weekday, OpeningHours>) {
    let all_valid = hours
        .values()
        .all(|h| is_valid_time(&h.open) && is_valid_time(&h.close));
    v.check(all_valid, "Operating hours must use HH:MM format");
}

fn geocoding_error(e: GatewayError) -> DomainError {
    DomainError::Geocoding(e)
}

pub struct BranchService<S: Store> {
    store: S,
    geocoder: Arc<dyn Geocoder>,
}

impl<S: Store> BranchService<S> {
    pub fn new(store: S, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { store, geocoder }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: BranchQuery) -> Result<Page<Branch>> {
        Ok(self.store.list_branches(&query).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: BranchId) -> Result<Branch> {
        self.store
            .find_branch(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Branch", id))
    }

    /// Creates a branch, geocoding its address.
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewBranch) -> Result<Branch> {
        let mut v = Validator::new();
        v.length("Branch name", &input.name, 2, 200)
            .min_length("Address", &input.address, 10)
            .phone("Phone", &input.phone);
        check_hours(&mut v, &input.operating_hours);
        v.finish()?;

        let address = input.address.trim().to_string();
        let resolved = self
            .geocoder
            .geocode(&address)
            .await
            .map_err(geocoding_error)?;

        let now = Utc::now();
        let branch = Branch {
            id: BranchId::new(),
            name: input.name.trim().to_string(),
            address,
            phone: input.phone.trim().to_string(),
            location: resolved.location,
            formatted_address: resolved.formatted_address,
            is_active: input.is_active.unwrap_or(true),
            operating_hours: input.operating_hours,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_branch(&branch).await?;
        info!(branch_id = %branch.id, "Branch created");
        Ok(branch)
    }

    /// Updates a branch. The address is geocoded again only when it changes.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update(&self, id: BranchId, changes: BranchChanges) -> Result<Branch> {
        let mut v = Validator::new();
        if let Some(ref name) = changes.name {
            v.length("Branch name", name, 2, 200);
        }
        if let Some(ref address) = changes.address {
            v.min_length("Address", address, 10);
        }
        if let Some(ref phone) = changes.phone {
            v.phone("Phone", phone);
        }
        if let Some(ref hours) = changes.operating_hours {
            check_hours(&mut v, hours);
        }
        v.finish()?;

        let mut branch = self.get(id).await?;

        if let Some(address) = changes.address {
            let address = address.trim().to_string();
            if address != branch.address {
                let resolved = self
                    .geocoder
                    .geocode(&address)
                    .await
                    .map_err(geocoding_error)?;
                branch.location = resolved.location;
                branch.formatted_address = resolved.formatted_address;
                branch.address = address;
            }
        }
        if let Some(name) = changes.name {
            branch.name = name.trim().to_string();
        }
        if let Some(phone) = changes.phone {
            branch.phone = phone.trim().to_string();
        }
        if let Some(hours) = changes.operating_hours {
            branch.operating_hours = hours;
        }
        if let Some(active) = changes.is_active {
            branch.is_active = active;
        }
        branch.updated_at = Utc::now();

        self.store.update_branch(&branch).await?;
        Ok(branch)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: BranchId) -> Result<()> {
        self.store.delete_branch(id).await?;
        info!(branch_id = %id, "Branch deleted");
        Ok(())
    }

    /// Active branches within `radius_km` of a point, nearest first.
    #[tracing::instrument(skip(self))]
    pub async fn nearby(&self, lat: f64, lng: f64, radius_km: Option<f64>) -> Result<Vec<NearbyBranch>> {
        let origin = GeoPoint::new(lat, lng);
        let radius = radius_km.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);

        let mut v = Validator::new();
        v.check(origin.is_valid(), "Latitude must be within [-90, 90] and longitude within [-180, 180]")
            .check(
                radius.is_finite() && radius > 0.0 && radius <= MAX_NEARBY_RADIUS_KM,
                format!("Radius must be greater than 0 and at most {MAX_NEARBY_RADIUS_KM} km"),
            );
        v.finish()?;

        let mut nearby: Vec<_> = self
            .store
            .active_branches()
            .await?
            .into_iter()
            .map(|branch| NearbyBranch {
                distance_km: origin.distance_km(&branch.location),
                branch,
            })
            .filter(|n| n.distance_km <= radius)
            .collect();
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        Ok(nearby)
    }
}
