//! Branch endpoints, including the proximity search.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{BranchId, GeoPoint, PageRequest};
use domain::{BranchChanges, NearbyBranch, NewBranch};
use serde::{Deserialize, Serialize};
use store::{Branch, BranchQuery, OpeningHours, Store, Weekday};

use super::parse_id;
use crate::AppState;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::response::{self, ApiResponse};

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBranchesParams {
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyParams {
    pub lat: f64,
    pub lng: f64,
    pub radius: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub operating_hours: BTreeMap<Weekday, OpeningHours>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBranchRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub operating_hours: Option<BTreeMap<Weekday, OpeningHours>>,
    pub is_active: Option<bool>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchResponse {
    pub id: BranchId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub location: GeoPoint,
    pub formatted_address: String,
    pub is_active: bool,
    pub operating_hours: BTreeMap<Weekday, OpeningHours>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Branch> for BranchResponse {
    fn from(b: Branch) -> Self {
        Self {
            id: b.id,
            name: b.name,
            address: b.address,
            phone: b.phone,
            location: b.location,
            formatted_address: b.formatted_address,
            is_active: b.is_active,
            operating_hours: b.operating_hours,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyBranchResponse {
    #[serde(flatten)]
    pub branch: BranchResponse,
    /// Kilometres, rounded to two decimals.
    pub distance: f64,
}

impl From<NearbyBranch> for NearbyBranchResponse {
    fn from(n: NearbyBranch) -> Self {
        Self {
            branch: n.branch.into(),
            distance: (n.distance_km * 100.0).round() / 100.0,
        }
    }
}

// -- Handlers --

/// GET /api/v1/branches
#[tracing::instrument(skip(state, params))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<ListBranchesParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<BranchResponse>>>, ApiError> {
    let Query(params) = params?;
    let branches = state
        .branches
        .list(BranchQuery {
            is_active: params.is_active,
            search: params.search.filter(|s| !s.trim().is_empty()),
            page: PageRequest::new(params.page, params.limit),
        })
        .await?;
    Ok(response::page(branches.map(BranchResponse::from)))
}

/// GET /api/v1/branches/nearby?lat=..&lng=..&radius=..
#[tracing::instrument(skip(state, params))]
pub async fn nearby<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<NearbyParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<NearbyBranchResponse>>>, ApiError> {
    let Query(params) = params?;
    let branches = state
        .branches
        .nearby(params.lat, params.lng, params.radius)
        .await?;
    Ok(response::ok(branches.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/branches/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BranchResponse>>, ApiError> {
    let branch = state.branches.get(parse_id(&id)?).await?;
    Ok(response::ok(branch.into()))
}

/// POST /api/v1/branches
#[tracing::instrument(skip(state, admin, payload), fields(admin = %admin.0.user_id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    payload: Result<Json<CreateBranchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<BranchResponse>>), ApiError> {
    let Json(req) = payload?;
    let branch = state
        .branches
        .create(NewBranch {
            name: req.name,
            address: req.address,
            phone: req.phone,
            operating_hours: req.operating_hours,
            is_active: req.is_active,
        })
        .await?;
    Ok(response::created(branch.into()))
}

/// PUT /api/v1/branches/{id}
#[tracing::instrument(skip(state, admin, payload), fields(admin = %admin.0.user_id))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBranchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<BranchResponse>>, ApiError> {
    let Json(req) = payload?;
    let branch = state
        .branches
        .update(
            parse_id(&id)?,
            BranchChanges {
                name: req.name,
                address: req.address,
                phone: req.phone,
                operating_hours: req.operating_hours,
                is_active: req.is_active,
            },
        )
        .await?;
    Ok(response::ok(branch.into()))
}

/// DELETE /api/v1/branches/{id}
#[tracing::instrument(skip(state, admin), fields(admin = %admin.0.user_id))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.branches.delete(parse_id(&id)?).await?;
    Ok(response::message("Branch deleted successfully"))
}
