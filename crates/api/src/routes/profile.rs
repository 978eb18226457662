//! The caller's own profile.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use domain::ProfileChanges;
use serde::Deserialize;
use store::Store;

use super::auth::UserResponse;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::response::{self, ApiResponse};

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

/// GET /api/v1/profile
#[tracing::instrument(skip(state, user), fields(user_id = %user.principal.user_id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let profile = state.accounts.profile(user.principal.user_id).await?;
    Ok(response::ok(profile.into()))
}

/// PUT /api/v1/profile
#[tracing::instrument(skip(state, user, payload), fields(user_id = %user.principal.user_id))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let Json(req) = payload?;
    let profile = state
        .accounts
        .update_profile(
            user.principal.user_id,
            ProfileChanges {
                name: req.name,
                phone: req.phone,
                avatar: req.avatar,
            },
        )
        .await?;
    Ok(response::ok(profile.into()))
}
