//! Registration, login, logout and password reset endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::UserId;
use domain::Registration;
use serde::{Deserialize, Serialize};
use store::{Role, Store, User};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::response::{self, ApiResponse};

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

// -- Response types --

/// Public view of an account. The password hash never leaves the server.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email.into_inner(),
            phone: user.phone,
            role: user.role,
            avatar: user.avatar,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// There is no mail channel, so the reset token is returned to the caller.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTicketResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutAllResponse {
    pub sessions_ended: u64,
}

// -- Handlers --

/// POST /api/v1/auth/register
#[tracing::instrument(skip(state, payload))]
pub async fn register<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let Json(req) = payload?;
    let user = state
        .accounts
        .register(Registration {
            name: req.name,
            email: req.email,
            phone: req.phone,
            password: req.password,
        })
        .await?;
    Ok(response::created(user.into()))
}

/// POST /api/v1/auth/login
#[tracing::instrument(skip(state, payload))]
pub async fn login<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let Json(req) = payload?;
    let outcome = state.accounts.login(&req.email, &req.password).await?;
    Ok(response::ok(LoginResponse {
        user: outcome.user.into(),
        token: outcome.token,
        expires_at: outcome.expires_at,
    }))
}

/// POST /api/v1/auth/logout: ends the session the request was made with.
#[tracing::instrument(skip(state, user), fields(user_id = %user.principal.user_id))]
pub async fn logout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.accounts.logout(&user.token).await?;
    Ok(response::message("Logged out successfully"))
}

/// POST /api/v1/auth/logout-all: ends every session of the caller.
#[tracing::instrument(skip(state, user), fields(user_id = %user.principal.user_id))]
pub async fn logout_all<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<LogoutAllResponse>>, ApiError> {
    let sessions_ended = state.accounts.logout_all(user.principal.user_id).await?;
    Ok(response::ok(LogoutAllResponse { sessions_ended }))
}

/// POST /api/v1/auth/forgot-password
#[tracing::instrument(skip(state, payload))]
pub async fn forgot_password<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ResetTicketResponse>>, ApiError> {
    let Json(req) = payload?;
    let ticket = state.accounts.forgot_password(&req.email).await?;
    Ok(response::ok(ResetTicketResponse {
        token: ticket.token,
        expires_at: ticket.expires_at,
    }))
}

/// POST /api/v1/auth/reset-password: sets a new password and signs out
/// every device.
#[tracing::instrument(skip(state, payload))]
pub async fn reset_password<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(req) = payload?;
    state.accounts.reset_password(&req.token, &req.password).await?;
    Ok(response::message("Password reset successfully"))
}
