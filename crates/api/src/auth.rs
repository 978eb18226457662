//! Bearer-token extractors.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use domain::{DomainError, Principal};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

/// Any signed-in caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub principal: Principal,
    /// The raw token the request carried, needed to end this session.
    pub token: String,
}

/// A signed-in administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Principal);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(DomainError::Unauthenticated)?;
        let principal = state.accounts.authenticate(token).await?;
        Ok(CurrentUser {
            principal,
            token: token.to_string(),
        })
    }
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.principal.is_admin() {
            return Err(DomainError::Forbidden.into());
        }
        Ok(AdminUser(user.principal))
    }
}
