use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{AuthUser, Caller, Role};
use crate::store;
use crate::AppState;

const SESSION_COOKIE: &str = "session_token";

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let cookie = || {
        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .split(';')
            .filter_map(|c| c.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
            .next()
    };

    bearer
        .or_else(cookie)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(ApiError::Unauthenticated)?;
        store::users::find_by_session(&state.db, &token)
            .await?
            .ok_or(ApiError::Unauthenticated)
    }
}

/// The authenticated user acting through the seller or buyer router. The router
/// attaches its [`Role`] as a request extension.
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let role = parts
            .extensions
            .get::<Role>()
            .copied()
            .ok_or(ApiError::NotFound("Inbox"))?;
        let user = AuthUser::from_request_parts(parts, state).await?;

        if user.role != role {
            return Err(ApiError::Forbidden(format!(
                "Only {} accounts can use the {} inbox",
                role, role
            )));
        }

        Ok(Caller { user, role })
    }
}
