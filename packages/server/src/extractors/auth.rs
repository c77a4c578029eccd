use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated owner extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication. Every row a
/// handler reads or writes is scoped to `user_id`.
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
}

impl AuthUser {
    /// `NotFound` unless the row belongs to this user, so other owners' rows
    /// are indistinguishable from missing ones.
    pub fn require_owner(&self, owner_id: i32, what: &str, id: i32) -> Result<(), AppError> {
        if owner_id == self.user_id {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("{what} {id} not found")))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims = jwt::verify(&state.config.auth.jwt_secret, token)
            .map_err(|_| AppError::TokenInvalid)?;

        Ok(AuthUser {
            user_id: claims.uid,
            username: claims.sub,
        })
    }
}
