use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt::{self, TokenError};

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication. Ownership
/// checks against resources happen in the handler body.
pub struct AuthUser {
    pub user_id: i32,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims =
            jwt::verify(token, &state.config.auth.jwt_secret).map_err(|e| match e {
                // Expired and malformed tokens produce the same 401, but are
                // distinguished in logs.
                TokenError::Expired => {
                    tracing::debug!("Rejected expired token");
                    AppError::TokenInvalid
                }
                TokenError::Invalid(err) => {
                    tracing::debug!("Rejected invalid token: {}", err);
                    AppError::TokenInvalid
                }
            })?;

        Ok(AuthUser {
            user_id: claims.uid,
        })
    }
}
