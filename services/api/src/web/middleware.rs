//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::auth::Claims;
use crate::web::state::AppState;
use goodhands_core::domain::{User, UserRole};

/// The authenticated caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Middleware that validates the Bearer token and re-loads the user.
///
/// The account is re-checked on every request: a token issued before
/// deactivation stops working immediately, not at expiry.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthenticated("Missing Bearer token".to_string()))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated("Invalid or expired token".to_string()))?
    .claims;

    let user = state
        .store
        .user_by_id(claims.sub)
        .await
        .map_err(|_| ApiError::Unauthenticated("Invalid or expired token".to_string()))?;
    if !user.is_active {
        return Err(ApiError::Unauthenticated(
            "This account has been deactivated".to_string(),
        ));
    }

    req.extensions_mut().insert(AuthUser(user));
    Ok(next.run(req).await)
}

impl AuthUser {
    /// Fails with 403 unless the caller has `role`.
    pub fn require_role(&self, role: UserRole) -> Result<&User, ApiError> {
        if self.0.role == role {
            Ok(&self.0)
        } else {
            Err(ApiError::Forbidden(format!(
                "This endpoint requires the {} role",
                role.as_str()
            )))
        }
    }
}
