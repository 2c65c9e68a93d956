//! services/api/src/web/auth.rs
//!
//! Login endpoint and the access-token claims it issues.

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use axum::{extract::State, response::IntoResponse, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::state::AppState;
use goodhands_core::domain::{User, UserRole};
use goodhands_core::ports::PortError;

//=========================================================================================
// Token Claims
//=========================================================================================

/// The claims carried by every access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub code: String,
    pub role: UserRole,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

pub fn issue_token(user: &User, secret: &str, minutes: i64) -> Result<(String, i64), ApiError> {
    let expires_in = minutes * 60;
    let claims = Claims {
        sub: user.id,
        code: user.user_code.clone(),
        role: user.role,
        exp: (Utc::now() + Duration::minutes(minutes)).timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((token, expires_in))
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub user_code: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    #[schema(value_type = String)]
    pub user_type: UserRole,
    pub user_info: UserInfo,
}

#[derive(Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i64,
    pub user_code: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            user_code: user.user_code,
            name: user.name,
            phone: user.phone,
            email: user.email,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/login - Exchange a user code and password for an access token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Unknown code, wrong password, or deactivated account"),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // An unknown code and a wrong password produce the same answer, so the
    // endpoint cannot be used to probe which codes exist.
    const BAD_CREDENTIALS: &str = "Invalid user code or password";

    let creds = match state.store.user_credentials_by_code(&req.user_code).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => {
            return Err(ApiError::Unauthenticated(BAD_CREDENTIALS.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let parsed_hash = PasswordHash::new(&creds.hashed_password)
        .map_err(|e| ApiError::Internal(format!("stored hash is malformed: {e}")))?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(ApiError::Unauthenticated(BAD_CREDENTIALS.to_string()));
    }

    if !creds.user.is_active {
        return Err(ApiError::Unauthenticated(
            "This account has been deactivated".to_string(),
        ));
    }

    let (access_token, expires_in) = issue_token(
        &creds.user,
        &state.config.jwt_secret,
        state.config.access_token_minutes,
    )?;

    Ok(Json(LoginResponse {
        access_token,
        expires_in,
        user_type: creds.user.role,
        user_info: creds.user.into(),
    }))
}
