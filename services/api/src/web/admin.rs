//! services/api/src/web/admin.rs
//!
//! Administrator endpoints: account pre-registration, activation toggling,
//! senior creation with assignments, and session cancellation.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::auth::UserInfo;
use crate::web::caregiver::{SeniorView, SessionView};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use goodhands_core::domain::UserRole;
use goodhands_core::ports::{NewSchedule, NewSenior, NewUser};

//=========================================================================================
// Validation
//=========================================================================================

/// User codes look like `CG001`: two uppercase letters and three digits.
fn user_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{2}[0-9]{3}$").unwrap())
}

/// At least 8 characters with both a letter and a digit.
fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < 8
        || !password.chars().any(|c| c.is_ascii_alphabetic())
        || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(ApiError::Validation(
            "password must be at least 8 characters and contain a letter and a digit".to_string(),
        ));
    }
    Ok(())
}

fn require_admin(auth: &AuthUser) -> Result<(), ApiError> {
    auth.require_role(UserRole::Administrator).map(|_| ())
}

//=========================================================================================
// User Pre-Registration
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub user_code: String,
    #[schema(value_type = String)]
    pub user_type: UserRole,
    pub name: String,
    pub password: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Guardian-only fields.
    pub country: Option<String>,
    pub relationship: Option<String>,
}

/// POST /api/admin/users - Pre-register an account.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserInfo),
        (status = 403, description = "Caller is not an administrator"),
        (status = 409, description = "User code already exists"),
        (status = 422, description = "Invalid user code or password"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;

    if !user_code_pattern().is_match(&req.user_code) {
        return Err(ApiError::Validation(
            "user_code must be two uppercase letters followed by three digits".to_string(),
        ));
    }
    validate_password(&req.password)?;
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hashed_password = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))?
        .to_string();

    let user = state
        .store
        .create_user(NewUser {
            user_code: req.user_code,
            role: req.user_type,
            name: req.name,
            phone: req.phone,
            email: req.email,
            hashed_password,
            country: req.country,
            relationship: req.relationship,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserInfo::from(user))))
}

#[derive(Serialize, ToSchema)]
pub struct ActivationResponse {
    pub user_id: i64,
    pub is_active: bool,
}

/// PUT /api/admin/users/{id}/activate - Re-enable a deactivated account.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/activate",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Account activated", body = ActivationResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Unknown user"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn activate_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;
    state.store.set_user_active(user_id, true).await?;
    Ok(Json(ActivationResponse {
        user_id,
        is_active: true,
    }))
}

/// PUT /api/admin/users/{id}/deactivate - Disable an account. In-flight
/// tokens stop working on the next request.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/deactivate",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Account deactivated", body = ActivationResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Unknown user"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn deactivate_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;
    state.store.set_user_active(user_id, false).await?;
    Ok(Json(ActivationResponse {
        user_id,
        is_active: false,
    }))
}

//=========================================================================================
// Senior Creation
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateSeniorRequest {
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub photo: Option<String>,
    pub caregiver_id: i64,
    #[serde(default)]
    pub guardian_ids: Vec<i64>,
    #[serde(default)]
    pub diseases: Vec<String>,
}

/// POST /api/admin/seniors - Create a senior with disease tags and guardian
/// assignments in one unit.
#[utoipa::path(
    post,
    path = "/api/admin/seniors",
    request_body = CreateSeniorRequest,
    responses(
        (status = 201, description = "Senior created", body = SeniorView),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Unknown caregiver"),
        (status = 422, description = "Invalid senior data"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_senior_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateSeniorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    if let Some(age) = req.age {
        if !(0..=130).contains(&age) {
            return Err(ApiError::Validation("age is out of range".to_string()));
        }
    }
    // Fails 404 early if the caregiver does not exist.
    state.store.caregiver_by_id(req.caregiver_id).await?;

    let senior = state
        .store
        .create_senior(NewSenior {
            name: req.name,
            age: req.age,
            gender: req.gender,
            photo: req.photo,
            caregiver_id: req.caregiver_id,
            guardian_ids: req.guardian_ids,
            diseases: req.diseases,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SeniorView::from(senior))))
}

//=========================================================================================
// Weekly Schedule Registration
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateScheduleRequest {
    pub caregiver_id: i64,
    pub senior_id: i64,
    /// 0 = Sunday through 6 = Saturday.
    pub day_of_week: u8,
    /// `HH:MM`, 24-hour clock.
    pub start_time: String,
    pub end_time: String,
}

#[derive(Serialize, ToSchema)]
pub struct ScheduleResponse {
    pub id: i64,
    pub caregiver_id: i64,
    pub senior_id: i64,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

/// POST /api/admin/schedules - Register a recurring weekly visit slot for a
/// (caregiver, senior) pair.
#[utoipa::path(
    post,
    path = "/api/admin/schedules",
    request_body = CreateScheduleRequest,
    responses(
        (status = 201, description = "Schedule created", body = ScheduleResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Unknown caregiver or senior"),
        (status = 409, description = "The slot already exists"),
        (status = 422, description = "Invalid weekday, times, or assignment"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;

    if req.day_of_week > 6 {
        return Err(ApiError::Validation(
            "day_of_week must be 0 (Sunday) through 6 (Saturday)".to_string(),
        ));
    }
    let start = chrono::NaiveTime::parse_from_str(&req.start_time, "%H:%M")
        .map_err(|_| ApiError::Validation("start_time must be HH:MM".to_string()))?;
    let end = chrono::NaiveTime::parse_from_str(&req.end_time, "%H:%M")
        .map_err(|_| ApiError::Validation("end_time must be HH:MM".to_string()))?;
    if start >= end {
        return Err(ApiError::Validation(
            "start_time must be before end_time".to_string(),
        ));
    }

    state.store.caregiver_by_id(req.caregiver_id).await?;
    let senior = state.store.senior_by_id(req.senior_id).await?;
    if senior.caregiver_id != req.caregiver_id {
        return Err(ApiError::Validation(
            "This senior is not assigned to that caregiver".to_string(),
        ));
    }

    let schedule = state
        .store
        .create_schedule(NewSchedule {
            caregiver_id: req.caregiver_id,
            senior_id: req.senior_id,
            day_of_week: req.day_of_week,
            start_time: req.start_time,
            end_time: req.end_time,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ScheduleResponse {
            id: schedule.id,
            caregiver_id: schedule.caregiver_id,
            senior_id: schedule.senior_id,
            day_of_week: schedule.day_of_week,
            start_time: schedule.start_time,
            end_time: schedule.end_time,
        }),
    ))
}

//=========================================================================================
// Session Cancellation
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CancelSessionRequest {
    pub reason: String,
}

/// POST /api/admin/sessions/{id}/cancel - Terminally cancel an in-progress
/// session, recording the reason.
#[utoipa::path(
    post,
    path = "/api/admin/sessions/{id}/cancel",
    params(("id" = i64, Path, description = "Session id")),
    request_body = CancelSessionRequest,
    responses(
        (status = 200, description = "Session cancelled", body = SessionView),
        (status = 400, description = "Session is not in progress"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Unknown session"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn cancel_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<i64>,
    Json(req): Json<CancelSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;
    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::Validation("reason must not be empty".to_string()));
    }
    let session = state.store.cancel_session(session_id, reason).await?;
    Ok(Json(SessionView::from(session)))
}
