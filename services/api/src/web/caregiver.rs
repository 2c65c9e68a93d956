//! services/api/src/web/caregiver.rs
//!
//! Caregiver-facing endpoints: the home screen, attendance check-in/out with
//! photo and GPS evidence, and checklist / care-note capture.

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::adapters::photos::validated_extension;
use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use goodhands_core::checklist::{score_answer, questions_for_diseases, AnswerPayload, QuestionKey};
use goodhands_core::domain::{
    AttendanceEvidence, CareNoteKind, CareSession, CaregiverProfile, GpsPoint, Senior,
    SessionStatus, UserRole,
};
use goodhands_core::ports::{NewCareNote, NewChecklistResponse};

//=========================================================================================
// Response Views
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct SeniorView {
    pub id: i64,
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub photo: Option<String>,
    pub diseases: Vec<String>,
}

impl From<Senior> for SeniorView {
    fn from(s: Senior) -> Self {
        Self {
            id: s.id,
            name: s.name,
            age: s.age,
            gender: s.gender,
            photo: s.photo,
            diseases: s.diseases,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SessionView {
    pub id: i64,
    pub senior_id: i64,
    #[schema(value_type = String)]
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_location: String,
    pub end_location: Option<String>,
    pub start_photo: String,
    pub end_photo: Option<String>,
}

impl From<CareSession> for SessionView {
    fn from(s: CareSession) -> Self {
        Self {
            id: s.id,
            senior_id: s.senior_id,
            status: s.status,
            start_time: s.start_time,
            end_time: s.end_time,
            start_location: s.start_location,
            end_location: s.end_location,
            start_photo: s.start_photo,
            end_photo: s.end_photo,
        }
    }
}

/// One of today's planned visit slots on the home screen.
#[derive(Serialize, ToSchema)]
pub struct ScheduleView {
    pub senior_id: i64,
    pub senior_name: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Serialize, ToSchema)]
pub struct CaregiverHomeResponse {
    pub caregiver_name: String,
    pub seniors: Vec<SeniorView>,
    pub today_schedule: Vec<ScheduleView>,
    pub today_sessions: Vec<SessionView>,
    pub seniors_assigned: usize,
    pub sessions_completed_this_week: i64,
    pub unread_notifications: usize,
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Loads the caller's caregiver profile; non-caregivers get 403.
pub async fn caregiver_profile(
    state: &AppState,
    auth: &AuthUser,
) -> Result<CaregiverProfile, ApiError> {
    let user = auth.require_role(UserRole::Caregiver)?;
    Ok(state.store.caregiver_by_user(user.id).await?)
}

/// One uploaded photo plus the text fields that accompany it.
struct AttendanceForm {
    id_field: i64,
    location: String,
    gps: GpsPoint,
    photo_name: String,
    photo_data: bytes::Bytes,
}

/// Pulls the attendance multipart fields out of the request.
///
/// `id_name` is the numeric field that differs between check-in (`senior_id`)
/// and check-out (`session_id`).
async fn read_attendance_form(
    mut multipart: Multipart,
    id_name: &str,
    max_photo_bytes: usize,
) -> Result<AttendanceForm, ApiError> {
    let mut id_field = None;
    let mut location = None;
    let mut gps_lat = None;
    let mut gps_lng = None;
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == id_name {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            id_field = Some(text.parse::<i64>().map_err(|_| {
                ApiError::Validation(format!("{id_name} must be an integer"))
            })?);
        } else if name == "location" {
            location = Some(
                field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?,
            );
        } else if name == "gps_lat" || name == "gps_lng" {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            let value = text
                .parse::<f64>()
                .map_err(|_| ApiError::Validation(format!("{name} must be a number")))?;
            if name == "gps_lat" {
                gps_lat = Some(value);
            } else {
                gps_lng = Some(value);
            }
        } else if name == "photo" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            photo = Some((file_name, data));
        }
    }

    let id_field = id_field
        .ok_or_else(|| ApiError::Validation(format!("Missing field: {id_name}")))?;
    let location =
        location.ok_or_else(|| ApiError::Validation("Missing field: location".to_string()))?;
    if location.trim().is_empty() {
        return Err(ApiError::Validation("location must not be empty".to_string()));
    }
    let gps = GpsPoint {
        lat: gps_lat
            .ok_or_else(|| ApiError::Validation("Missing field: gps_lat".to_string()))?,
        lng: gps_lng
            .ok_or_else(|| ApiError::Validation("Missing field: gps_lng".to_string()))?,
    };
    if !gps.is_valid() {
        return Err(ApiError::Validation(
            "GPS coordinates are out of range".to_string(),
        ));
    }

    let (photo_name, photo_data) =
        photo.ok_or_else(|| ApiError::Validation("Missing field: photo".to_string()))?;
    if photo_data.is_empty() {
        return Err(ApiError::Validation("photo must not be empty".to_string()));
    }
    if photo_data.len() > max_photo_bytes {
        return Err(ApiError::Validation(format!(
            "photo exceeds the {max_photo_bytes} byte limit"
        )));
    }
    if validated_extension(&photo_name).is_none() {
        return Err(ApiError::Validation(
            "photo must be one of: jpg, jpeg, png, gif, webp".to_string(),
        ));
    }

    Ok(AttendanceForm {
        id_field,
        location,
        gps,
        photo_name,
        photo_data,
    })
}

/// A session the caller may still attach checklist answers or notes to:
/// `in_progress`, or `completed` with no report generated yet.
async fn ensure_submission_window(
    state: &AppState,
    session: &CareSession,
) -> Result<(), ApiError> {
    match session.status {
        SessionStatus::InProgress => Ok(()),
        SessionStatus::Completed => {
            if state.store.report_for_session(session.id).await?.is_some() {
                Err(ApiError::InvalidState(
                    "A report has already been generated for this session".to_string(),
                ))
            } else {
                Ok(())
            }
        }
        SessionStatus::Cancelled => Err(ApiError::InvalidState(
            "This session has been cancelled".to_string(),
        )),
    }
}

/// Loads a session, hiding other caregivers' sessions behind 404.
async fn owned_session(
    state: &AppState,
    caregiver_id: i64,
    session_id: i64,
) -> Result<CareSession, ApiError> {
    let session = state.store.session_by_id(session_id).await?;
    if session.caregiver_id != caregiver_id {
        return Err(ApiError::NotFound(format!(
            "care session {session_id} not found"
        )));
    }
    Ok(session)
}

//=========================================================================================
// Home & Template Handlers
//=========================================================================================

/// GET /api/caregiver/home - Today's overview for the calling caregiver.
#[utoipa::path(
    get,
    path = "/api/caregiver/home",
    responses(
        (status = 200, description = "Home screen data", body = CaregiverHomeResponse),
        (status = 403, description = "Caller is not a caregiver"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn caregiver_home_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = caregiver_profile(&state, &auth).await?;

    let seniors = state.store.seniors_for_caregiver(profile.id).await?;
    let today = Utc::now().weekday().num_days_from_sunday() as u8;
    let schedules = state
        .store
        .schedules_for_caregiver_on(profile.id, today)
        .await?;
    let today_sessions = state
        .store
        .sessions_for_caregiver_today(profile.id)
        .await?;
    let week_ago = Utc::now() - Duration::days(7);
    let completed_this_week = state
        .store
        .completed_sessions_since(profile.id, week_ago)
        .await?;
    let unread = state
        .store
        .notifications_for_user(auth.0.id, true, 100)
        .await?;

    let names: HashMap<i64, String> = seniors
        .iter()
        .map(|s| (s.id, s.name.clone()))
        .collect();
    let today_schedule = schedules
        .into_iter()
        .map(|s| ScheduleView {
            senior_id: s.senior_id,
            senior_name: names.get(&s.senior_id).cloned().unwrap_or_default(),
            start_time: s.start_time,
            end_time: s.end_time,
        })
        .collect();

    Ok(Json(CaregiverHomeResponse {
        caregiver_name: profile.name,
        seniors_assigned: seniors.len(),
        seniors: seniors.into_iter().map(SeniorView::from).collect(),
        today_schedule,
        today_sessions: today_sessions.into_iter().map(SessionView::from).collect(),
        sessions_completed_this_week: completed_this_week,
        unread_notifications: unread.len(),
    }))
}

#[derive(Serialize, ToSchema)]
pub struct TemplateQuestion {
    pub question_key: String,
    pub question_text: String,
    pub category: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChecklistTemplateResponse {
    pub senior_id: i64,
    pub questions: Vec<TemplateQuestion>,
}

/// GET /api/caregiver/checklist-template/{senior_id} - The common questions
/// plus the disease-specific groups that apply to this senior.
#[utoipa::path(
    get,
    path = "/api/caregiver/checklist-template/{senior_id}",
    params(("senior_id" = i64, Path, description = "Senior id")),
    responses(
        (status = 200, description = "Applicable questions", body = ChecklistTemplateResponse),
        (status = 403, description = "Senior is not assigned to the caller"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn checklist_template_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(senior_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = caregiver_profile(&state, &auth).await?;
    let senior = state.store.senior_by_id(senior_id).await?;
    if senior.caregiver_id != profile.id {
        return Err(ApiError::Forbidden(
            "This senior is not assigned to you".to_string(),
        ));
    }

    let questions = questions_for_diseases(senior.diseases.iter().map(String::as_str))
        .into_iter()
        .map(|q| TemplateQuestion {
            question_key: q.key.as_str().to_string(),
            question_text: q.text.to_string(),
            category: q.category.as_str().to_string(),
        })
        .collect();

    Ok(Json(ChecklistTemplateResponse {
        senior_id,
        questions,
    }))
}

//=========================================================================================
// Attendance Handlers
//=========================================================================================

/// POST /api/caregiver/attendance/checkin - Start a care session with photo
/// and GPS evidence.
#[utoipa::path(
    post,
    path = "/api/caregiver/attendance/checkin",
    responses(
        (status = 201, description = "Session started", body = SessionView),
        (status = 403, description = "Senior is not assigned to the caller"),
        (status = 409, description = "An in-progress session already exists"),
        (status = 422, description = "Missing or invalid evidence"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn checkin_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let profile = caregiver_profile(&state, &auth).await?;
    let form =
        read_attendance_form(multipart, "senior_id", state.config.max_upload_bytes).await?;

    let senior = state.store.senior_by_id(form.id_field).await?;
    if senior.caregiver_id != profile.id {
        return Err(ApiError::Forbidden(
            "This senior is not assigned to you".to_string(),
        ));
    }

    // Photo first, row second. If the row loses the uniqueness race the
    // photo is cleaned up.
    let photo_path = state
        .photos
        .save("checkin", &form.photo_name, &form.photo_data)
        .await?;
    let evidence = AttendanceEvidence {
        location: form.location,
        gps: form.gps,
        photo_path: photo_path.clone(),
    };
    let session = match state
        .store
        .create_session(profile.id, senior.id, evidence)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            state.photos.remove(&photo_path).await.ok();
            return Err(e.into());
        }
    };

    Ok((
        axum::http::StatusCode::CREATED,
        Json(SessionView::from(session)),
    ))
}

/// POST /api/caregiver/attendance/checkout - Complete an in-progress session.
#[utoipa::path(
    post,
    path = "/api/caregiver/attendance/checkout",
    responses(
        (status = 200, description = "Session completed", body = SessionView),
        (status = 400, description = "Session is not in progress"),
        (status = 404, description = "Unknown or unowned session"),
        (status = 422, description = "Missing or invalid evidence"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let profile = caregiver_profile(&state, &auth).await?;
    let form =
        read_attendance_form(multipart, "session_id", state.config.max_upload_bytes).await?;

    let photo_path = state
        .photos
        .save("checkout", &form.photo_name, &form.photo_data)
        .await?;
    let evidence = AttendanceEvidence {
        location: form.location,
        gps: form.gps,
        photo_path: photo_path.clone(),
    };
    let session = match state
        .store
        .complete_session(form.id_field, profile.id, evidence)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            state.photos.remove(&photo_path).await.ok();
            return Err(e.into());
        }
    };

    Ok(Json(SessionView::from(session)))
}

//=========================================================================================
// Checklist & Care Note Handlers
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ChecklistItem {
    pub question_key: String,
    /// Raw answer payload; its shape depends on the question.
    pub answer: serde_json::Value,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChecklistSubmission {
    pub session_id: i64,
    pub senior_id: i64,
    pub responses: Vec<ChecklistItem>,
}

#[derive(Serialize, ToSchema)]
pub struct ChecklistSubmissionResponse {
    pub session_id: i64,
    pub saved: usize,
}

/// POST /api/caregiver/checklist - Append a batch of scored answers.
#[utoipa::path(
    post,
    path = "/api/caregiver/checklist",
    request_body = ChecklistSubmission,
    responses(
        (status = 201, description = "Responses saved", body = ChecklistSubmissionResponse),
        (status = 400, description = "Session is outside the submission window"),
        (status = 409, description = "A question was already answered for this session"),
        (status = 422, description = "Unknown key or answer shape mismatch"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_checklist_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChecklistSubmission>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = caregiver_profile(&state, &auth).await?;
    let session = owned_session(&state, profile.id, req.session_id).await?;
    if session.senior_id != req.senior_id {
        return Err(ApiError::Validation(
            "senior_id does not match the session".to_string(),
        ));
    }
    ensure_submission_window(&state, &session).await?;

    if req.responses.is_empty() {
        return Err(ApiError::Validation(
            "responses must not be empty".to_string(),
        ));
    }

    // Validate and score everything before anything is written.
    let mut rows = Vec::with_capacity(req.responses.len());
    for item in &req.responses {
        let key = QuestionKey::parse(&item.question_key).ok_or_else(|| {
            ApiError::Validation(format!("Unknown question key: {}", item.question_key))
        })?;
        let answer = AnswerPayload::parse(key, &item.answer)?;
        let score = score_answer(key, &answer)?;
        let spec = key.spec();
        rows.push(NewChecklistResponse {
            question_key: key,
            question_text: spec.text.to_string(),
            category: spec.category,
            answer,
            notes: item.notes.clone(),
            score,
        });
    }

    let saved = rows.len();
    state
        .store
        .insert_checklist_responses(session.id, rows)
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(ChecklistSubmissionResponse {
            session_id: session.id,
            saved,
        }),
    ))
}

#[derive(Deserialize, ToSchema)]
pub struct CareNoteItem {
    pub question_type: String,
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CareNoteSubmission {
    pub session_id: i64,
    pub senior_id: i64,
    pub notes: Vec<CareNoteItem>,
}

#[derive(Serialize, ToSchema)]
pub struct CareNoteSubmissionResponse {
    pub session_id: i64,
    pub saved: usize,
}

const MAX_NOTE_CHARS: usize = 1000;

/// POST /api/caregiver/care-note - Append free-text observations.
#[utoipa::path(
    post,
    path = "/api/caregiver/care-note",
    request_body = CareNoteSubmission,
    responses(
        (status = 201, description = "Notes saved", body = CareNoteSubmissionResponse),
        (status = 400, description = "Session is outside the submission window"),
        (status = 422, description = "Unknown note type or invalid content"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_care_notes_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CareNoteSubmission>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = caregiver_profile(&state, &auth).await?;
    let session = owned_session(&state, profile.id, req.session_id).await?;
    if session.senior_id != req.senior_id {
        return Err(ApiError::Validation(
            "senior_id does not match the session".to_string(),
        ));
    }
    ensure_submission_window(&state, &session).await?;

    if req.notes.is_empty() || req.notes.len() > 10 {
        return Err(ApiError::Validation(
            "notes must contain between 1 and 10 entries".to_string(),
        ));
    }

    let mut rows = Vec::with_capacity(req.notes.len());
    for note in &req.notes {
        let kind = CareNoteKind::parse(&note.question_type).ok_or_else(|| {
            ApiError::Validation(format!("Unknown note type: {}", note.question_type))
        })?;
        let content = note.content.trim();
        if content.is_empty() {
            return Err(ApiError::Validation(
                "note content must not be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_NOTE_CHARS {
            return Err(ApiError::Validation(format!(
                "note content exceeds {MAX_NOTE_CHARS} characters"
            )));
        }
        rows.push(NewCareNote {
            kind,
            question_text: kind.question_text().to_string(),
            content: content.to_string(),
        });
    }

    let saved = rows.len();
    state.store.insert_care_notes(session.id, rows).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(CareNoteSubmissionResponse {
            session_id: session.id,
            saved,
        }),
    ))
}
