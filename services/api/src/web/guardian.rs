//! services/api/src/web/guardian.rs
//!
//! Guardian-facing endpoints: the home screen, the paginated report list,
//! the report detail view, and feedback submission.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::caregiver::SeniorView;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use goodhands_core::domain::{AiReport, GuardianProfile, ReportStatus, UserRole};
use goodhands_core::ports::{NewNotification, ReportQuery};

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Loads the caller's guardian profile; non-guardians get 403.
async fn guardian_profile(state: &AppState, auth: &AuthUser) -> Result<GuardianProfile, ApiError> {
    let user = auth.require_role(UserRole::Guardian)?;
    Ok(state.store.guardian_by_user(user.id).await?)
}

/// Fails with 403 unless `senior_id` is assigned to this guardian.
async fn ensure_assigned(
    state: &AppState,
    senior_id: i64,
    guardian_id: i64,
) -> Result<(), ApiError> {
    if state
        .store
        .is_senior_assigned_to_guardian(senior_id, guardian_id)
        .await?
    {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "This senior is not assigned to you".to_string(),
        ))
    }
}

//=========================================================================================
// Response Views
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ReportView {
    pub id: i64,
    pub care_session_id: i64,
    pub keywords: Vec<String>,
    pub content: String,
    pub ai_comment: String,
    pub ai_score: f64,
    pub special_notes: Vec<String>,
    #[schema(value_type = String)]
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

impl From<AiReport> for ReportView {
    fn from(r: AiReport) -> Self {
        Self {
            id: r.id,
            care_session_id: r.care_session_id,
            keywords: r.keywords,
            content: r.content,
            ai_comment: r.ai_comment,
            ai_score: r.ai_score,
            special_notes: r.special_notes,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct GuardianHomeResponse {
    pub guardian_name: String,
    pub country: Option<String>,
    pub relationship: Option<String>,
    pub seniors: Vec<SeniorView>,
    pub unread_notifications: usize,
    pub recent_report_count: i64,
}

/// GET /api/guardian/home - Overview for the calling guardian.
#[utoipa::path(
    get,
    path = "/api/guardian/home",
    responses(
        (status = 200, description = "Home screen data", body = GuardianHomeResponse),
        (status = 403, description = "Caller is not a guardian"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn guardian_home_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = guardian_profile(&state, &auth).await?;

    let seniors = state.store.seniors_for_guardian(profile.id).await?;
    let unread = state
        .store
        .notifications_for_user(auth.0.id, true, 100)
        .await?;
    let (_, recent_report_count) = state
        .store
        .reports_for_guardian(
            profile.id,
            ReportQuery {
                senior_id: None,
                page: 1,
                size: 1,
            },
        )
        .await?;

    Ok(Json(GuardianHomeResponse {
        guardian_name: profile.name,
        country: profile.country,
        relationship: profile.relationship,
        seniors: seniors.into_iter().map(SeniorView::from).collect(),
        unread_notifications: unread.len(),
        recent_report_count,
    }))
}

//=========================================================================================
// Report List
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ReportListParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub senior_id: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct ReportListItemView {
    pub report: ReportView,
    pub senior_id: i64,
    pub senior_name: String,
    pub caregiver_name: String,
    pub session_date: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct ReportListResponse {
    pub items: Vec<ReportListItemView>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
}

/// GET /api/guardian/reports - Date-descending report list, scoped to the
/// caller's assigned seniors.
#[utoipa::path(
    get,
    path = "/api/guardian/reports",
    params(
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("size" = Option<u32>, Query, description = "Page size, 1-100"),
        ("senior_id" = Option<i64>, Query, description = "Restrict to one senior"),
    ),
    responses(
        (status = 200, description = "Report page", body = ReportListResponse),
        (status = 403, description = "Senior is not assigned to the caller"),
        (status = 422, description = "Pagination parameters out of range"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_reports_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ReportListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = guardian_profile(&state, &auth).await?;

    let page = params.page.unwrap_or(1);
    let size = params.size.unwrap_or(20);
    if page < 1 {
        return Err(ApiError::Validation("page must be at least 1".to_string()));
    }
    if !(1..=100).contains(&size) {
        return Err(ApiError::Validation(
            "size must be between 1 and 100".to_string(),
        ));
    }
    // An explicit senior filter outside the caller's assignments is a 403,
    // not an empty page.
    if let Some(senior_id) = params.senior_id {
        ensure_assigned(&state, senior_id, profile.id).await?;
    }

    let (items, total) = state
        .store
        .reports_for_guardian(
            profile.id,
            ReportQuery {
                senior_id: params.senior_id,
                page,
                size,
            },
        )
        .await?;

    Ok(Json(ReportListResponse {
        items: items
            .into_iter()
            .map(|item| ReportListItemView {
                report: item.report.into(),
                senior_id: item.senior_id,
                senior_name: item.senior_name,
                caregiver_name: item.caregiver_name,
                session_date: item.session_date,
            })
            .collect(),
        total,
        page,
        size,
    }))
}

//=========================================================================================
// Report Detail
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ChecklistAnswerView {
    pub question_key: String,
    pub question_text: String,
    pub category: String,
    pub answer: serde_json::Value,
    pub notes: Option<String>,
    pub score: u8,
}

#[derive(Serialize, ToSchema)]
pub struct CareNoteView {
    pub question_type: String,
    pub question_text: String,
    pub content: String,
}

#[derive(Serialize, ToSchema)]
pub struct ReportDetailResponse {
    pub report: ReportView,
    pub senior: SeniorView,
    pub caregiver_name: String,
    pub session_date: DateTime<Utc>,
    pub session_end: Option<DateTime<Utc>>,
    pub checklist: Vec<ChecklistAnswerView>,
    pub care_notes: Vec<CareNoteView>,
}

/// GET /api/guardian/report/{id} - Full report envelope. The first read
/// flips the report status from `generated` to `read`.
#[utoipa::path(
    get,
    path = "/api/guardian/report/{id}",
    params(("id" = i64, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report detail", body = ReportDetailResponse),
        (status = 403, description = "Report belongs to an unassigned senior"),
        (status = 404, description = "Unknown report"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn report_detail_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(report_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = guardian_profile(&state, &auth).await?;

    let mut report = state.store.report_by_id(report_id).await?;
    let session = state.store.session_by_id(report.care_session_id).await?;
    ensure_assigned(&state, session.senior_id, profile.id).await?;

    if report.status == ReportStatus::Generated {
        state.store.mark_report_read(report.id).await?;
        report.status = ReportStatus::Read;
    }

    let senior = state.store.senior_by_id(session.senior_id).await?;
    let caregiver = state.store.caregiver_by_id(session.caregiver_id).await?;
    let checklist = state.store.checklist_for_session(session.id).await?;
    let care_notes = state.store.notes_for_session(session.id).await?;

    Ok(Json(ReportDetailResponse {
        report: report.into(),
        senior: senior.into(),
        caregiver_name: caregiver.name,
        session_date: session.start_time,
        session_end: session.end_time,
        checklist: checklist
            .into_iter()
            .map(|r| ChecklistAnswerView {
                question_key: r.question_key.as_str().to_string(),
                question_text: r.question_text,
                category: r.category.as_str().to_string(),
                answer: serde_json::to_value(&r.answer).unwrap_or(serde_json::Value::Null),
                notes: r.notes,
                score: r.score,
            })
            .collect(),
        care_notes: care_notes
            .into_iter()
            .map(|n| CareNoteView {
                question_type: n.kind.as_str().to_string(),
                question_text: n.question_text,
                content: n.content,
            })
            .collect(),
    }))
}

//=========================================================================================
// Feedback
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct FeedbackRequest {
    pub ai_report_id: i64,
    pub message: String,
    pub requirements: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct FeedbackResponse {
    pub id: i64,
    pub ai_report_id: i64,
    pub created_at: DateTime<Utc>,
}

const MAX_FEEDBACK_CHARS: usize = 2000;

/// POST /api/guardian/feedback - Append feedback to a report and notify the
/// session's caregiver.
#[utoipa::path(
    post,
    path = "/api/guardian/feedback",
    request_body = FeedbackRequest,
    responses(
        (status = 201, description = "Feedback saved", body = FeedbackResponse),
        (status = 403, description = "Report belongs to an unassigned senior"),
        (status = 404, description = "Unknown report"),
        (status = 422, description = "Empty or oversized message"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_feedback_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = guardian_profile(&state, &auth).await?;

    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError::Validation(
            "feedback message must not be empty".to_string(),
        ));
    }
    if message.chars().count() > MAX_FEEDBACK_CHARS {
        return Err(ApiError::Validation(format!(
            "feedback message exceeds {MAX_FEEDBACK_CHARS} characters"
        )));
    }

    let report = state.store.report_by_id(req.ai_report_id).await?;
    let session = state.store.session_by_id(report.care_session_id).await?;
    ensure_assigned(&state, session.senior_id, profile.id).await?;

    let feedback = state
        .store
        .insert_feedback(report.id, profile.id, message, req.requirements.as_deref())
        .await?;

    let senior = state.store.senior_by_id(session.senior_id).await?;
    let caregiver = state.store.caregiver_by_id(session.caregiver_id).await?;
    state
        .store
        .insert_notification(NewNotification {
            sender_id: auth.0.id,
            receiver_id: caregiver.user_id,
            kind: "feedback".to_string(),
            title: "New feedback from a guardian".to_string(),
            content: format!("{} left feedback on {}'s report", profile.name, senior.name),
            data: Some(serde_json::json!({
                "ai_report_id": report.id,
                "care_session_id": session.id,
            })),
        })
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(FeedbackResponse {
            id: feedback.id,
            ai_report_id: feedback.ai_report_id,
            created_at: feedback.created_at,
        }),
    ))
}
