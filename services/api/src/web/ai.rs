//! services/api/src/web/ai.rs
//!
//! The endpoints that delegate to the external AI capability: report
//! generation for completed sessions and per-senior trend analysis.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::guardian::ReportView;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use goodhands_core::domain::{CareSession, SessionStatus, UserRole};
use goodhands_core::ports::{
    ChecklistSummaryRow, NewAiReport, NewNotification, NoteSummaryRow, PortError,
    ReportSynthesisInput, TrendAnalysis, TrendAnalysisInput,
};

//=========================================================================================
// Report Generation
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct GenerateReportRequest {
    pub session_id: i64,
}

/// Resolves the session the caller may generate a report for: the owning
/// caregiver or an administrator. Anyone else's sessions stay 404.
async fn authorized_session(
    state: &AppState,
    auth: &AuthUser,
    session_id: i64,
) -> Result<CareSession, ApiError> {
    let session = state.store.session_by_id(session_id).await?;
    match auth.0.role {
        UserRole::Administrator => Ok(session),
        UserRole::Caregiver => {
            let profile = state.store.caregiver_by_user(auth.0.id).await?;
            if session.caregiver_id == profile.id {
                Ok(session)
            } else {
                Err(ApiError::NotFound(format!(
                    "care session {session_id} not found"
                )))
            }
        }
        UserRole::Guardian => Err(ApiError::Forbidden(
            "Guardians cannot generate reports".to_string(),
        )),
    }
}

/// POST /api/ai/generate-report - Synthesize the daily report for a
/// completed session. Idempotent: a second call returns the existing report.
#[utoipa::path(
    post,
    path = "/api/ai/generate-report",
    request_body = GenerateReportRequest,
    responses(
        (status = 200, description = "Report already existed", body = ReportView),
        (status = 201, description = "Report generated", body = ReportView),
        (status = 400, description = "Session not completed or has no checklist data"),
        (status = 404, description = "Unknown or unowned session"),
        (status = 502, description = "The AI capability failed after retries"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn generate_report_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<GenerateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authorized_session(&state, &auth, req.session_id).await?;

    if let Some(existing) = state.store.report_for_session(session.id).await? {
        return Ok((StatusCode::OK, Json(ReportView::from(existing))));
    }

    if session.status != SessionStatus::Completed {
        return Err(ApiError::InvalidState(
            "Reports can only be generated for completed sessions".to_string(),
        ));
    }

    let checklist = state.store.checklist_for_session(session.id).await?;
    if checklist.is_empty() {
        return Err(ApiError::InvalidState(
            "At least one checklist response is required before generating a report".to_string(),
        ));
    }
    let notes = state.store.notes_for_session(session.id).await?;
    let senior = state.store.senior_by_id(session.senior_id).await?;

    let input = ReportSynthesisInput {
        senior_name: senior.name.clone(),
        senior_age: senior.age,
        session_date: session.start_time.format("%Y-%m-%d").to_string(),
        checklist: checklist
            .iter()
            .map(|r| ChecklistSummaryRow {
                question: r.question_text.clone(),
                category: r.category.as_str().to_string(),
                answer: serde_json::to_value(&r.answer).unwrap_or(serde_json::Value::Null),
                score: r.score,
            })
            .collect(),
        notes: notes
            .iter()
            .map(|n| NoteSummaryRow {
                question: n.question_text.clone(),
                content: n.content.clone(),
            })
            .collect(),
    };

    // The session and its checklist data are untouched if this fails; the
    // caller can simply retry.
    let synthesis = state.ai.synthesize_report(&input).await?;

    let report = match state
        .store
        .insert_report(NewAiReport {
            care_session_id: session.id,
            keywords: synthesis.keywords,
            content: synthesis.content,
            ai_comment: synthesis.ai_comment,
            ai_score: synthesis.ai_score,
            special_notes: synthesis.special_notes,
        })
        .await
    {
        Ok(report) => report,
        // Lost a concurrent generation race: return the winner's row.
        Err(PortError::Conflict(_)) => state
            .store
            .report_for_session(session.id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal("report row vanished after conflict".to_string())
            })?,
        Err(e) => return Err(e.into()),
    };

    info!(session_id = session.id, report_id = report.id, "report generated");

    for guardian_user_id in state.store.guardian_user_ids_for_senior(senior.id).await? {
        state
            .store
            .insert_notification(NewNotification {
                sender_id: auth.0.id,
                receiver_id: guardian_user_id,
                kind: "report".to_string(),
                title: "New care report".to_string(),
                content: format!("A new care report for {} is ready", senior.name),
                data: Some(serde_json::json!({
                    "ai_report_id": report.id,
                    "care_session_id": session.id,
                })),
            })
            .await?;
    }

    Ok((StatusCode::CREATED, Json(ReportView::from(report))))
}

//=========================================================================================
// Trend Analysis
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct TrendParams {
    pub weeks: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct TrendResponse {
    pub senior_id: i64,
    pub weeks: u32,
    pub trend: String,
    pub score_changes: Vec<f64>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// GET /api/ai/trend-analysis/{senior_id} - Weekly score trend for a senior.
///
/// Fewer than two weeks of data short-circuits to `insufficient_data`
/// without calling the AI capability.
#[utoipa::path(
    get,
    path = "/api/ai/trend-analysis/{senior_id}",
    params(
        ("senior_id" = i64, Path, description = "Senior id"),
        ("weeks" = Option<u32>, Query, description = "Window in weeks, 1-52, default 4"),
    ),
    responses(
        (status = 200, description = "Trend analysis", body = TrendResponse),
        (status = 403, description = "Caller has no relationship with this senior"),
        (status = 404, description = "Unknown senior"),
        (status = 502, description = "The AI capability failed after retries"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn trend_analysis_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(senior_id): Path<i64>,
    Query(params): Query<TrendParams>,
) -> Result<impl IntoResponse, ApiError> {
    let weeks = params.weeks.unwrap_or(4);
    if !(1..=52).contains(&weeks) {
        return Err(ApiError::Validation(
            "weeks must be between 1 and 52".to_string(),
        ));
    }

    let senior = state.store.senior_by_id(senior_id).await?;

    // Admins see everyone; caregivers their own seniors; guardians their
    // assigned ones.
    let allowed = match auth.0.role {
        UserRole::Administrator => true,
        UserRole::Caregiver => {
            let profile = state.store.caregiver_by_user(auth.0.id).await?;
            senior.caregiver_id == profile.id
        }
        UserRole::Guardian => {
            let profile = state.store.guardian_by_user(auth.0.id).await?;
            state
                .store
                .is_senior_assigned_to_guardian(senior.id, profile.id)
                .await?
        }
    };
    if !allowed {
        return Err(ApiError::Forbidden(
            "This senior is not assigned to you".to_string(),
        ));
    }

    let weekly_scores = state.store.weekly_scores(senior.id, weeks).await?;
    if weekly_scores.len() < 2 {
        return Ok(Json(TrendResponse {
            senior_id: senior.id,
            weeks,
            trend: "insufficient_data".to_string(),
            score_changes: vec![],
            insights: vec![],
            recommendations: vec![],
        }));
    }

    let analysis: TrendAnalysis = state
        .ai
        .analyze_trend(&TrendAnalysisInput {
            senior_name: senior.name,
            weeks,
            weekly_scores,
        })
        .await?;

    Ok(Json(TrendResponse {
        senior_id: senior.id,
        weeks,
        trend: analysis.trend,
        score_changes: analysis.score_changes,
        insights: analysis.insights,
        recommendations: analysis.recommendations,
    }))
}
