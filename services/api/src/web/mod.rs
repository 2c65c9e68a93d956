//! services/api/src/web/mod.rs
//!
//! Declares the web layer and assembles the application router. The router
//! is built here, once, so the binary and the integration tests serve the
//! exact same application.

pub mod admin;
pub mod ai;
pub mod auth;
pub mod caregiver;
pub mod guardian;
pub mod middleware;
pub mod notifications;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Documentation
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        caregiver::caregiver_home_handler,
        caregiver::checklist_template_handler,
        caregiver::checkin_handler,
        caregiver::checkout_handler,
        caregiver::submit_checklist_handler,
        caregiver::submit_care_notes_handler,
        guardian::guardian_home_handler,
        guardian::list_reports_handler,
        guardian::report_detail_handler,
        guardian::submit_feedback_handler,
        ai::generate_report_handler,
        ai::trend_analysis_handler,
        admin::create_user_handler,
        admin::activate_user_handler,
        admin::deactivate_user_handler,
        admin::create_senior_handler,
        admin::create_schedule_handler,
        admin::cancel_session_handler,
        notifications::list_notifications_handler,
        notifications::mark_read_handler,
    ),
    components(schemas(
        auth::LoginRequest,
        auth::LoginResponse,
        auth::UserInfo,
        caregiver::CaregiverHomeResponse,
        caregiver::SeniorView,
        caregiver::SessionView,
        caregiver::ScheduleView,
        caregiver::ChecklistTemplateResponse,
        caregiver::TemplateQuestion,
        caregiver::ChecklistSubmission,
        caregiver::ChecklistItem,
        caregiver::ChecklistSubmissionResponse,
        caregiver::CareNoteSubmission,
        caregiver::CareNoteItem,
        caregiver::CareNoteSubmissionResponse,
        guardian::GuardianHomeResponse,
        guardian::ReportView,
        guardian::ReportListResponse,
        guardian::ReportListItemView,
        guardian::ReportDetailResponse,
        guardian::ChecklistAnswerView,
        guardian::CareNoteView,
        guardian::FeedbackRequest,
        guardian::FeedbackResponse,
        ai::GenerateReportRequest,
        ai::TrendResponse,
        admin::CreateUserRequest,
        admin::ActivationResponse,
        admin::CreateSeniorRequest,
        admin::CreateScheduleRequest,
        admin::ScheduleResponse,
        admin::CancelSessionRequest,
        notifications::NotificationView,
    )),
    info(
        title = "Good Hands API",
        description = "Care-coordination backend: attendance, checklists, AI reports."
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Router Assembly
//=========================================================================================

/// Builds the complete application router over the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let public_routes = Router::new().route("/api/auth/login", post(auth::login_handler));

    let protected_routes = Router::new()
        // Caregiver
        .route("/api/caregiver/home", get(caregiver::caregiver_home_handler))
        .route(
            "/api/caregiver/checklist-template/{senior_id}",
            get(caregiver::checklist_template_handler),
        )
        .route(
            "/api/caregiver/attendance/checkin",
            post(caregiver::checkin_handler),
        )
        .route(
            "/api/caregiver/attendance/checkout",
            post(caregiver::checkout_handler),
        )
        .route(
            "/api/caregiver/checklist",
            post(caregiver::submit_checklist_handler),
        )
        .route(
            "/api/caregiver/care-note",
            post(caregiver::submit_care_notes_handler),
        )
        // Guardian
        .route("/api/guardian/home", get(guardian::guardian_home_handler))
        .route("/api/guardian/reports", get(guardian::list_reports_handler))
        .route(
            "/api/guardian/report/{id}",
            get(guardian::report_detail_handler),
        )
        .route(
            "/api/guardian/feedback",
            post(guardian::submit_feedback_handler),
        )
        // AI
        .route("/api/ai/generate-report", post(ai::generate_report_handler))
        .route(
            "/api/ai/trend-analysis/{senior_id}",
            get(ai::trend_analysis_handler),
        )
        // Admin
        .route("/api/admin/users", post(admin::create_user_handler))
        .route(
            "/api/admin/users/{id}/activate",
            put(admin::activate_user_handler),
        )
        .route(
            "/api/admin/users/{id}/deactivate",
            put(admin::deactivate_user_handler),
        )
        .route("/api/admin/seniors", post(admin::create_senior_handler))
        .route("/api/admin/schedules", post(admin::create_schedule_handler))
        .route(
            "/api/admin/sessions/{id}/cancel",
            post(admin::cancel_session_handler),
        )
        // Notifications
        .route(
            "/api/notifications",
            get(notifications::list_notifications_handler),
        )
        .route(
            "/api/notifications/{id}/read",
            put(notifications::mark_read_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes + 64 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    Router::new()
        .merge(api_router)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
