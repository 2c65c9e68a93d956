//! crates/goodhands_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checklist::{AnswerPayload, Category, QuestionKey};
use crate::domain::{
    AiReport, AttendanceEvidence, CareNote, CareNoteKind, CareSchedule, CareSession,
    CaregiverProfile, ChecklistResponse, GuardianFeedback, GuardianProfile, Notification, Senior,
    User, UserCredentials, UserRole, WeeklyScore,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network)
/// while keeping the business-rule failures the web layer must map to status codes.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness or lifecycle-slot violation (second active session,
    /// duplicate checklist key, second report for a session).
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The operation is not valid for the entity's current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// The external AI capability failed or timed out after bounded retries.
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// New-Row Inputs
//=========================================================================================

/// Input for administrator pre-registration of a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_code: String,
    pub role: UserRole,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hashed_password: String,
    /// Guardian-only fields.
    pub country: Option<String>,
    pub relationship: Option<String>,
}

/// Input for creating a senior with assignments in one unit.
#[derive(Debug, Clone)]
pub struct NewSenior {
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub photo: Option<String>,
    pub caregiver_id: i64,
    pub guardian_ids: Vec<i64>,
    pub diseases: Vec<String>,
}

/// A validated, scored checklist answer ready to persist.
#[derive(Debug, Clone)]
pub struct NewChecklistResponse {
    pub question_key: QuestionKey,
    pub question_text: String,
    pub category: Category,
    pub answer: AnswerPayload,
    pub notes: Option<String>,
    pub score: u8,
}

#[derive(Debug, Clone)]
pub struct NewCareNote {
    pub kind: CareNoteKind,
    pub question_text: String,
    pub content: String,
}

/// The synthesis result persisted as an `AiReport` row.
#[derive(Debug, Clone)]
pub struct NewAiReport {
    pub care_session_id: i64,
    pub keywords: Vec<String>,
    pub content: String,
    pub ai_comment: String,
    pub ai_score: f64,
    pub special_notes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub data: Option<serde_json::Value>,
}

/// Input for registering a recurring weekly visit slot.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub caregiver_id: i64,
    pub senior_id: i64,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

/// Filters for the guardian report listing.
#[derive(Debug, Clone, Copy)]
pub struct ReportQuery {
    pub senior_id: Option<i64>,
    pub page: u32,
    pub size: u32,
}

/// A report plus the display fields the guardian list needs.
#[derive(Debug, Clone)]
pub struct ReportListItem {
    pub report: AiReport,
    pub senior_id: i64,
    pub senior_name: String,
    pub caregiver_name: String,
    pub session_date: DateTime<Utc>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The persistence boundary: roster, sessions, checklist capture and the
/// report access layer all go through this trait.
#[async_trait]
pub trait CareStore: Send + Sync {
    // --- Identity & Roster ---
    async fn user_credentials_by_code(&self, user_code: &str) -> PortResult<UserCredentials>;
    async fn user_by_id(&self, user_id: i64) -> PortResult<User>;
    async fn create_user(&self, user: NewUser) -> PortResult<User>;
    async fn set_user_active(&self, user_id: i64, is_active: bool) -> PortResult<()>;
    async fn caregiver_by_user(&self, user_id: i64) -> PortResult<CaregiverProfile>;
    async fn guardian_by_user(&self, user_id: i64) -> PortResult<GuardianProfile>;
    async fn caregiver_by_id(&self, caregiver_id: i64) -> PortResult<CaregiverProfile>;

    async fn create_senior(&self, senior: NewSenior) -> PortResult<Senior>;
    async fn senior_by_id(&self, senior_id: i64) -> PortResult<Senior>;
    async fn seniors_for_caregiver(&self, caregiver_id: i64) -> PortResult<Vec<Senior>>;
    async fn seniors_for_guardian(&self, guardian_id: i64) -> PortResult<Vec<Senior>>;
    async fn guardian_user_ids_for_senior(&self, senior_id: i64) -> PortResult<Vec<i64>>;

    /// Registers a weekly visit slot; a duplicate slot yields `Conflict`.
    async fn create_schedule(&self, schedule: NewSchedule) -> PortResult<CareSchedule>;
    /// The caregiver's slots for one weekday (0 = Sunday), ordered by start time.
    async fn schedules_for_caregiver_on(
        &self,
        caregiver_id: i64,
        day_of_week: u8,
    ) -> PortResult<Vec<CareSchedule>>;
    async fn is_senior_assigned_to_guardian(
        &self,
        senior_id: i64,
        guardian_id: i64,
    ) -> PortResult<bool>;

    // --- Care Session Lifecycle ---
    /// Creates an `in_progress` session. Must be atomic with the
    /// one-active-session-per-pair invariant: a concurrent second check-in
    /// for the same (caregiver, senior) pair yields `Conflict`.
    async fn create_session(
        &self,
        caregiver_id: i64,
        senior_id: i64,
        evidence: AttendanceEvidence,
    ) -> PortResult<CareSession>;

    /// Completes an `in_progress` session owned by `caregiver_id`.
    /// `NotFound` for unknown/unowned ids, `InvalidState` otherwise.
    async fn complete_session(
        &self,
        session_id: i64,
        caregiver_id: i64,
        evidence: AttendanceEvidence,
    ) -> PortResult<CareSession>;

    /// Administrator-only terminal transition, allowed only from `in_progress`.
    async fn cancel_session(&self, session_id: i64, reason: &str) -> PortResult<CareSession>;

    async fn session_by_id(&self, session_id: i64) -> PortResult<CareSession>;
    async fn sessions_for_caregiver_today(&self, caregiver_id: i64)
        -> PortResult<Vec<CareSession>>;
    async fn completed_sessions_since(
        &self,
        caregiver_id: i64,
        since: DateTime<Utc>,
    ) -> PortResult<i64>;

    // --- Checklist & Notes Capture ---
    /// Appends a batch of responses in one transaction. A duplicate
    /// `question_key` for the session fails the whole batch with `Conflict`.
    async fn insert_checklist_responses(
        &self,
        session_id: i64,
        responses: Vec<NewChecklistResponse>,
    ) -> PortResult<()>;
    async fn checklist_for_session(&self, session_id: i64) -> PortResult<Vec<ChecklistResponse>>;
    async fn checklist_count(&self, session_id: i64) -> PortResult<i64>;
    async fn insert_care_notes(
        &self,
        session_id: i64,
        notes: Vec<NewCareNote>,
    ) -> PortResult<()>;
    async fn notes_for_session(&self, session_id: i64) -> PortResult<Vec<CareNote>>;

    // --- Report Access Layer ---
    /// Inserts the 1:1 report row; a concurrent duplicate for the same
    /// session yields `Conflict` so the caller can fall back to the winner.
    async fn insert_report(&self, report: NewAiReport) -> PortResult<AiReport>;
    async fn report_by_id(&self, report_id: i64) -> PortResult<AiReport>;
    async fn report_for_session(&self, session_id: i64) -> PortResult<Option<AiReport>>;
    async fn mark_report_read(&self, report_id: i64) -> PortResult<()>;
    async fn reports_for_guardian(
        &self,
        guardian_id: i64,
        query: ReportQuery,
    ) -> PortResult<(Vec<ReportListItem>, i64)>;
    async fn weekly_scores(&self, senior_id: i64, weeks: u32) -> PortResult<Vec<WeeklyScore>>;

    // --- Feedback & Notifications ---
    async fn insert_feedback(
        &self,
        report_id: i64,
        guardian_id: i64,
        message: &str,
        requirements: Option<&str>,
    ) -> PortResult<GuardianFeedback>;
    async fn insert_notification(&self, notification: NewNotification) -> PortResult<()>;
    async fn notifications_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: i64,
    ) -> PortResult<Vec<Notification>>;
    async fn mark_notification_read(&self, notification_id: i64, user_id: i64) -> PortResult<()>;
}

//=========================================================================================
// External AI Capability
//=========================================================================================

/// Everything the synthesis prompt is built from.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSynthesisInput {
    pub senior_name: String,
    pub senior_age: Option<i64>,
    pub session_date: String,
    pub checklist: Vec<ChecklistSummaryRow>,
    pub notes: Vec<NoteSummaryRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistSummaryRow {
    pub question: String,
    pub category: String,
    pub answer: serde_json::Value,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteSummaryRow {
    pub question: String,
    pub content: String,
}

/// What the black box gives back for one session.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSynthesis {
    pub keywords: Vec<String>,
    pub content: String,
    pub ai_comment: String,
    pub ai_score: f64,
    #[serde(default)]
    pub special_notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysisInput {
    pub senior_name: String,
    pub weeks: u32,
    pub weekly_scores: Vec<WeeklyScore>,
}

/// What the black box gives back for a trend question. This layer only
/// passes it through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub trend: String,
    pub score_changes: Vec<f64>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// The external AI capability, treated as an opaque collaborator. Adapters
/// own their retry/timeout policy; exhaustion surfaces as `PortError::Upstream`.
#[async_trait]
pub trait ReportSynthesisService: Send + Sync {
    async fn synthesize_report(&self, input: &ReportSynthesisInput) -> PortResult<ReportSynthesis>;
    async fn analyze_trend(&self, input: &TrendAnalysisInput) -> PortResult<TrendAnalysis>;
}

//=========================================================================================
// Photo Evidence Storage
//=========================================================================================

/// Stores attendance evidence photos and returns the relative path they are
/// served under.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn save(&self, kind: &str, original_name: &str, data: &[u8]) -> PortResult<String>;
    /// Best-effort cleanup when the row the photo belongs to fails to commit.
    async fn remove(&self, relative_path: &str) -> PortResult<()>;
}
