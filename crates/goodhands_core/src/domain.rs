//! crates/goodhands_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checklist::{AnswerPayload, Category, QuestionKey};

/// The three kinds of principal the system knows about.
///
/// Represented as a closed sum type; authorization is a function of this
/// value, never of string comparison at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Caregiver,
    Guardian,
    Administrator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Caregiver => "caregiver",
            UserRole::Guardian => "guardian",
            UserRole::Administrator => "administrator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "caregiver" => Some(UserRole::Caregiver),
            "guardian" => Some(UserRole::Guardian),
            // the original seed data uses both spellings
            "admin" | "administrator" => Some(UserRole::Administrator),
            _ => None,
        }
    }
}

/// Represents a user account - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub user_code: String,
    pub role: UserRole,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
}

// Only used internally for login - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

/// A caregiver profile, owned 1:1 by a `User`.
#[derive(Debug, Clone)]
pub struct CaregiverProfile {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

/// A guardian profile, owned 1:1 by a `User`.
#[derive(Debug, Clone)]
pub struct GuardianProfile {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub country: Option<String>,
    pub relationship: Option<String>,
}

/// A care recipient. Linked to exactly one primary caregiver and one or
/// more guardians via assignment records.
#[derive(Debug, Clone)]
pub struct Senior {
    pub id: i64,
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub photo: Option<String>,
    pub caregiver_id: i64,
    pub diseases: Vec<String>,
}

/// A recurring weekly visit slot agreed for a (caregiver, senior) pair.
#[derive(Debug, Clone)]
pub struct CareSchedule {
    pub id: i64,
    pub caregiver_id: i64,
    pub senior_id: i64,
    /// 0 = Sunday through 6 = Saturday, matching sqlite's `strftime('%w')`.
    pub day_of_week: u8,
    /// `HH:MM`, 24-hour clock.
    pub start_time: String,
    pub end_time: String,
}

/// Lifecycle of a care session.
///
/// `none -> in_progress -> {completed, cancelled}`; the terminal states
/// never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(SessionStatus::InProgress),
            "completed" => Some(SessionStatus::Completed),
            "cancelled" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }
}

/// A GPS coordinate pair captured as attendance evidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GpsPoint {
    /// Latitude must be within [-90, 90] and longitude within [-180, 180].
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// One bounded work period (check-in to check-out) by a caregiver for a senior.
#[derive(Debug, Clone)]
pub struct CareSession {
    pub id: i64,
    pub caregiver_id: i64,
    pub senior_id: i64,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_location: String,
    pub end_location: Option<String>,
    pub start_gps: GpsPoint,
    pub end_gps: Option<GpsPoint>,
    pub start_photo: String,
    pub end_photo: Option<String>,
    pub cancel_reason: Option<String>,
}

/// Evidence captured at check-in or check-out time.
#[derive(Debug, Clone)]
pub struct AttendanceEvidence {
    pub location: String,
    pub gps: GpsPoint,
    pub photo_path: String,
}

/// A single submitted checklist answer, immutable once stored.
#[derive(Debug, Clone)]
pub struct ChecklistResponse {
    pub id: i64,
    pub care_session_id: i64,
    pub question_key: QuestionKey,
    pub question_text: String,
    pub category: Category,
    pub answer: AnswerPayload,
    pub notes: Option<String>,
    /// Derived 1-5 score, computed once at submission time.
    pub score: u8,
    pub created_at: DateTime<Utc>,
}

/// The six free-text care note prompts from the caregiver's daily template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareNoteKind {
    SpecialMoments,
    FamilyLonging,
    EmotionalState,
    Conversation,
    Changes,
    CareEpisodes,
}

impl CareNoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CareNoteKind::SpecialMoments => "special_moments",
            CareNoteKind::FamilyLonging => "family_longing",
            CareNoteKind::EmotionalState => "emotional_state",
            CareNoteKind::Conversation => "conversation",
            CareNoteKind::Changes => "changes",
            CareNoteKind::CareEpisodes => "care_episodes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "special_moments" => Some(CareNoteKind::SpecialMoments),
            "family_longing" => Some(CareNoteKind::FamilyLonging),
            "emotional_state" => Some(CareNoteKind::EmotionalState),
            "conversation" => Some(CareNoteKind::Conversation),
            "changes" => Some(CareNoteKind::Changes),
            "care_episodes" => Some(CareNoteKind::CareEpisodes),
            _ => None,
        }
    }

    /// The caregiver-facing prompt text snapshotted alongside the note.
    pub fn question_text(&self) -> &'static str {
        match self {
            CareNoteKind::SpecialMoments => "Were there any special moments today?",
            CareNoteKind::FamilyLonging => "Did they express longing for their family?",
            CareNoteKind::EmotionalState => "How was their overall emotional state?",
            CareNoteKind::Conversation => "What conversations did you have?",
            CareNoteKind::Changes => "Were there any changes from the usual routine?",
            CareNoteKind::CareEpisodes => "Were there any notable care episodes?",
        }
    }
}

/// A free-text observation attached to a session, immutable once stored.
#[derive(Debug, Clone)]
pub struct CareNote {
    pub id: i64,
    pub care_session_id: i64,
    pub kind: CareNoteKind,
    pub question_text: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Read state of an AI report, advanced on first guardian read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Generated,
    Read,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Generated => "generated",
            ReportStatus::Read => "read",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "generated" => Some(ReportStatus::Generated),
            "read" => Some(ReportStatus::Read),
            _ => None,
        }
    }
}

/// A synthesized narrative derived from a completed session's checklist
/// and notes. 1:1 with its source session, retained independently of it.
#[derive(Debug, Clone)]
pub struct AiReport {
    pub id: i64,
    pub care_session_id: i64,
    pub keywords: Vec<String>,
    pub content: String,
    pub ai_comment: String,
    pub ai_score: f64,
    pub special_notes: Vec<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Append-only guardian feedback against a report.
#[derive(Debug, Clone)]
pub struct GuardianFeedback {
    pub id: i64,
    pub ai_report_id: i64,
    pub guardian_id: i64,
    pub message: String,
    pub requirements: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// System events pushed at users: a new report for guardians, new feedback
/// for caregivers. Mutated only to mark read.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// One week of aggregated checklist scores for a senior, the input unit
/// for trend analysis.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyScore {
    /// Date of the week's first checklist submission, formatted `YYYY-MM-DD`.
    pub week_start: String,
    /// Mean of the 1-5 derived scores submitted that week.
    pub average_score: f64,
    pub response_count: i64,
}
