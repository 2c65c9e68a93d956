//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CareStore` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use goodhands_core::checklist::{AnswerPayload, Category, QuestionKey};
use goodhands_core::domain::{
    AiReport, AttendanceEvidence, CareNote, CareNoteKind, CareSchedule, CareSession,
    CaregiverProfile, ChecklistResponse, GpsPoint, GuardianFeedback, GuardianProfile, Notification,
    ReportStatus, Senior, SessionStatus, User, UserCredentials, UserRole,
};
use goodhands_core::ports::{
    CareStore, NewAiReport, NewCareNote, NewChecklistResponse, NewNotification, NewSchedule,
    NewSenior, NewUser, PortError, PortResult, ReportListItem, ReportQuery,
};
use goodhands_core::WeeklyScore;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CareStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|d| d.is_unique_violation())
        .unwrap_or(false)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    user_code: String,
    user_type: String,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    password_hash: String,
    is_active: i64,
}

impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let role = UserRole::parse(&self.user_type).ok_or_else(|| {
            PortError::Unexpected(format!("unknown user_type in row: {}", self.user_type))
        })?;
        Ok(User {
            id: self.id,
            user_code: self.user_code,
            role,
            name: self.name,
            phone: self.phone,
            email: self.email,
            is_active: self.is_active != 0,
        })
    }

    fn to_credentials(self) -> PortResult<UserCredentials> {
        let hashed_password = self.password_hash.clone();
        Ok(UserCredentials {
            user: self.to_domain()?,
            hashed_password,
        })
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    id: i64,
    user_id: i64,
    name: String,
}

#[derive(FromRow)]
struct GuardianRecord {
    id: i64,
    user_id: i64,
    name: String,
    country: Option<String>,
    relationship: Option<String>,
}

#[derive(FromRow)]
struct SeniorRecord {
    id: i64,
    name: String,
    age: Option<i64>,
    gender: Option<String>,
    photo: Option<String>,
    caregiver_id: i64,
}

impl SeniorRecord {
    fn to_domain(self, diseases: Vec<String>) -> Senior {
        Senior {
            id: self.id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            photo: self.photo,
            caregiver_id: self.caregiver_id,
            diseases,
        }
    }
}

#[derive(FromRow)]
struct ScheduleRecord {
    id: i64,
    caregiver_id: i64,
    senior_id: i64,
    day_of_week: i64,
    start_time: String,
    end_time: String,
}

impl ScheduleRecord {
    fn to_domain(self) -> CareSchedule {
        CareSchedule {
            id: self.id,
            caregiver_id: self.caregiver_id,
            senior_id: self.senior_id,
            day_of_week: self.day_of_week as u8,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: i64,
    caregiver_id: i64,
    senior_id: i64,
    status: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    start_location: String,
    end_location: Option<String>,
    start_gps_lat: f64,
    start_gps_lng: f64,
    end_gps_lat: Option<f64>,
    end_gps_lng: Option<f64>,
    start_photo: String,
    end_photo: Option<String>,
    cancel_reason: Option<String>,
}

const SESSION_COLUMNS: &str = "id, caregiver_id, senior_id, status, start_time, end_time, \
     start_location, end_location, start_gps_lat, start_gps_lng, end_gps_lat, end_gps_lng, \
     start_photo, end_photo, cancel_reason";

impl SessionRecord {
    fn to_domain(self) -> PortResult<CareSession> {
        let status = SessionStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("unknown session status in row: {}", self.status))
        })?;
        let end_gps = match (self.end_gps_lat, self.end_gps_lng) {
            (Some(lat), Some(lng)) => Some(GpsPoint { lat, lng }),
            _ => None,
        };
        Ok(CareSession {
            id: self.id,
            caregiver_id: self.caregiver_id,
            senior_id: self.senior_id,
            status,
            start_time: self.start_time,
            end_time: self.end_time,
            start_location: self.start_location,
            end_location: self.end_location,
            start_gps: GpsPoint {
                lat: self.start_gps_lat,
                lng: self.start_gps_lng,
            },
            end_gps,
            start_photo: self.start_photo,
            end_photo: self.end_photo,
            cancel_reason: self.cancel_reason,
        })
    }
}

#[derive(FromRow)]
struct ChecklistRecord {
    id: i64,
    care_session_id: i64,
    question_key: String,
    question_text: String,
    category: String,
    answer: String,
    notes: Option<String>,
    score: i64,
    created_at: DateTime<Utc>,
}

impl ChecklistRecord {
    fn to_domain(self) -> PortResult<ChecklistResponse> {
        let question_key = QuestionKey::parse(&self.question_key).ok_or_else(|| {
            PortError::Unexpected(format!("unknown question_key in row: {}", self.question_key))
        })?;
        let category = Category::parse(&self.category).ok_or_else(|| {
            PortError::Unexpected(format!("unknown category in row: {}", self.category))
        })?;
        let raw: serde_json::Value = serde_json::from_str(&self.answer)
            .map_err(|e| PortError::Unexpected(format!("stored answer is not JSON: {e}")))?;
        // Stored payloads were validated on the way in; the key dictates the shape.
        let answer = AnswerPayload::parse(question_key, &raw)
            .map_err(|e| PortError::Unexpected(format!("stored answer mismatch: {e}")))?;
        Ok(ChecklistResponse {
            id: self.id,
            care_session_id: self.care_session_id,
            question_key,
            question_text: self.question_text,
            category,
            answer,
            notes: self.notes,
            score: self.score as u8,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CareNoteRecord {
    id: i64,
    care_session_id: i64,
    question_type: String,
    question_text: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl CareNoteRecord {
    fn to_domain(self) -> PortResult<CareNote> {
        let kind = CareNoteKind::parse(&self.question_type).ok_or_else(|| {
            PortError::Unexpected(format!("unknown question_type in row: {}", self.question_type))
        })?;
        Ok(CareNote {
            id: self.id,
            care_session_id: self.care_session_id,
            kind,
            question_text: self.question_text,
            content: self.content,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ReportRecord {
    id: i64,
    care_session_id: i64,
    keywords: String,
    content: String,
    ai_comment: String,
    ai_score: f64,
    special_notes: String,
    status: String,
    created_at: DateTime<Utc>,
}

const REPORT_COLUMNS: &str =
    "id, care_session_id, keywords, content, ai_comment, ai_score, special_notes, status, created_at";

impl ReportRecord {
    fn to_domain(self) -> PortResult<AiReport> {
        let status = ReportStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("unknown report status in row: {}", self.status))
        })?;
        let keywords: Vec<String> = serde_json::from_str(&self.keywords)
            .map_err(|e| PortError::Unexpected(format!("stored keywords are not JSON: {e}")))?;
        let special_notes: Vec<String> = serde_json::from_str(&self.special_notes)
            .map_err(|e| PortError::Unexpected(format!("stored special_notes are not JSON: {e}")))?;
        Ok(AiReport {
            id: self.id,
            care_session_id: self.care_session_id,
            keywords,
            content: self.content,
            ai_comment: self.ai_comment,
            ai_score: self.ai_score,
            special_notes,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct NotificationRecord {
    id: i64,
    sender_id: i64,
    receiver_id: i64,
    #[sqlx(rename = "type")]
    kind: String,
    title: String,
    content: String,
    data: Option<String>,
    is_read: i64,
    created_at: DateTime<Utc>,
}

impl NotificationRecord {
    fn to_domain(self) -> PortResult<Notification> {
        let data = match self.data {
            None => None,
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
                PortError::Unexpected(format!("stored notification data is not JSON: {e}"))
            })?),
        };
        Ok(Notification {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            kind: self.kind,
            title: self.title,
            content: self.content,
            data,
            is_read: self.is_read != 0,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct WeeklyScoreRecord {
    week_start: String,
    average_score: f64,
    response_count: i64,
}

//=========================================================================================
// `CareStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CareStore for DbAdapter {
    async fn user_credentials_by_code(&self, user_code: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, user_code, user_type, name, phone, email, password_hash, is_active \
             FROM users WHERE user_code = ?",
        )
        .bind(user_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("user {user_code} not found")))?;
        record.to_credentials()
    }

    async fn user_by_id(&self, user_id: i64) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, user_code, user_type, name, phone, email, password_hash, is_active \
             FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("user {user_id} not found")))?;
        record.to_domain()
    }

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let result = sqlx::query(
            "INSERT INTO users (user_code, user_type, name, phone, email, password_hash, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&user.user_code)
        .bind(user.role.as_str())
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;

        let user_id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(PortError::Conflict(format!(
                    "user code {} already exists",
                    user.user_code
                )))
            }
            Err(e) => return Err(unexpected(e)),
        };

        // Role profile rows are created alongside the account.
        match user.role {
            UserRole::Caregiver => {
                sqlx::query("INSERT INTO caregivers (user_id, name) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(&user.name)
                    .execute(&mut *tx)
                    .await
                    .map_err(unexpected)?;
            }
            UserRole::Guardian => {
                sqlx::query(
                    "INSERT INTO guardians (user_id, name, country, relationship) VALUES (?, ?, ?, ?)",
                )
                .bind(user_id)
                .bind(&user.name)
                .bind(&user.country)
                .bind(&user.relationship)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
            }
            UserRole::Administrator => {}
        }

        tx.commit().await.map_err(unexpected)?;
        self.user_by_id(user_id).await
    }

    async fn set_user_active(&self, user_id: i64, is_active: bool) -> PortResult<()> {
        let done = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(is_active as i64)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if done.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("user {user_id} not found")));
        }
        Ok(())
    }

    async fn caregiver_by_user(&self, user_id: i64) -> PortResult<CaregiverProfile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT id, user_id, name FROM caregivers WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("no caregiver profile for user {user_id}")))?;
        Ok(CaregiverProfile {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
        })
    }

    async fn guardian_by_user(&self, user_id: i64) -> PortResult<GuardianProfile> {
        let record = sqlx::query_as::<_, GuardianRecord>(
            "SELECT id, user_id, name, country, relationship FROM guardians WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("no guardian profile for user {user_id}")))?;
        Ok(GuardianProfile {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            country: record.country,
            relationship: record.relationship,
        })
    }

    async fn caregiver_by_id(&self, caregiver_id: i64) -> PortResult<CaregiverProfile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT id, user_id, name FROM caregivers WHERE id = ?",
        )
        .bind(caregiver_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("caregiver {caregiver_id} not found")))?;
        Ok(CaregiverProfile {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
        })
    }

    async fn create_senior(&self, senior: NewSenior) -> PortResult<Senior> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let done = sqlx::query(
            "INSERT INTO seniors (name, age, gender, photo, caregiver_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&senior.name)
        .bind(senior.age)
        .bind(&senior.gender)
        .bind(&senior.photo)
        .bind(senior.caregiver_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        let senior_id = done.last_insert_rowid();

        for disease in &senior.diseases {
            sqlx::query("INSERT INTO senior_diseases (senior_id, disease_type) VALUES (?, ?)")
                .bind(senior_id)
                .bind(disease)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }
        for guardian_id in &senior.guardian_ids {
            sqlx::query("INSERT INTO senior_guardians (senior_id, guardian_id) VALUES (?, ?)")
                .bind(senior_id)
                .bind(guardian_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        self.senior_by_id(senior_id).await
    }

    async fn senior_by_id(&self, senior_id: i64) -> PortResult<Senior> {
        let record = sqlx::query_as::<_, SeniorRecord>(
            "SELECT id, name, age, gender, photo, caregiver_id FROM seniors WHERE id = ?",
        )
        .bind(senior_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("senior {senior_id} not found")))?;
        let diseases = self.diseases_for(senior_id).await?;
        Ok(record.to_domain(diseases))
    }

    async fn seniors_for_caregiver(&self, caregiver_id: i64) -> PortResult<Vec<Senior>> {
        let records = sqlx::query_as::<_, SeniorRecord>(
            "SELECT id, name, age, gender, photo, caregiver_id FROM seniors \
             WHERE caregiver_id = ? ORDER BY name ASC",
        )
        .bind(caregiver_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        self.attach_diseases(records).await
    }

    async fn seniors_for_guardian(&self, guardian_id: i64) -> PortResult<Vec<Senior>> {
        let records = sqlx::query_as::<_, SeniorRecord>(
            "SELECT s.id, s.name, s.age, s.gender, s.photo, s.caregiver_id \
             FROM seniors s JOIN senior_guardians sg ON sg.senior_id = s.id \
             WHERE sg.guardian_id = ? ORDER BY s.name ASC",
        )
        .bind(guardian_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        self.attach_diseases(records).await
    }

    async fn guardian_user_ids_for_senior(&self, senior_id: i64) -> PortResult<Vec<i64>> {
        let rows = sqlx::query_as::<_, (i64,)>(
            "SELECT g.user_id FROM guardians g \
             JOIN senior_guardians sg ON sg.guardian_id = g.id WHERE sg.senior_id = ?",
        )
        .bind(senior_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn create_schedule(&self, schedule: NewSchedule) -> PortResult<CareSchedule> {
        let result = sqlx::query(
            "INSERT INTO care_schedules (caregiver_id, senior_id, day_of_week, start_time, end_time) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(schedule.caregiver_id)
        .bind(schedule.senior_id)
        .bind(schedule.day_of_week as i64)
        .bind(&schedule.start_time)
        .bind(&schedule.end_time)
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(PortError::Conflict(
                    "this schedule slot already exists".to_string(),
                ))
            }
            Err(e) => return Err(unexpected(e)),
        };
        Ok(CareSchedule {
            id,
            caregiver_id: schedule.caregiver_id,
            senior_id: schedule.senior_id,
            day_of_week: schedule.day_of_week,
            start_time: schedule.start_time,
            end_time: schedule.end_time,
        })
    }

    async fn schedules_for_caregiver_on(
        &self,
        caregiver_id: i64,
        day_of_week: u8,
    ) -> PortResult<Vec<CareSchedule>> {
        let records = sqlx::query_as::<_, ScheduleRecord>(
            "SELECT id, caregiver_id, senior_id, day_of_week, start_time, end_time \
             FROM care_schedules WHERE caregiver_id = ? AND day_of_week = ? \
             ORDER BY start_time ASC",
        )
        .bind(caregiver_id)
        .bind(day_of_week as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ScheduleRecord::to_domain).collect())
    }

    async fn is_senior_assigned_to_guardian(
        &self,
        senior_id: i64,
        guardian_id: i64,
    ) -> PortResult<bool> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM senior_guardians WHERE senior_id = ? AND guardian_id = ?",
        )
        .bind(senior_id)
        .bind(guardian_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.0 > 0)
    }

    async fn create_session(
        &self,
        caregiver_id: i64,
        senior_id: i64,
        evidence: AttendanceEvidence,
    ) -> PortResult<CareSession> {
        let now = Utc::now();
        // The partial unique index on (caregiver_id, senior_id) WHERE
        // status='in_progress' serializes concurrent check-ins: the second
        // insert fails as a unique violation.
        let result = sqlx::query(
            "INSERT INTO care_sessions \
             (caregiver_id, senior_id, status, start_time, start_location, start_gps_lat, start_gps_lng, start_photo, created_at) \
             VALUES (?, ?, 'in_progress', ?, ?, ?, ?, ?, ?)",
        )
        .bind(caregiver_id)
        .bind(senior_id)
        .bind(now)
        .bind(&evidence.location)
        .bind(evidence.gps.lat)
        .bind(evidence.gps.lng)
        .bind(&evidence.photo_path)
        .bind(now)
        .execute(&self.pool)
        .await;

        let session_id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(PortError::Conflict(
                    "an in-progress session already exists for this senior".to_string(),
                ))
            }
            Err(e) => return Err(unexpected(e)),
        };
        self.session_by_id(session_id).await
    }

    async fn complete_session(
        &self,
        session_id: i64,
        caregiver_id: i64,
        evidence: AttendanceEvidence,
    ) -> PortResult<CareSession> {
        let done = sqlx::query(
            "UPDATE care_sessions SET status = 'completed', end_time = ?, end_location = ?, \
             end_gps_lat = ?, end_gps_lng = ?, end_photo = ? \
             WHERE id = ? AND caregiver_id = ? AND status = 'in_progress'",
        )
        .bind(Utc::now())
        .bind(&evidence.location)
        .bind(evidence.gps.lat)
        .bind(evidence.gps.lng)
        .bind(&evidence.photo_path)
        .bind(session_id)
        .bind(caregiver_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if done.rows_affected() == 0 {
            // Distinguish "not yours / unknown" from "already terminal".
            let owned = sqlx::query_as::<_, (String,)>(
                "SELECT status FROM care_sessions WHERE id = ? AND caregiver_id = ?",
            )
            .bind(session_id)
            .bind(caregiver_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
            return match owned {
                None => Err(PortError::NotFound(format!(
                    "care session {session_id} not found"
                ))),
                Some((status,)) => Err(PortError::InvalidState(format!(
                    "care session {session_id} is {status}, not in_progress"
                ))),
            };
        }
        self.session_by_id(session_id).await
    }

    async fn cancel_session(&self, session_id: i64, reason: &str) -> PortResult<CareSession> {
        let done = sqlx::query(
            "UPDATE care_sessions SET status = 'cancelled', end_time = ?, cancel_reason = ? \
             WHERE id = ? AND status = 'in_progress'",
        )
        .bind(Utc::now())
        .bind(reason)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if done.rows_affected() == 0 {
            let exists = sqlx::query_as::<_, (String,)>(
                "SELECT status FROM care_sessions WHERE id = ?",
            )
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
            return match exists {
                None => Err(PortError::NotFound(format!(
                    "care session {session_id} not found"
                ))),
                Some((status,)) => Err(PortError::InvalidState(format!(
                    "care session {session_id} is {status}, not in_progress"
                ))),
            };
        }
        self.session_by_id(session_id).await
    }

    async fn session_by_id(&self, session_id: i64) -> PortResult<CareSession> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM care_sessions WHERE id = ?"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("care session {session_id} not found")))?;
        record.to_domain()
    }

    async fn sessions_for_caregiver_today(
        &self,
        caregiver_id: i64,
    ) -> PortResult<Vec<CareSession>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM care_sessions \
             WHERE caregiver_id = ? AND date(start_time) = date('now') \
             ORDER BY start_time DESC"
        ))
        .bind(caregiver_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(SessionRecord::to_domain).collect()
    }

    async fn completed_sessions_since(
        &self,
        caregiver_id: i64,
        since: DateTime<Utc>,
    ) -> PortResult<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM care_sessions \
             WHERE caregiver_id = ? AND status = 'completed' AND start_time >= ?",
        )
        .bind(caregiver_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.0)
    }

    async fn insert_checklist_responses(
        &self,
        session_id: i64,
        responses: Vec<NewChecklistResponse>,
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let now = Utc::now();

        for response in &responses {
            let answer_json = serde_json::to_string(&response.answer)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            let result = sqlx::query(
                "INSERT INTO checklist_responses \
                 (care_session_id, question_key, question_text, category, answer, notes, score, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(session_id)
            .bind(response.question_key.as_str())
            .bind(&response.question_text)
            .bind(response.category.as_str())
            .bind(answer_json)
            .bind(&response.notes)
            .bind(response.score as i64)
            .bind(now)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {}
                // Append-once: a duplicate key fails the whole batch and the
                // transaction rolls back on drop.
                Err(e) if is_unique_violation(&e) => {
                    return Err(PortError::Conflict(format!(
                        "checklist answer for {} was already submitted",
                        response.question_key.as_str()
                    )))
                }
                Err(e) => return Err(unexpected(e)),
            }
        }

        tx.commit().await.map_err(unexpected)
    }

    async fn checklist_for_session(
        &self,
        session_id: i64,
    ) -> PortResult<Vec<ChecklistResponse>> {
        let records = sqlx::query_as::<_, ChecklistRecord>(
            "SELECT id, care_session_id, question_key, question_text, category, answer, notes, score, created_at \
             FROM checklist_responses WHERE care_session_id = ? ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ChecklistRecord::to_domain).collect()
    }

    async fn checklist_count(&self, session_id: i64) -> PortResult<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM checklist_responses WHERE care_session_id = ?",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.0)
    }

    async fn insert_care_notes(
        &self,
        session_id: i64,
        notes: Vec<NewCareNote>,
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let now = Utc::now();
        for note in &notes {
            sqlx::query(
                "INSERT INTO care_notes (care_session_id, question_type, question_text, content, created_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(session_id)
            .bind(note.kind.as_str())
            .bind(&note.question_text)
            .bind(&note.content)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }
        tx.commit().await.map_err(unexpected)
    }

    async fn notes_for_session(&self, session_id: i64) -> PortResult<Vec<CareNote>> {
        let records = sqlx::query_as::<_, CareNoteRecord>(
            "SELECT id, care_session_id, question_type, question_text, content, created_at \
             FROM care_notes WHERE care_session_id = ? ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(CareNoteRecord::to_domain).collect()
    }

    async fn insert_report(&self, report: NewAiReport) -> PortResult<AiReport> {
        let keywords = serde_json::to_string(&report.keywords)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let special_notes = serde_json::to_string(&report.special_notes)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO ai_reports (care_session_id, keywords, content, ai_comment, ai_score, special_notes, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 'generated', ?)",
        )
        .bind(report.care_session_id)
        .bind(keywords)
        .bind(&report.content)
        .bind(&report.ai_comment)
        .bind(report.ai_score)
        .bind(special_notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        let report_id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(PortError::Conflict(format!(
                    "a report already exists for session {}",
                    report.care_session_id
                )))
            }
            Err(e) => return Err(unexpected(e)),
        };
        self.report_by_id(report_id).await
    }

    async fn report_by_id(&self, report_id: i64) -> PortResult<AiReport> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {REPORT_COLUMNS} FROM ai_reports WHERE id = ?"
        ))
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("report {report_id} not found")))?;
        record.to_domain()
    }

    async fn report_for_session(&self, session_id: i64) -> PortResult<Option<AiReport>> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {REPORT_COLUMNS} FROM ai_reports WHERE care_session_id = ?"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(ReportRecord::to_domain).transpose()
    }

    async fn mark_report_read(&self, report_id: i64) -> PortResult<()> {
        sqlx::query("UPDATE ai_reports SET status = 'read' WHERE id = ? AND status = 'generated'")
            .bind(report_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn reports_for_guardian(
        &self,
        guardian_id: i64,
        query: ReportQuery,
    ) -> PortResult<(Vec<ReportListItem>, i64)> {
        // Scoping happens in the JOIN: only seniors assigned to this guardian
        // can ever appear in the result.
        let mut where_clause = String::from(
            "FROM ai_reports r \
             JOIN care_sessions cs ON cs.id = r.care_session_id \
             JOIN seniors s ON s.id = cs.senior_id \
             JOIN senior_guardians sg ON sg.senior_id = s.id \
             JOIN caregivers c ON c.id = cs.caregiver_id \
             WHERE sg.guardian_id = ?",
        );
        if query.senior_id.is_some() {
            where_clause.push_str(" AND cs.senior_id = ?");
        }

        let count_sql = format!("SELECT COUNT(*) {where_clause}");
        let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql).bind(guardian_id);
        if let Some(senior_id) = query.senior_id {
            count_query = count_query.bind(senior_id);
        }
        let (total,) = count_query.fetch_one(&self.pool).await.map_err(unexpected)?;

        let page = query.page.max(1);
        let size = query.size.clamp(1, 100);
        let offset = (page as i64 - 1) * size as i64;

        let list_sql = format!(
            "SELECT r.id, r.care_session_id, r.keywords, r.content, r.ai_comment, r.ai_score, \
             r.special_notes, r.status, r.created_at, \
             s.id AS senior_id, s.name AS senior_name, c.name AS caregiver_name, \
             cs.start_time AS session_date \
             {where_clause} ORDER BY r.created_at DESC, r.id DESC LIMIT ? OFFSET ?"
        );
        let mut list_query = sqlx::query_as::<_, ReportListRecord>(&list_sql).bind(guardian_id);
        if let Some(senior_id) = query.senior_id {
            list_query = list_query.bind(senior_id);
        }
        let records = list_query
            .bind(size as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let items = records
            .into_iter()
            .map(ReportListRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn weekly_scores(&self, senior_id: i64, weeks: u32) -> PortResult<Vec<WeeklyScore>> {
        let since = Utc::now() - chrono::Duration::weeks(weeks as i64);
        let records = sqlx::query_as::<_, WeeklyScoreRecord>(
            "SELECT MIN(date(cr.created_at)) AS week_start, \
                    AVG(CAST(cr.score AS REAL)) AS average_score, \
                    COUNT(*) AS response_count \
             FROM checklist_responses cr \
             JOIN care_sessions cs ON cs.id = cr.care_session_id \
             WHERE cs.senior_id = ? AND cr.created_at >= ? \
             GROUP BY strftime('%Y-%W', cr.created_at) \
             ORDER BY week_start ASC",
        )
        .bind(senior_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(|r| WeeklyScore {
                week_start: r.week_start,
                average_score: r.average_score,
                response_count: r.response_count,
            })
            .collect())
    }

    async fn insert_feedback(
        &self,
        report_id: i64,
        guardian_id: i64,
        message: &str,
        requirements: Option<&str>,
    ) -> PortResult<GuardianFeedback> {
        let now = Utc::now();
        let done = sqlx::query(
            "INSERT INTO feedbacks (ai_report_id, guardian_id, message, requirements, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(report_id)
        .bind(guardian_id)
        .bind(message)
        .bind(requirements)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(GuardianFeedback {
            id: done.last_insert_rowid(),
            ai_report_id: report_id,
            guardian_id,
            message: message.to_string(),
            requirements: requirements.map(str::to_string),
            created_at: now,
        })
    }

    async fn insert_notification(&self, notification: NewNotification) -> PortResult<()> {
        let data = notification
            .data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        sqlx::query(
            "INSERT INTO notifications (sender_id, receiver_id, type, title, content, data, is_read, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(notification.sender_id)
        .bind(notification.receiver_id)
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(data)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn notifications_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: i64,
    ) -> PortResult<Vec<Notification>> {
        let sql = if unread_only {
            "SELECT id, sender_id, receiver_id, type, title, content, data, is_read, created_at \
             FROM notifications WHERE receiver_id = ? AND is_read = 0 \
             ORDER BY created_at DESC LIMIT ?"
        } else {
            "SELECT id, sender_id, receiver_id, type, title, content, data, is_read, created_at \
             FROM notifications WHERE receiver_id = ? \
             ORDER BY created_at DESC LIMIT ?"
        };
        let records = sqlx::query_as::<_, NotificationRecord>(sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records
            .into_iter()
            .map(NotificationRecord::to_domain)
            .collect()
    }

    async fn mark_notification_read(&self, notification_id: i64, user_id: i64) -> PortResult<()> {
        let done = sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = ? WHERE id = ? AND receiver_id = ?",
        )
        .bind(Utc::now())
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if done.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "notification {notification_id} not found"
            )));
        }
        Ok(())
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

#[derive(FromRow)]
struct ReportListRecord {
    id: i64,
    care_session_id: i64,
    keywords: String,
    content: String,
    ai_comment: String,
    ai_score: f64,
    special_notes: String,
    status: String,
    created_at: DateTime<Utc>,
    senior_id: i64,
    senior_name: String,
    caregiver_name: String,
    session_date: DateTime<Utc>,
}

impl ReportListRecord {
    fn to_domain(self) -> PortResult<ReportListItem> {
        let report = ReportRecord {
            id: self.id,
            care_session_id: self.care_session_id,
            keywords: self.keywords,
            content: self.content,
            ai_comment: self.ai_comment,
            ai_score: self.ai_score,
            special_notes: self.special_notes,
            status: self.status,
            created_at: self.created_at,
        }
        .to_domain()?;
        Ok(ReportListItem {
            report,
            senior_id: self.senior_id,
            senior_name: self.senior_name,
            caregiver_name: self.caregiver_name,
            session_date: self.session_date,
        })
    }
}

impl DbAdapter {
    async fn diseases_for(&self, senior_id: i64) -> PortResult<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT disease_type FROM senior_diseases WHERE senior_id = ? ORDER BY disease_type",
        )
        .bind(senior_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(|(d,)| d).collect())
    }

    async fn attach_diseases(&self, records: Vec<SeniorRecord>) -> PortResult<Vec<Senior>> {
        let mut seniors = Vec::with_capacity(records.len());
        for record in records {
            let diseases = self.diseases_for(record.id).await?;
            seniors.push(record.to_domain(diseases));
        }
        Ok(seniors)
    }
}
