//! services/api/tests/common/mod.rs
//!
//! Shared harness for the integration tests: a real sqlite database in a
//! temp directory, a stub AI adapter, and the same router the binary serves.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use tower::ServiceExt;

use api_lib::{
    adapters::{db::DbAdapter, photos::LocalPhotoStore},
    config::Config,
    web::{build_router, state::AppState},
};
use goodhands_core::domain::{Senior, User, UserRole};
use goodhands_core::ports::{
    NewSenior, NewUser, PortError, PortResult, ReportSynthesis, ReportSynthesisInput,
    ReportSynthesisService, TrendAnalysis, TrendAnalysisInput,
};

pub const PASSWORD: &str = "password123";

//=========================================================================================
// Stub AI Adapter
//=========================================================================================

/// A deterministic stand-in for the AI capability.
pub struct StubAi {
    pub fail: bool,
}

#[async_trait]
impl ReportSynthesisService for StubAi {
    async fn synthesize_report(&self, input: &ReportSynthesisInput) -> PortResult<ReportSynthesis> {
        if self.fail {
            return Err(PortError::Upstream("stub outage".to_string()));
        }
        Ok(ReportSynthesis {
            keywords: vec!["calm".to_string(), "good appetite".to_string()],
            content: format!("{} had a good day.", input.senior_name),
            ai_comment: "Keep up the great care.".to_string(),
            ai_score: 4.2,
            special_notes: vec![],
        })
    }

    async fn analyze_trend(&self, _input: &TrendAnalysisInput) -> PortResult<TrendAnalysis> {
        if self.fail {
            return Err(PortError::Upstream("stub outage".to_string()));
        }
        Ok(TrendAnalysis {
            trend: "improving".to_string(),
            score_changes: vec![0.3],
            insights: vec!["scores are rising".to_string()],
            recommendations: vec!["maintain the routine".to_string()],
        })
    }
}

//=========================================================================================
// Test Application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub store: Arc<DbAdapter>,
    _dir: TempDir,
}

/// Boots the full application over a fresh sqlite file.
pub async fn spawn_app(fail_ai: bool) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("test.db");
    let upload_dir = dir.path().join("uploads");

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&format!("sqlite://{}?mode=rwc", db_path.display()))
        .await
        .expect("connect sqlite");
    let store = Arc::new(DbAdapter::new(pool));
    store.run_migrations().await.expect("migrations");

    let config = Arc::new(Config {
        bind_address: "127.0.0.1:0".parse().expect("addr"),
        database_url: String::new(),
        log_level: tracing::Level::INFO,
        jwt_secret: "integration-test-secret".to_string(),
        access_token_minutes: 30,
        upload_dir: upload_dir.clone(),
        max_upload_bytes: 10 * 1024 * 1024,
        openai_api_key: None,
        report_model: "stub".to_string(),
        ai_timeout: Duration::from_secs(5),
        ai_max_retries: 0,
    });

    let state = Arc::new(AppState {
        store: store.clone(),
        photos: Arc::new(LocalPhotoStore::new(upload_dir)),
        ai: Arc::new(StubAi { fail: fail_ai }),
        config,
    });

    TestApp {
        router: build_router(state),
        store,
        _dir: dir,
    }
}

//=========================================================================================
// Seed Data
//=========================================================================================

pub struct Seed {
    pub caregiver_user: User,
    pub caregiver_id: i64,
    pub guardian_user: User,
    pub guardian_id: i64,
    pub admin_user: User,
    pub senior: Senior,
}

fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("hash")
        .to_string()
}

/// One caregiver (CG001), one guardian (GD001), one admin (AD001), and a
/// senior with hypertension assigned to both.
pub async fn seed(store: &DbAdapter) -> Seed {
    use goodhands_core::ports::CareStore;

    let hashed = hash_password(PASSWORD);
    let caregiver_user = store
        .create_user(NewUser {
            user_code: "CG001".to_string(),
            role: UserRole::Caregiver,
            name: "Minji Park".to_string(),
            phone: None,
            email: None,
            hashed_password: hashed.clone(),
            country: None,
            relationship: None,
        })
        .await
        .expect("caregiver user");
    let guardian_user = store
        .create_user(NewUser {
            user_code: "GD001".to_string(),
            role: UserRole::Guardian,
            name: "David Kim".to_string(),
            phone: None,
            email: None,
            hashed_password: hashed.clone(),
            country: Some("USA".to_string()),
            relationship: Some("son".to_string()),
        })
        .await
        .expect("guardian user");
    let admin_user = store
        .create_user(NewUser {
            user_code: "AD001".to_string(),
            role: UserRole::Administrator,
            name: "Admin".to_string(),
            phone: None,
            email: None,
            hashed_password: hashed,
            country: None,
            relationship: None,
        })
        .await
        .expect("admin user");

    let caregiver = store
        .caregiver_by_user(caregiver_user.id)
        .await
        .expect("caregiver profile");
    let guardian = store
        .guardian_by_user(guardian_user.id)
        .await
        .expect("guardian profile");

    let senior = store
        .create_senior(NewSenior {
            name: "Grandma Kim".to_string(),
            age: Some(81),
            gender: Some("female".to_string()),
            photo: None,
            caregiver_id: caregiver.id,
            guardian_ids: vec![guardian.id],
            diseases: vec!["hypertension".to_string()],
        })
        .await
        .expect("senior");

    Seed {
        caregiver_user,
        caregiver_id: caregiver.id,
        guardian_user,
        guardian_id: guardian.id,
        admin_user,
        senior,
    }
}

//=========================================================================================
// Request Helpers
//=========================================================================================

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = resp.into_body().collect().await.expect("body").to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

fn with_auth(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn get(
    app: &Router,
    path: &str,
    token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let req = with_auth(Request::builder().method("GET").uri(path), token)
        .body(Body::empty())
        .expect("request");
    send(app, req).await
}

pub async fn post_json(
    app: &Router,
    path: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = with_auth(Request::builder().method("POST").uri(path), token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(app, req).await
}

pub async fn put(
    app: &Router,
    path: &str,
    token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let req = with_auth(Request::builder().method("PUT").uri(path), token)
        .body(Body::empty())
        .expect("request");
    send(app, req).await
}

/// Logs in and returns the access token.
pub async fn login(app: &Router, user_code: &str, password: &str) -> String {
    let (status, body) = post_json(
        app,
        "/api/auth/login",
        None,
        serde_json::json!({"user_code": user_code, "password": password}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access_token"]
        .as_str()
        .expect("access_token")
        .to_string()
}

//=========================================================================================
// Multipart Helpers
//=========================================================================================

const BOUNDARY: &str = "test-boundary-7f4a";

/// Builds a multipart form with text fields and one photo file.
pub fn attendance_body(fields: &[(&str, String)], photo_name: &str) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{photo_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"fake image bytes");
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub async fn post_multipart(
    app: &Router,
    path: &str,
    token: &str,
    content_type: &str,
    body: Vec<u8>,
) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("request");
    send(app, req).await
}

/// Checks in against the given senior and returns the new session id.
pub async fn check_in(app: &Router, token: &str, senior_id: i64) -> i64 {
    let (content_type, body) = attendance_body(
        &[
            ("senior_id", senior_id.to_string()),
            ("location", "12 Maple St".to_string()),
            ("gps_lat", "37.5665".to_string()),
            ("gps_lng", "126.9780".to_string()),
        ],
        "arrival.jpg",
    );
    let (status, json) = post_multipart(
        app,
        "/api/caregiver/attendance/checkin",
        token,
        &content_type,
        body,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "check-in failed: {json}");
    json["id"].as_i64().expect("session id")
}

/// Checks out of the given session.
pub async fn check_out(app: &Router, token: &str, session_id: i64) -> (StatusCode, serde_json::Value) {
    let (content_type, body) = attendance_body(
        &[
            ("session_id", session_id.to_string()),
            ("location", "12 Maple St".to_string()),
            ("gps_lat", "37.5665".to_string()),
            ("gps_lng", "126.9780".to_string()),
        ],
        "departure.jpg",
    );
    post_multipart(
        app,
        "/api/caregiver/attendance/checkout",
        token,
        &content_type,
        body,
    )
    .await
}

/// Submits one yes/no checklist answer.
pub async fn submit_answer(
    app: &Router,
    token: &str,
    session_id: i64,
    senior_id: i64,
    question_key: &str,
    answer: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    post_json(
        app,
        "/api/caregiver/checklist",
        Some(token),
        serde_json::json!({
            "session_id": session_id,
            "senior_id": senior_id,
            "responses": [{"question_key": question_key, "answer": answer}],
        }),
    )
    .await
}
