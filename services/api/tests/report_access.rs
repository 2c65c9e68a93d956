//! services/api/tests/report_access.rs
//!
//! Report generation and the guardian-facing access layer: idempotency,
//! scoping, read-state transitions, feedback, notifications, and upstream
//! failure handling.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

/// Runs a full session for the seeded senior and returns its id.
async fn completed_session_with_data(app: &TestApp, token: &str, senior_id: i64) -> i64 {
    let session_id = check_in(&app.router, token, senior_id).await;
    let (status, _) = submit_answer(
        &app.router,
        token,
        session_id,
        senior_id,
        "medication_taken",
        json!({"value": true}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = check_out(&app.router, token, session_id).await;
    assert_eq!(status, StatusCode::OK);
    session_id
}

#[tokio::test]
async fn report_generation_is_idempotent() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;
    let session_id = completed_session_with_data(&app, &token, seed.senior.id).await;

    let (status, first) = post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&token),
        json!({"session_id": session_id}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["status"], "generated");
    assert!(first["ai_score"].as_f64().is_some());

    // The second call returns the same row, not a second report.
    let (status, second) = post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&token),
        json!({"session_id": session_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["id"], first["id"]);
}

#[tokio::test]
async fn report_requires_completed_session_and_checklist_data() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;

    // Still in progress.
    let session_id = check_in(&app.router, &token, seed.senior.id).await;
    let (status, body) = post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&token),
        json!({"session_id": session_id}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");

    // Completed but with no checklist responses.
    let (status, _) = check_out(&app.router, &token, session_id).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&token),
        json!({"session_id": session_id}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown session.
    let (status, _) = post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&token),
        json!({"session_id": 9999}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upstream_failure_surfaces_as_502_with_data_intact() {
    let app = spawn_app(true).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;
    let session_id = completed_session_with_data(&app, &token, seed.senior.id).await;

    let (status, body) = post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&token),
        json!({"session_id": session_id}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "UPSTREAM_ERROR");

    // Session and checklist survived; a later retry is possible.
    use goodhands_core::ports::CareStore;
    let count = app.store.checklist_count(session_id).await.expect("count");
    assert_eq!(count, 1);
    assert!(app
        .store
        .report_for_session(session_id)
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn guardian_list_is_scoped_and_paginated() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let cg_token = login(&app.router, "CG001", PASSWORD).await;
    let gd_token = login(&app.router, "GD001", PASSWORD).await;
    let session_id = completed_session_with_data(&app, &cg_token, seed.senior.id).await;

    let (status, _) = post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&cg_token),
        json!({"session_id": session_id}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = get(&app.router, "/api/guardian/reports", Some(&gd_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["size"], 20);
    let item = &body["items"][0];
    assert_eq!(item["senior_id"], seed.senior.id);
    assert_eq!(item["senior_name"], "Grandma Kim");
    assert_eq!(item["caregiver_name"], "Minji Park");

    // Filtering by an unassigned senior is 403, not an empty page.
    let (status, body) = get(
        &app.router,
        &format!("/api/guardian/reports?senior_id={}", seed.senior.id + 100),
        Some(&gd_token),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    // Pagination bounds.
    let (status, _) = get(
        &app.router,
        "/api/guardian/reports?page=0",
        Some(&gd_token),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = get(
        &app.router,
        "/api/guardian/reports?size=101",
        Some(&gd_token),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // A caregiver has no guardian profile to list with.
    let (status, _) = get(&app.router, "/api/guardian/reports", Some(&cg_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn first_detail_read_flips_status_and_round_trips_the_checklist() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let cg_token = login(&app.router, "CG001", PASSWORD).await;
    let gd_token = login(&app.router, "GD001", PASSWORD).await;
    let session_id = completed_session_with_data(&app, &cg_token, seed.senior.id).await;

    let (_, report) = post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&cg_token),
        json!({"session_id": session_id}),
    )
    .await;
    let report_id = report["id"].as_i64().expect("report id");

    let (status, body) = get(
        &app.router,
        &format!("/api/guardian/report/{report_id}"),
        Some(&gd_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["status"], "read");
    assert_eq!(body["senior"]["name"], "Grandma Kim");
    assert_eq!(body["caregiver_name"], "Minji Park");
    let answer = &body["checklist"][0];
    assert_eq!(answer["question_key"], "medication_taken");
    assert_eq!(answer["score"], 5);
    assert_eq!(answer["answer"]["value"], true);

    // The flip is persistent.
    let (_, body) = get(
        &app.router,
        &format!("/api/guardian/report/{report_id}"),
        Some(&gd_token),
    )
    .await;
    assert_eq!(body["report"]["status"], "read");
}

#[tokio::test]
async fn report_generation_notifies_guardians() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let cg_token = login(&app.router, "CG001", PASSWORD).await;
    let gd_token = login(&app.router, "GD001", PASSWORD).await;
    let session_id = completed_session_with_data(&app, &cg_token, seed.senior.id).await;

    post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&cg_token),
        json!({"session_id": session_id}),
    )
    .await;

    let (status, body) = get(
        &app.router,
        "/api/notifications?unread_only=true",
        Some(&gd_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["type"], "report");
    assert_eq!(rows[0]["is_read"], false);
    let notification_id = rows[0]["id"].as_i64().expect("id");

    // Another user cannot mark it read.
    let (status, _) = put(
        &app.router,
        &format!("/api/notifications/{notification_id}/read"),
        Some(&cg_token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The receiver can.
    let (status, _) = put(
        &app.router,
        &format!("/api/notifications/{notification_id}/read"),
        Some(&gd_token),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get(
        &app.router,
        "/api/notifications?unread_only=true",
        Some(&gd_token),
    )
    .await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn feedback_notifies_the_caregiver() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let cg_token = login(&app.router, "CG001", PASSWORD).await;
    let gd_token = login(&app.router, "GD001", PASSWORD).await;
    let session_id = completed_session_with_data(&app, &cg_token, seed.senior.id).await;

    let (_, report) = post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&cg_token),
        json!({"session_id": session_id}),
    )
    .await;
    let report_id = report["id"].as_i64().expect("report id");

    let (status, body) = post_json(
        &app.router,
        "/api/guardian/feedback",
        Some(&gd_token),
        json!({
            "ai_report_id": report_id,
            "message": "Thank you, she sounds happy.",
            "requirements": "Please encourage more walks.",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (_, rows) = get(
        &app.router,
        "/api/notifications?unread_only=true",
        Some(&cg_token),
    )
    .await;
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["type"], "feedback");

    // Empty message is a validation error.
    let (status, _) = post_json(
        &app.router,
        "/api/guardian/feedback",
        Some(&gd_token),
        json!({"ai_report_id": report_id, "message": "  "}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Unknown report is 404.
    let (status, _) = post_json(
        &app.router,
        "/api/guardian/feedback",
        Some(&gd_token),
        json!({"ai_report_id": 9999, "message": "hello"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn trend_analysis_short_circuits_on_insufficient_data() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let cg_token = login(&app.router, "CG001", PASSWORD).await;
    let gd_token = login(&app.router, "GD001", PASSWORD).await;

    // One session this week: a single data week only.
    let session_id = completed_session_with_data(&app, &cg_token, seed.senior.id).await;
    let _ = session_id;

    let (status, body) = get(
        &app.router,
        &format!("/api/ai/trend-analysis/{}?weeks=4", seed.senior.id),
        Some(&gd_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trend"], "insufficient_data");
    assert_eq!(body["score_changes"].as_array().map(Vec::len), Some(0));

    // Out-of-range window.
    let (status, _) = get(
        &app.router,
        &format!("/api/ai/trend-analysis/{}?weeks=0", seed.senior.id),
        Some(&gd_token),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // A guardian cannot analyze an unassigned senior.
    let (status, _) = get(
        &app.router,
        &format!("/api/ai/trend-analysis/{}", seed.senior.id + 100),
        Some(&gd_token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn guardian_home_lists_assigned_seniors() {
    let app = spawn_app(false).await;
    seed(&app.store).await;
    let gd_token = login(&app.router, "GD001", PASSWORD).await;

    let (status, body) = get(&app.router, "/api/guardian/home", Some(&gd_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["guardian_name"], "David Kim");
    assert_eq!(body["relationship"], "son");
    assert_eq!(body["seniors"][0]["name"], "Grandma Kim");
    assert_eq!(body["seniors"][0]["diseases"][0], "hypertension");
}
