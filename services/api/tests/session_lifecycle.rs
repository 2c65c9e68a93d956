//! services/api/tests/session_lifecycle.rs
//!
//! End-to-end coverage of login and the care-session state machine:
//! check-in evidence validation, the one-active-session invariant, checkout,
//! admin cancellation, and account deactivation.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn login_returns_token_and_role() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;

    let (status, body) = post_json(
        &app.router,
        "/api/auth/login",
        None,
        json!({"user_code": "CG001", "password": PASSWORD}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_type"], "caregiver");
    assert_eq!(body["expires_in"], 1800);
    assert_eq!(body["user_info"]["user_code"], "CG001");
    assert_eq!(body["user_info"]["id"], seed.caregiver_user.id);
    assert!(body["access_token"].as_str().is_some());
}

#[tokio::test]
async fn wrong_password_and_unknown_code_are_indistinguishable() {
    let app = spawn_app(false).await;
    seed(&app.store).await;

    let (status_wrong, body_wrong) = post_json(
        &app.router,
        "/api/auth/login",
        None,
        json!({"user_code": "CG001", "password": "nope12345"}),
    )
    .await;
    let (status_unknown, body_unknown) = post_json(
        &app.router,
        "/api/auth/login",
        None,
        json!({"user_code": "ZZ999", "password": PASSWORD}),
    )
    .await;

    assert_eq!(status_wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(status_unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(body_wrong["error"], "UNAUTHORIZED");
    assert_eq!(body_wrong["message"], body_unknown["message"]);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = spawn_app(false).await;
    seed(&app.store).await;

    let (status, body) = get(&app.router, "/api/caregiver/home", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert_eq!(body["status_code"], 401);

    let (status, _) = get(&app.router, "/api/caregiver/home", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn check_in_then_out_completes_the_session() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;

    let session_id = check_in(&app.router, &token, seed.senior.id).await;

    let (status, body) = check_out(&app.router, &token, session_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert!(body["end_time"].as_str().is_some());
    assert!(body["end_photo"].as_str().is_some());
}

#[tokio::test]
async fn second_check_in_for_the_same_pair_conflicts() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;

    check_in(&app.router, &token, seed.senior.id).await;

    let (content_type, body) = attendance_body(
        &[
            ("senior_id", seed.senior.id.to_string()),
            ("location", "12 Maple St".to_string()),
            ("gps_lat", "37.5665".to_string()),
            ("gps_lng", "126.9780".to_string()),
        ],
        "again.jpg",
    );
    let (status, json) = post_multipart(
        &app.router,
        "/api/caregiver/attendance/checkin",
        &token,
        &content_type,
        body,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "CONFLICT");
}

#[tokio::test]
async fn concurrent_check_ins_admit_exactly_one() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;

    async fn try_check_in(
        app: &common::TestApp,
        token: &str,
        senior_id: i64,
        photo: &str,
    ) -> (StatusCode, serde_json::Value) {
        let (content_type, body) = attendance_body(
            &[
                ("senior_id", senior_id.to_string()),
                ("location", "12 Maple St".to_string()),
                ("gps_lat", "37.5665".to_string()),
                ("gps_lng", "126.9780".to_string()),
            ],
            photo,
        );
        post_multipart(
            &app.router,
            "/api/caregiver/attendance/checkin",
            token,
            &content_type,
            body,
        )
        .await
    }

    let (first, second) = tokio::join!(
        try_check_in(&app, &token, seed.senior.id, "first.jpg"),
        try_check_in(&app, &token, seed.senior.id, "second.jpg"),
    );

    // The active-session uniqueness must hold under the race: one 201, one 409.
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(
        statuses,
        [StatusCode::CREATED, StatusCode::CONFLICT],
        "first: {}, second: {}",
        first.1,
        second.1
    );
}

#[tokio::test]
async fn check_in_rejects_bad_gps_and_bad_photo() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;

    // Latitude out of range.
    let (content_type, body) = attendance_body(
        &[
            ("senior_id", seed.senior.id.to_string()),
            ("location", "12 Maple St".to_string()),
            ("gps_lat", "95.0".to_string()),
            ("gps_lng", "126.9780".to_string()),
        ],
        "arrival.jpg",
    );
    let (status, json) = post_multipart(
        &app.router,
        "/api/caregiver/attendance/checkin",
        &token,
        &content_type,
        body,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "VALIDATION_ERROR");

    // Disallowed extension.
    let (content_type, body) = attendance_body(
        &[
            ("senior_id", seed.senior.id.to_string()),
            ("location", "12 Maple St".to_string()),
            ("gps_lat", "37.5665".to_string()),
            ("gps_lng", "126.9780".to_string()),
        ],
        "arrival.pdf",
    );
    let (status, _) = post_multipart(
        &app.router,
        "/api/caregiver/attendance/checkin",
        &token,
        &content_type,
        body,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn double_checkout_fails_never_silently_succeeds() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;

    let session_id = check_in(&app.router, &token, seed.senior.id).await;
    let (status, _) = check_out(&app.router, &token, session_id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = check_out(&app.router, &token, session_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn checkout_of_unknown_session_is_404() {
    let app = spawn_app(false).await;
    seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;

    let (status, body) = check_out(&app.router, &token, 9999).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn admin_cancels_an_in_progress_session() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let cg_token = login(&app.router, "CG001", PASSWORD).await;
    let admin_token = login(&app.router, "AD001", PASSWORD).await;

    let session_id = check_in(&app.router, &cg_token, seed.senior.id).await;

    let (status, body) = post_json(
        &app.router,
        &format!("/api/admin/sessions/{session_id}/cancel"),
        Some(&admin_token),
        json!({"reason": "caregiver reported sick"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    // Cancelled is terminal: checkout now fails with InvalidState.
    let (status, _) = check_out(&app.router, &cg_token, session_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // And a caregiver cannot cancel.
    let other = check_in(&app.router, &cg_token, seed.senior.id).await;
    let (status, _) = post_json(
        &app.router,
        &format!("/api/admin/sessions/{other}/cancel"),
        Some(&cg_token),
        json!({"reason": "nope"}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivated_account_loses_access_immediately() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let cg_token = login(&app.router, "CG001", PASSWORD).await;
    let admin_token = login(&app.router, "AD001", PASSWORD).await;

    let (status, _) = get(&app.router, "/api/caregiver/home", Some(&cg_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = put(
        &app.router,
        &format!("/api/admin/users/{}/deactivate", seed.caregiver_user.id),
        Some(&admin_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The previously issued token no longer works.
    let (status, _) = get(&app.router, "/api/caregiver/home", Some(&cg_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Login is refused too, with the explicit disabled message.
    let (status, body) = post_json(
        &app.router,
        "/api/auth/login",
        None,
        json!({"user_code": "CG001", "password": PASSWORD}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"]
        .as_str()
        .is_some_and(|m| m.contains("deactivated")));

    // Re-activation restores login.
    let (status, _) = put(
        &app.router,
        &format!("/api/admin/users/{}/activate", seed.caregiver_user.id),
        Some(&admin_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    login(&app.router, "CG001", PASSWORD).await;
}

#[tokio::test]
async fn admin_preregisters_a_user_who_can_then_log_in() {
    let app = spawn_app(false).await;
    seed(&app.store).await;
    let admin_token = login(&app.router, "AD001", PASSWORD).await;

    let (status, body) = post_json(
        &app.router,
        "/api/admin/users",
        Some(&admin_token),
        json!({
            "user_code": "CG002",
            "user_type": "caregiver",
            "name": "Sora Lee",
            "password": "caresafe99",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    login(&app.router, "CG002", "caresafe99").await;

    // Duplicate code conflicts.
    let (status, _) = post_json(
        &app.router,
        "/api/admin/users",
        Some(&admin_token),
        json!({
            "user_code": "CG002",
            "user_type": "caregiver",
            "name": "Someone Else",
            "password": "caresafe99",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Bad code format and weak password are validation errors.
    let (status, _) = post_json(
        &app.router,
        "/api/admin/users",
        Some(&admin_token),
        json!({
            "user_code": "bad",
            "user_type": "caregiver",
            "name": "X",
            "password": "caresafe99",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post_json(
        &app.router,
        "/api/admin/users",
        Some(&admin_token),
        json!({
            "user_code": "CG003",
            "user_type": "caregiver",
            "name": "X",
            "password": "short",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn admin_registers_a_schedule_shown_on_the_caregiver_home() {
    use chrono::Datelike;

    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let admin_token = login(&app.router, "AD001", PASSWORD).await;
    let cg_token = login(&app.router, "CG001", PASSWORD).await;

    let today = chrono::Utc::now().weekday().num_days_from_sunday();
    let slot = json!({
        "caregiver_id": seed.caregiver_id,
        "senior_id": seed.senior.id,
        "day_of_week": today,
        "start_time": "09:00",
        "end_time": "11:00",
    });

    let (status, body) =
        post_json(&app.router, "/api/admin/schedules", Some(&admin_token), slot.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["day_of_week"], today);

    // The same slot twice conflicts.
    let (status, _) =
        post_json(&app.router, "/api/admin/schedules", Some(&admin_token), slot).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Malformed times are rejected.
    let (status, _) = post_json(
        &app.router,
        "/api/admin/schedules",
        Some(&admin_token),
        json!({
            "caregiver_id": seed.caregiver_id,
            "senior_id": seed.senior.id,
            "day_of_week": today,
            "start_time": "9am",
            "end_time": "11:00",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Today's slot appears on the caregiver home screen with the senior's name.
    let (status, body) = get(&app.router, "/api/caregiver/home", Some(&cg_token)).await;
    assert_eq!(status, StatusCode::OK);
    let schedule = body["today_schedule"]
        .as_array()
        .expect("today_schedule array");
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0]["senior_name"], "Grandma Kim");
    assert_eq!(schedule[0]["start_time"], "09:00");
}

#[tokio::test]
async fn caregiver_home_reflects_todays_work() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;

    let session_id = check_in(&app.router, &token, seed.senior.id).await;
    check_out(&app.router, &token, session_id).await;

    let (status, body) = get(&app.router, "/api/caregiver/home", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["caregiver_name"], "Minji Park");
    assert_eq!(body["seniors_assigned"], 1);
    assert_eq!(body["sessions_completed_this_week"], 1);
    assert_eq!(body["today_sessions"].as_array().map(Vec::len), Some(1));
}
