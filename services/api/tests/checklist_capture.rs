//! services/api/tests/checklist_capture.rs
//!
//! Checklist and care-note submission: template lookup, append-once
//! semantics, batch rollback on duplicates, and the submission window.

mod common;

use axum::http::StatusCode;
use common::*;
use goodhands_core::ports::CareStore;
use serde_json::json;

#[tokio::test]
async fn template_includes_disease_specific_questions() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;

    let (status, body) = get(
        &app.router,
        &format!("/api/caregiver/checklist-template/{}", seed.senior.id),
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body["questions"]
        .as_array()
        .expect("questions")
        .iter()
        .filter_map(|q| q["question_key"].as_str())
        .collect();
    // Ten common questions plus the hypertension group.
    assert_eq!(keys.len(), 13);
    assert!(keys.contains(&"meal_intake"));
    assert!(keys.contains(&"blood_pressure_check"));
    assert!(keys.contains(&"dizziness"));
    // No dementia questions for this senior.
    assert!(!keys.contains(&"memory_check"));
}

#[tokio::test]
async fn answers_are_scored_and_stored() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;
    let session_id = check_in(&app.router, &token, seed.senior.id).await;

    let (status, body) = post_json(
        &app.router,
        "/api/caregiver/checklist",
        Some(&token),
        json!({
            "session_id": session_id,
            "senior_id": seed.senior.id,
            "responses": [
                {"question_key": "medication_taken", "answer": {"value": true}},
                {"question_key": "mood_state", "answer": {"selected": "good"}},
                {"question_key": "blood_pressure_check",
                 "answer": {"value": true, "systolic": 120, "diastolic": 80}},
            ],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["saved"], 3);

    let stored = app
        .store
        .checklist_for_session(session_id)
        .await
        .expect("stored rows");
    let score_of = |key: &str| {
        stored
            .iter()
            .find(|r| r.question_key.as_str() == key)
            .map(|r| r.score)
    };
    assert_eq!(score_of("medication_taken"), Some(5));
    assert_eq!(score_of("mood_state"), Some(4));
    // 120/80 is a normal reading: health category, score 5.
    assert_eq!(score_of("blood_pressure_check"), Some(5));
}

#[tokio::test]
async fn duplicate_question_key_conflicts_and_rolls_back_the_batch() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;
    let session_id = check_in(&app.router, &token, seed.senior.id).await;

    let (status, _) = submit_answer(
        &app.router,
        &token,
        session_id,
        seed.senior.id,
        "medication_taken",
        json!({"value": true}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // A batch with one fresh key and one duplicate fails as a whole.
    let (status, body) = post_json(
        &app.router,
        "/api/caregiver/checklist",
        Some(&token),
        json!({
            "session_id": session_id,
            "senior_id": seed.senior.id,
            "responses": [
                {"question_key": "water_intake", "answer": {"value": true}},
                {"question_key": "medication_taken", "answer": {"value": false}},
            ],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    // The fresh key from the failed batch was not written.
    let count = app.store.checklist_count(session_id).await.expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn unknown_keys_and_shape_mismatches_are_rejected() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;
    let session_id = check_in(&app.router, &token, seed.senior.id).await;

    let (status, body) = submit_answer(
        &app.router,
        &token,
        session_id,
        seed.senior.id,
        "favorite_color",
        json!({"value": true}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    // A yes/no answer for a choice question.
    let (status, _) = submit_answer(
        &app.router,
        &token,
        session_id,
        seed.senior.id,
        "mood_state",
        json!({"value": true}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // An option outside the declared list.
    let (status, _) = submit_answer(
        &app.router,
        &token,
        session_id,
        seed.senior.id,
        "mood_state",
        json!({"selected": "ecstatic"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing was stored.
    let count = app.store.checklist_count(session_id).await.expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn submission_window_allows_completed_until_report_exists() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;
    let session_id = check_in(&app.router, &token, seed.senior.id).await;

    let (status, _) = submit_answer(
        &app.router,
        &token,
        session_id,
        seed.senior.id,
        "medication_taken",
        json!({"value": true}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Completed, no report yet: still open.
    check_out(&app.router, &token, session_id).await;
    let (status, _) = submit_answer(
        &app.router,
        &token,
        session_id,
        seed.senior.id,
        "sleep_quality",
        json!({"selected": "well"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Once the report exists the window closes.
    let (status, _) = post_json(
        &app.router,
        "/api/ai/generate-report",
        Some(&token),
        json!({"session_id": session_id}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = submit_answer(
        &app.router,
        &token,
        session_id,
        seed.senior.id,
        "meal_intake",
        json!({"selected": "full"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn care_notes_validate_count_kind_and_length() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let token = login(&app.router, "CG001", PASSWORD).await;
    let session_id = check_in(&app.router, &token, seed.senior.id).await;

    let (status, body) = post_json(
        &app.router,
        "/api/caregiver/care-note",
        Some(&token),
        json!({
            "session_id": session_id,
            "senior_id": seed.senior.id,
            "notes": [
                {"question_type": "special_moments", "content": "Sang along to an old record."},
                {"question_type": "emotional_state", "content": "Cheerful all afternoon."},
            ],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["saved"], 2);

    // Unknown kind.
    let (status, _) = post_json(
        &app.router,
        "/api/caregiver/care-note",
        Some(&token),
        json!({
            "session_id": session_id,
            "senior_id": seed.senior.id,
            "notes": [{"question_type": "gossip", "content": "..."}],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Empty content.
    let (status, _) = post_json(
        &app.router,
        "/api/caregiver/care-note",
        Some(&token),
        json!({
            "session_id": session_id,
            "senior_id": seed.senior.id,
            "notes": [{"question_type": "changes", "content": "   "}],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Over 1000 characters.
    let (status, _) = post_json(
        &app.router,
        "/api/caregiver/care-note",
        Some(&token),
        json!({
            "session_id": session_id,
            "senior_id": seed.senior.id,
            "notes": [{"question_type": "changes", "content": "x".repeat(1001)}],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // More than ten notes.
    let many: Vec<_> = (0..11)
        .map(|i| json!({"question_type": "conversation", "content": format!("note {i}")}))
        .collect();
    let (status, _) = post_json(
        &app.router,
        "/api/caregiver/care-note",
        Some(&token),
        json!({
            "session_id": session_id,
            "senior_id": seed.senior.id,
            "notes": many,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn guardian_cannot_submit_checklist_data() {
    let app = spawn_app(false).await;
    let seed = seed(&app.store).await;
    let cg_token = login(&app.router, "CG001", PASSWORD).await;
    let gd_token = login(&app.router, "GD001", PASSWORD).await;
    let session_id = check_in(&app.router, &cg_token, seed.senior.id).await;

    let (status, body) = submit_answer(
        &app.router,
        &gd_token,
        session_id,
        seed.senior.id,
        "medication_taken",
        json!({"value": true}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}
