use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn start_returns_a_running_session_and_is_idempotent() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "t-start@example.com").await;
    let student = test_support::insert_student(ctx.state.db(), "s-start@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), &teacher.id, "Quiz", 10, true).await;
    test_support::insert_mcq_question(ctx.state.db(), &exam.id, 1, &["2", "4"], "4", 1).await;

    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/submissions/exams/{}/start", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("start exam");
    let status = response.status();
    let session = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {session}");
    let submission_id = session["submission"]["id"].as_str().expect("submission id").to_string();

    let remaining = session["time_remaining"].as_i64().expect("time remaining");
    assert!(remaining > 0 && remaining <= 600, "remaining: {remaining}");
    assert_eq!(session["timer_severity"], "normal");
    assert_eq!(session["question_count"], 1);
    assert_eq!(session["answered_count"], 0);
    // Taking clients never see the answer key.
    assert!(session["exam"]["questions"][0]["correct_answer"].is_null());

    // Entering again resumes the same attempt instead of creating another.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/submissions/exams/{}/start", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("re-enter exam");
    let status = response.status();
    let resumed = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {resumed}");
    assert_eq!(resumed["submission"]["id"], submission_id.as_str());
}

#[tokio::test]
async fn draft_round_trips_through_the_session() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "t-draft@example.com").await;
    let student = test_support::insert_student(ctx.state.db(), "s-draft@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), &teacher.id, "Quiz", 10, true).await;
    let question =
        test_support::insert_mcq_question(ctx.state.db(), &exam.id, 1, &["2", "4"], "4", 1).await;

    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/submissions/exams/{}/start", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("start exam");
    let session = test_support::read_json(response).await;
    let submission_id = session["submission"]["id"].as_str().expect("submission id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/submissions/{submission_id}/draft"),
            Some(&token),
            Some(json!({"answers": {(question.id.clone()): {"text": "4"}}})),
        ))
        .await
        .expect("save draft");
    let status = response.status();
    let saved = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {saved}");
    assert_eq!(saved["success"], true);

    // A fresh session read (a reload) comes back with the same answer.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/submissions/{submission_id}/session"),
            Some(&token),
            None,
        ))
        .await
        .expect("reload session");
    let status = response.status();
    let reloaded = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {reloaded}");
    assert_eq!(reloaded["draft"][&question.id]["text"], "4");
    assert_eq!(reloaded["answered_count"], 1);
}

#[tokio::test]
async fn double_submit_settles_on_one_coherent_submission() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "t-double@example.com").await;
    let student = test_support::insert_student(ctx.state.db(), "s-double@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), &teacher.id, "Quiz", 10, true).await;
    let q1 = test_support::insert_mcq_question(ctx.state.db(), &exam.id, 1, &["2", "4"], "4", 1)
        .await;
    test_support::insert_mcq_question(ctx.state.db(), &exam.id, 2, &["x", "2x"], "2x", 1).await;

    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/submissions/exams/{}/start", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("start exam");
    let session = test_support::read_json(response).await;
    let submission_id = session["submission"]["id"].as_str().expect("submission id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/submissions/{submission_id}/draft"),
            Some(&token),
            Some(json!({"answers": {(q1.id.clone()): {"text": "4"}}})),
        ))
        .await
        .expect("save draft");
    assert_eq!(response.status(), StatusCode::OK);

    // Timer expiry and the manual button racing: both calls succeed, one
    // transition happens.
    let first = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/submissions/{submission_id}/submit"),
            Some(&token),
            None,
        ))
        .await
        .expect("first submit");
    let second = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/submissions/{submission_id}/submit"),
            Some(&token),
            None,
        ))
        .await
        .expect("second submit");

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    let first = test_support::read_json(first).await;
    let second = test_support::read_json(second).await;
    assert_eq!(first["is_submitted"], true);
    assert_eq!(second["is_submitted"], true);
    assert_eq!(first["submitted_at"], second["submitted_at"]);
    assert_eq!(first["total_marks"], 1);

    let answer_count = repositories::answers::count_by_submission(ctx.state.db(), &submission_id)
        .await
        .expect("count answers");
    assert_eq!(answer_count, 2);

    let total = repositories::answers::sum_marks_for_submission(ctx.state.db(), &submission_id)
        .await
        .expect("sum marks");
    assert_eq!(total, 1);

    // Draft is invalidated by the successful submission.
    let submission = repositories::submissions::fetch_one_by_id(ctx.state.db(), &submission_id)
        .await
        .expect("fetch submission");
    assert!(submission.answer_draft.0.is_empty());
}

#[tokio::test]
async fn expired_attempt_finalizes_immediately_on_next_touch() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "t-expired@example.com").await;
    let student = test_support::insert_student(ctx.state.db(), "s-expired@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), &teacher.id, "Quiz", 10, true).await;
    let question =
        test_support::insert_mcq_question(ctx.state.db(), &exam.id, 1, &["2", "4"], "4", 1).await;

    // An attempt started 11 minutes ago on a 10-minute exam.
    let started_at = primitive_now_utc() - Duration::minutes(11);
    let submission_id = Uuid::new_v4().to_string();
    repositories::submissions::create_if_absent(
        ctx.state.db(),
        &submission_id,
        &exam.id,
        &student.id,
        started_at,
        primitive_now_utc(),
    )
    .await
    .expect("insert submission");

    let mut draft = std::collections::HashMap::new();
    draft.insert(
        question.id.clone(),
        crate::db::models::AnswerDraft { text: Some("4".to_string()), image_key: None },
    );
    repositories::submissions::update_draft(
        ctx.state.db(),
        &submission_id,
        &draft,
        primitive_now_utc(),
    )
    .await
    .expect("seed draft");

    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/submissions/{submission_id}/session"),
            Some(&token),
            None,
        ))
        .await
        .expect("session on stale attempt");

    // The stale session completes immediately, exactly once; the read
    // reports the attempt as already finished.
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let submission = repositories::submissions::fetch_one_by_id(ctx.state.db(), &submission_id)
        .await
        .expect("fetch submission");
    assert!(submission.is_submitted);
    assert_eq!(submission.total_marks, 1);

    let answers = repositories::answers::list_by_submission(ctx.state.db(), &submission_id)
        .await
        .expect("answers");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].answer_text.as_deref(), Some("4"));
    assert_eq!(answers[0].is_correct, Some(true));
}

#[tokio::test]
async fn other_students_submissions_answer_not_found() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "t-404@example.com").await;
    let student = test_support::insert_student(ctx.state.db(), "s-404@example.com").await;
    let intruder = test_support::insert_student(ctx.state.db(), "intruder@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), &teacher.id, "Quiz", 10, true).await;
    test_support::insert_mcq_question(ctx.state.db(), &exam.id, 1, &["2", "4"], "4", 1).await;

    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/submissions/exams/{}/start", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("start exam");
    let session = test_support::read_json(response).await;
    let submission_id = session["submission"]["id"].as_str().expect("submission id").to_string();

    let intruder_token = test_support::bearer_token(&intruder.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/submissions/{submission_id}/session"),
            Some(&intruder_token),
            None,
        ))
        .await
        .expect("session as intruder");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
