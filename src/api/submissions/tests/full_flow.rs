use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::test_support;

/// The whole journey over a three-question exam: two mcq questions worth a
/// mark each, one written question worth three. The student answers "4"
/// (right), "x" (wrong) and captures a photo; auto-grading yields one mark,
/// and the total reaches three once the teacher assigns two marks to the
/// written answer.
#[tokio::test]
async fn exam_lifecycle_from_authoring_to_grading() {
    let ctx = test_support::setup_test_context_with_storage().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "full-teacher@example.com").await;
    let student = test_support::insert_student(ctx.state.db(), "full-student@example.com").await;
    let teacher_token = test_support::bearer_token(&teacher.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

    // Author and publish through the API.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&teacher_token),
            Some(json!({
                "title": "Mixed exam",
                "duration_minutes": 30,
                "questions": [
                    {
                        "type": "mcq",
                        "question_text": "What is 2 + 2?",
                        "options": ["2", "4"],
                        "correct_answer": "4",
                        "marks": 1
                    },
                    {
                        "type": "mcq",
                        "question_text": "Differentiate x^2.",
                        "options": ["x", "2x"],
                        "correct_answer": "2x",
                        "marks": 1
                    },
                    {
                        "type": "written",
                        "question_text": "Prove it on paper.",
                        "marks": 3,
                        "solution": "Power rule."
                    }
                ]
            })),
        ))
        .await
        .expect("create exam");
    let status = response.status();
    let exam = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {exam}");
    let exam_id = exam["id"].as_str().expect("exam id").to_string();
    let q1_id = exam["questions"][0]["id"].as_str().expect("q1").to_string();
    let q2_id = exam["questions"][1]["id"].as_str().expect("q2").to_string();
    let q3_id = exam["questions"][2]["id"].as_str().expect("q3").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/{exam_id}/publish"),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("publish exam");
    assert_eq!(response.status(), StatusCode::OK);

    // The student sits the exam.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/submissions/exams/{exam_id}/start"),
            Some(&student_token),
            None,
        ))
        .await
        .expect("start exam");
    let status = response.status();
    let session = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {session}");
    let submission_id = session["submission"]["id"].as_str().expect("submission id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/submissions/{submission_id}/draft"),
            Some(&student_token),
            Some(json!({"answers": {
                (q1_id.clone()): {"text": "4"},
                (q2_id.clone()): {"text": "x"}
            }})),
        ))
        .await
        .expect("save draft");
    assert_eq!(response.status(), StatusCode::OK);

    // The capture upload needs a live object store; record its outcome (the
    // stored key) on the draft the same way the endpoint does.
    let submission = repositories::submissions::fetch_one_by_id(ctx.state.db(), &submission_id)
        .await
        .expect("fetch submission");
    let mut draft = submission.answer_draft.0.clone();
    draft.entry(q3_id.clone()).or_default().image_key =
        Some(format!("{submission_id}/{q3_id}.jpg"));
    repositories::submissions::update_draft(
        ctx.state.db(),
        &submission_id,
        &draft,
        primitive_now_utc(),
    )
    .await
    .expect("record capture");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/submissions/{submission_id}/submit"),
            Some(&student_token),
            None,
        ))
        .await
        .expect("submit exam");
    let status = response.status();
    let submitted = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {submitted}");
    assert_eq!(submitted["is_submitted"], true);
    // Written marks are pending, so the auto-graded total is 1.
    assert_eq!(submitted["total_marks"], 1);

    // The student's result view carries the answer key and the stored image
    // reference.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/submissions/{submission_id}/result"),
            Some(&student_token),
            None,
        ))
        .await
        .expect("result");
    let status = response.status();
    let result = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {result}");
    let answers = result["answers"].as_array().expect("answers");
    assert_eq!(answers.len(), 3);
    assert_eq!(answers[0]["is_correct"], true);
    assert_eq!(answers[1]["is_correct"], false);
    assert_eq!(answers[1]["correct_answer"], "2x");
    assert_eq!(
        answers[2]["answer_image_url"],
        format!("http://localhost:9000/answer-images/{submission_id}/{q3_id}.jpg")
    );

    // The teacher finds the submission on the exam's listing and grades the
    // written answer with 2 of 3 marks.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams/{exam_id}/submissions"),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("list submissions");
    let status = response.status();
    let listing = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {listing}");
    assert_eq!(listing["items"][0]["id"], submission_id.as_str());
    assert_eq!(listing["items"][0]["total_marks"], 1);

    let written_answer_id = {
        let rows = repositories::answers::list_with_questions(ctx.state.db(), &submission_id)
            .await
            .expect("answers");
        rows.iter().find(|row| row.question_id == q3_id).expect("written answer").id.clone()
    };

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/submissions/{submission_id}/grades"),
            Some(&teacher_token),
            Some(json!({"grades": {(written_answer_id): 2}})),
        ))
        .await
        .expect("save grades");
    let status = response.status();
    let graded = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["total_marks"], 3);

    // Invariant check straight off the tables: the stored total equals the
    // sum over the answers.
    let submission = repositories::submissions::fetch_one_by_id(ctx.state.db(), &submission_id)
        .await
        .expect("submission");
    let sum = repositories::answers::sum_marks_for_submission(ctx.state.db(), &submission_id)
        .await
        .expect("sum");
    assert_eq!(submission.total_marks, 3);
    assert_eq!(sum, 3);
}
