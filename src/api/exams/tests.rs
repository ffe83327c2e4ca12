use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

fn exam_payload() -> serde_json::Value {
    json!({
        "title": "Algebra midterm",
        "description": "Unit test exam",
        "duration_minutes": 45,
        "questions": [
            {
                "type": "mcq",
                "question_text": "What is 2 + 2?",
                "options": ["2", "4"],
                "correct_answer": "4",
                "marks": 1
            },
            {
                "type": "written",
                "question_text": "Derive x^2.",
                "marks": 3,
                "solution": "2x"
            }
        ]
    })
}

#[tokio::test]
async fn teacher_can_create_publish_and_list_exam() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "teacher1@example.com").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(exam_payload()),
        ))
        .await
        .expect("create exam");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    let exam_id = created["id"].as_str().expect("exam id").to_string();
    assert_eq!(created["is_published"], false);
    assert_eq!(created["questions"].as_array().unwrap().len(), 2);
    assert_eq!(created["questions"][0]["question_order"], 1);
    assert_eq!(created["questions"][1]["question_order"], 2);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/{exam_id}/publish"),
            Some(&token),
            None,
        ))
        .await
        .expect("publish exam");

    let status = response.status();
    let published = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {published}");
    assert_eq!(published["is_published"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/exams", Some(&token), None))
        .await
        .expect("list exams");

    let status = response.status();
    let list = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {list}");
    let items = list["items"].as_array().expect("exam list");
    assert!(items.iter().any(|item| item["id"] == exam_id.as_str()));
    let summary = items.iter().find(|item| item["id"] == exam_id.as_str()).unwrap();
    assert_eq!(summary["question_count"], 2);
    assert_eq!(summary["total_marks"], 4);
}

#[tokio::test]
async fn mcq_validation_rejects_inconsistent_questions() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "teacher2@example.com").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    // correct_answer not among the options
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(json!({
                "title": "Broken quiz",
                "duration_minutes": 10,
                "questions": [{
                    "type": "mcq",
                    "question_text": "Pick one",
                    "options": ["a", "b"],
                    "correct_answer": "c",
                    "marks": 1
                }]
            })),
        ))
        .await
        .expect("create exam");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // a single option is not a choice
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(json!({
                "title": "Broken quiz",
                "duration_minutes": 10,
                "questions": [{
                    "type": "mcq",
                    "question_text": "Pick one",
                    "options": ["a"],
                    "correct_answer": "a",
                    "marks": 1
                }]
            })),
        ))
        .await
        .expect("create exam");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn exams_are_invisible_to_non_owners_and_unpublished_to_students() {
    let ctx = test_support::setup_test_context().await;

    let owner = test_support::insert_teacher(ctx.state.db(), "owner@example.com").await;
    let other = test_support::insert_teacher(ctx.state.db(), "other@example.com").await;
    let student = test_support::insert_student(ctx.state.db(), "student1@example.com").await;

    let exam = test_support::insert_exam(ctx.state.db(), &owner.id, "Draft exam", 30, false).await;
    test_support::insert_mcq_question(ctx.state.db(), &exam.id, 1, &["2", "4"], "4", 1).await;

    let other_token = test_support::bearer_token(&other.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

    // Another teacher cannot manage someone else's exam; absent and
    // not-owned are indistinguishable.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/exams/{}", exam.id),
            Some(&other_token),
            Some(json!({"title": "Hijacked"})),
        ))
        .await
        .expect("update as non-owner");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Students cannot see a draft exam.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams/{}", exam.id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("get draft as student");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Published exams show up in the student listing, without the key.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/{}/publish", exam.id),
            Some(&test_support::bearer_token(&owner.id, ctx.state.settings())),
            None,
        ))
        .await
        .expect("publish");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams/{}", exam.id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("get published as student");
    let status = response.status();
    let visible = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {visible}");
    assert!(visible["questions"][0]["correct_answer"].is_null());
    assert!(visible["questions"][0]["solution"].is_null());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exams/available",
            Some(&student_token),
            None,
        ))
        .await
        .expect("list available");
    let status = response.status();
    let available = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {available}");
    assert!(available["items"]
        .as_array()
        .unwrap()
        .iter()
        .any(|item| item["id"] == exam.id.as_str()));
}

#[tokio::test]
async fn import_creates_exam_and_reports_all_validation_issues() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "importer@example.com").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams/import",
            Some(&token),
            Some(json!({
                "title": "Imported quiz",
                "duration": 20,
                "questions": [
                    {
                        "type": "mcq",
                        "question": "What is 2 + 2?",
                        "options": ["2", "4"],
                        "correctAnswer": "4",
                        "marks": 1
                    },
                    {
                        "type": "written",
                        "question": "Show your work.",
                        "marks": 2
                    }
                ]
            })),
        ))
        .await
        .expect("import exam");

    let status = response.status();
    let imported = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {imported}");
    assert_eq!(imported["title"], "Imported quiz");
    assert_eq!(imported["duration_minutes"], 20);
    assert_eq!(imported["questions"].as_array().unwrap().len(), 2);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams/import",
            Some(&token),
            Some(json!({"questions": [{"type": "mcq", "marks": 0}]})),
        ))
        .await
        .expect("import invalid exam");

    let status = response.status();
    let error = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {error}");
    let detail = error["detail"].as_str().expect("detail");
    assert!(detail.contains("title is required"), "{detail}");
    assert!(detail.contains("duration is required"), "{detail}");
    assert!(detail.contains("question 1"), "{detail}");
}

#[tokio::test]
async fn students_cannot_author_exams() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), "student2@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(exam_payload()),
        ))
        .await
        .expect("create exam as student");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_refuses_when_submissions_exist_unless_forced() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "deleter@example.com").await;
    let student = test_support::insert_student(ctx.state.db(), "taker@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), &teacher.id, "Quiz", 30, true).await;
    test_support::insert_mcq_question(ctx.state.db(), &exam.id, 1, &["a", "b"], "a", 1).await;

    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/submissions/exams/{}/start", exam.id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("start exam");
    assert_eq!(response.status(), StatusCode::CREATED);

    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/exams/{}", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete exam");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/exams/{}?force=true", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("force delete exam");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
