use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::{ExamCreate, ExamResponse};
use crate::services::exam_import;

use super::super::helpers;

pub(in crate::api::exams) async fn create_exam(
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(axum::http::StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    for question in &payload.questions {
        helpers::check_question_consistency(question)?;
    }

    let max_duration = state.settings().exam().max_duration_minutes as i32;
    if payload.duration_minutes > max_duration {
        return Err(ApiError::BadRequest(format!(
            "duration_minutes cannot exceed {max_duration}"
        )));
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let exam_id = Uuid::new_v4().to_string();
    let exam = repositories::exams::create(
        &mut *tx,
        repositories::exams::CreateExam {
            id: &exam_id,
            owner_id: &teacher.id,
            title: &payload.title,
            description: payload.description.as_deref(),
            duration_minutes: payload.duration_minutes,
            is_published: false,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    let mut questions = Vec::with_capacity(payload.questions.len());
    for (index, question) in payload.questions.iter().enumerate() {
        questions
            .push(helpers::insert_question(&mut *tx, &exam.id, index as i32 + 1, question).await?);
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        teacher_id = %teacher.id,
        exam_id = %exam.id,
        question_count = questions.len(),
        "Exam created"
    );

    Ok((axum::http::StatusCode::CREATED, Json(ExamResponse::from_db(exam, questions, true))))
}

/// Whole-exam JSON import. The document is schema-validated first; a
/// malformed file is rejected with every problem listed and nothing
/// written.
pub(in crate::api::exams) async fn import_exam(
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
    Json(document): Json<serde_json::Value>,
) -> Result<(axum::http::StatusCode, Json<ExamResponse>), ApiError> {
    let parsed = exam_import::parse(&document).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let max_duration = state.settings().exam().max_duration_minutes as i32;
    if parsed.duration_minutes > max_duration {
        return Err(ApiError::BadRequest(format!(
            "duration_minutes cannot exceed {max_duration}"
        )));
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let exam_id = Uuid::new_v4().to_string();
    let exam = repositories::exams::create(
        &mut *tx,
        repositories::exams::CreateExam {
            id: &exam_id,
            owner_id: &teacher.id,
            title: &parsed.title,
            description: parsed.description.as_deref(),
            duration_minutes: parsed.duration_minutes,
            is_published: false,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    let mut questions = Vec::with_capacity(parsed.questions.len());
    for (index, question) in parsed.questions.iter().enumerate() {
        let created = repositories::questions::create(
            &mut *tx,
            repositories::questions::CreateQuestion {
                id: &Uuid::new_v4().to_string(),
                exam_id: &exam.id,
                question_order: index as i32 + 1,
                question_type: question.question_type,
                question_text: &question.question_text,
                image_url: question.image_url.as_deref(),
                options: question.options.clone(),
                correct_answer: question.correct_answer.as_deref(),
                marks: question.marks,
                solution: question.solution.as_deref(),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create question"))?;
        questions.push(created);
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        teacher_id = %teacher.id,
        exam_id = %exam.id,
        question_count = questions.len(),
        "Exam imported"
    );

    Ok((axum::http::StatusCode::CREATED, Json(ExamResponse::from_db(exam, questions, true))))
}
