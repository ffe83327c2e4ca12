use axum::{extract::Query, Json};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{fetch_owned_exam, CurrentTeacher};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::{ExamResponse, ExamUpdate};

use super::super::DeleteExamQuery;

pub(in crate::api::exams) async fn update_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = fetch_owned_exam(&state, &teacher, &exam_id).await?;

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if let Some(duration) = payload.duration_minutes {
        let max_duration = state.settings().exam().max_duration_minutes as i32;
        if duration > max_duration {
            return Err(ApiError::BadRequest(format!(
                "duration_minutes cannot exceed {max_duration}"
            )));
        }
    }

    let now = primitive_now_utc();
    repositories::exams::update(
        state.db(),
        &exam.id,
        repositories::exams::UpdateExam {
            title: payload.title,
            description: payload.description,
            duration_minutes: payload.duration_minutes,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam"))?;

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;
    let questions = repositories::questions::list_by_exam(state.db(), &updated.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    Ok(Json(ExamResponse::from_db(updated, questions, true)))
}

pub(in crate::api::exams) async fn delete_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    Query(params): Query<DeleteExamQuery>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
) -> Result<axum::http::StatusCode, ApiError> {
    let exam = fetch_owned_exam(&state, &teacher, &exam_id).await?;

    let submission_count = repositories::exams::count_submissions(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;

    if submission_count > 0 && !params.force {
        return Err(ApiError::BadRequest(format!(
            "Cannot delete exam with {submission_count} existing submission(s). Use force=true to delete anyway."
        )));
    }

    repositories::exams::delete_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    tracing::info!(teacher_id = %teacher.id, exam_id = %exam.id, "Exam deleted");

    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub(in crate::api::exams) async fn publish_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = fetch_owned_exam(&state, &teacher, &exam_id).await?;

    if exam.is_published {
        return Err(ApiError::BadRequest("Exam is already published".to_string()));
    }

    let question_count = repositories::exams::count_questions(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    if question_count == 0 {
        return Err(ApiError::BadRequest("Exam must have at least one question".to_string()));
    }

    let now = primitive_now_utc();
    repositories::exams::set_published(state.db(), &exam.id, true, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to publish exam"))?;

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;
    let questions = repositories::questions::list_by_exam(state.db(), &updated.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    tracing::info!(teacher_id = %teacher.id, exam_id = %updated.id, "Exam published");

    Ok(Json(ExamResponse::from_db(updated, questions, true)))
}

pub(in crate::api::exams) async fn unpublish_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = fetch_owned_exam(&state, &teacher, &exam_id).await?;

    if !exam.is_published {
        return Err(ApiError::BadRequest("Exam is not published".to_string()));
    }

    let now = primitive_now_utc();
    repositories::exams::set_published(state.db(), &exam.id, false, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to unpublish exam"))?;

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;
    let questions = repositories::questions::list_by_exam(state.db(), &updated.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    tracing::info!(teacher_id = %teacher.id, exam_id = %updated.id, "Exam unpublished");

    Ok(Json(ExamResponse::from_db(updated, questions, true)))
}
