use axum::{extract::Query, Json};

use crate::api::errors::ApiError;
use crate::api::guards::{fetch_owned_exam, CurrentStudent, CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::exam::{ExamResponse, ExamSummaryResponse};
use crate::schemas::submission::ExamSubmissionSummaryResponse;
use crate::schemas::PaginatedResponse;

use super::super::ListQuery;

pub(in crate::api::exams) async fn list_exams(
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<ExamSummaryResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let rows = repositories::exams::list_by_owner(state.db(), &teacher.id, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let total_count = repositories::exams::count_by_owner(state.db(), &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;

    let items = rows.into_iter().map(ExamSummaryResponse::from_row).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

pub(in crate::api::exams) async fn list_available_exams(
    CurrentStudent(_student): CurrentStudent,
    state: axum::extract::State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<ExamSummaryResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let rows = repositories::exams::list_published(state.db(), skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list published exams"))?;
    let total_count = repositories::exams::count_published(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count published exams"))?;

    let items = rows.into_iter().map(ExamSummaryResponse::from_row).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

/// Owners get the full exam, answer key included. Students only ever see a
/// published exam, with the key stripped.
pub(in crate::api::exams) async fn get_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentUser(user): CurrentUser,
    state: axum::extract::State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    };

    let is_owner = matches!(user.role, UserRole::Teacher) && exam.owner_id == user.id;
    if !is_owner && !exam.is_published {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    Ok(Json(ExamResponse::from_db(exam, questions, is_owner)))
}

pub(in crate::api::exams) async fn list_exam_submissions(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    Query(params): Query<ListQuery>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
) -> Result<Json<PaginatedResponse<ExamSubmissionSummaryResponse>>, ApiError> {
    let exam = fetch_owned_exam(&state, &teacher, &exam_id).await?;

    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let rows =
        repositories::submissions::list_by_exam_with_students(state.db(), &exam.id, skip, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;
    let total_count = repositories::exams::count_submissions(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;

    let items = rows.into_iter().map(ExamSubmissionSummaryResponse::from_row).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}
