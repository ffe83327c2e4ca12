use axum::{
    extract::{Multipart, Path},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{fetch_owned_exam, CurrentTeacher};
use crate::api::validation::validate_image_upload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::QuestionType;
use crate::repositories;
use crate::schemas::exam::{QuestionCreate, QuestionResponse};
use crate::services::image_pipeline;
use crate::services::storage::StorageBucket;

use super::super::helpers;

pub(in crate::api::exams) async fn add_question(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(axum::http::StatusCode, Json<QuestionResponse>), ApiError> {
    let exam = fetch_owned_exam(&state, &teacher, &exam_id).await?;

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    helpers::check_question_consistency(&payload)?;

    let order = repositories::questions::next_order(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute question order"))?;

    let question = helpers::insert_question(state.db(), &exam.id, order, &payload).await?;

    Ok((axum::http::StatusCode::CREATED, Json(QuestionResponse::from_db(question, true))))
}

pub(in crate::api::exams) async fn update_question(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let exam = fetch_owned_exam(&state, &teacher, &exam_id).await?;

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    helpers::check_question_consistency(&payload)?;

    let existing = repositories::questions::find_by_exam_and_id(state.db(), &exam.id, &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?;

    let Some(existing) = existing else {
        return Err(ApiError::NotFound("Question not found".to_string()));
    };

    let is_mcq = matches!(payload.question_type, QuestionType::Mcq);
    let now = primitive_now_utc();
    repositories::questions::update(
        state.db(),
        &exam.id,
        &existing.id,
        repositories::questions::UpdateQuestion {
            question_type: payload.question_type,
            question_text: &payload.question_text,
            options: if is_mcq { Some(helpers::cleaned_options(&payload)) } else { None },
            correct_answer: if is_mcq { payload.correct_answer.as_deref() } else { None },
            marks: payload.marks,
            solution: payload.solution.as_deref(),
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update question"))?;

    let updated = repositories::questions::find_by_exam_and_id(state.db(), &exam.id, &existing.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated question"))?
        .ok_or_else(|| ApiError::Internal("Question missing after update".to_string()))?;

    Ok(Json(QuestionResponse::from_db(updated, true)))
}

pub(in crate::api::exams) async fn delete_question(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
) -> Result<axum::http::StatusCode, ApiError> {
    let exam = fetch_owned_exam(&state, &teacher, &exam_id).await?;

    let deleted =
        repositories::questions::delete_by_exam_and_id(state.db(), &exam.id, &question_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;

    if !deleted {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Attaches an illustration to a question: the upload is re-encoded under
/// the configured size budget before it is stored, and the public URL is
/// saved on the question row.
pub(in crate::api::exams) async fn upload_question_image(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: axum::extract::State<AppState>,
    multipart: Multipart,
) -> Result<Json<QuestionResponse>, ApiError> {
    let exam = fetch_owned_exam(&state, &teacher, &exam_id).await?;

    let question = repositories::questions::find_by_exam_and_id(state.db(), &exam.id, &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?;

    let Some(question) = question else {
        return Err(ApiError::NotFound("Question not found".to_string()));
    };

    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("S3 storage is not configured".to_string())
    })?;

    let upload = crate::api::uploads::read_image_field(&state, multipart).await?;
    validate_image_upload(
        &upload.filename,
        &upload.content_type,
        &state.settings().storage().allowed_image_extensions,
    )?;

    let compressed = image_pipeline::compress_to_budget(&upload.bytes, state.settings().image())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let key = format!("{}/{}_{}.jpg", exam.id, question.id, Uuid::new_v4());
    let (file_size, _hash) = storage
        .upload_bytes(StorageBucket::QuestionImages, &key, "image/jpeg", compressed.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to upload question image"))?;

    let image_url = storage.public_url(StorageBucket::QuestionImages, &key);
    let now = primitive_now_utc();
    repositories::questions::set_image_url(
        state.db(),
        &exam.id,
        &question.id,
        Some(&image_url),
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store question image URL"))?;

    metrics::counter!("uploads_total", "kind" => "question").increment(1);
    tracing::info!(
        exam_id = %exam.id,
        question_id = %question.id,
        file_size,
        quality = compressed.quality,
        "Question image uploaded"
    );

    let updated = repositories::questions::find_by_exam_and_id(state.db(), &exam.id, &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated question"))?
        .ok_or_else(|| ApiError::Internal("Question missing after update".to_string()))?;

    Ok(Json(QuestionResponse::from_db(updated, true)))
}
