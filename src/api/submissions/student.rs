use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{fetch_own_submission, fetch_published_exam, CurrentStudent};
use crate::api::validation::validate_image_upload;
use crate::core::state::AppState;
use crate::db::models::AnswerDraft;
use crate::db::types::QuestionType;
use crate::repositories;
use crate::schemas::submission::{
    DraftSaveRequest, SessionResponse, StudentResultSummaryResponse, SubmissionResponse,
};
use crate::schemas::PaginatedResponse;
use crate::services::exam_timing;
use crate::services::image_pipeline;
use crate::services::storage::StorageBucket;
use crate::services::submission_finalize::{self, FinalizeMode};

use super::helpers;
use super::ListQuery;

/// Entering an exam creates the attempt row; re-entering resumes it. A
/// finished attempt cannot be re-opened.
pub(super) async fn start_exam(
    Path(exam_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let exam = fetch_published_exam(&state, &exam_id).await?;

    let existing =
        repositories::submissions::find_by_exam_and_student(state.db(), &exam.id, &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?;

    if let Some(submission) = existing {
        if submission.is_submitted {
            return Err(ApiError::Conflict("Exam has already been submitted".to_string()));
        }
        let submission = helpers::enforce_deadline(&state, submission, &exam).await?;
        if submission.is_submitted {
            return Err(ApiError::Conflict("Exam time has elapsed".to_string()));
        }
        let session = helpers::session_response(&state, &submission, exam).await?;
        return Ok((StatusCode::OK, Json(session)));
    }

    let now = helpers::now_primitive();
    let submission_id = Uuid::new_v4().to_string();
    repositories::submissions::create_if_absent(
        state.db(),
        &submission_id,
        &exam.id,
        &student.id,
        now,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create submission"))?;

    let submission =
        repositories::submissions::find_by_exam_and_student(state.db(), &exam.id, &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
            .ok_or_else(|| ApiError::Internal("Submission missing after creation".to_string()))?;

    tracing::info!(
        exam_id = %exam.id,
        student_id = %student.id,
        submission_id = %submission.id,
        "Exam attempt started"
    );

    let session = helpers::session_response(&state, &submission, exam).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Rebuilds the taking view from persisted state: draft answers and the
/// remaining time recomputed from the fixed start timestamp, so a reload
/// resumes exactly where the attempt stood.
pub(super) async fn get_session(
    Path(submission_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let submission = fetch_own_submission(&state, &student, &submission_id).await?;
    let exam = helpers::fetch_exam(state.db(), &submission.exam_id).await?;

    let submission = helpers::enforce_deadline(&state, submission, &exam).await?;
    if submission.is_submitted {
        return Err(ApiError::Conflict(
            "Exam has already been submitted; fetch the result instead".to_string(),
        ));
    }

    let session = helpers::session_response(&state, &submission, exam).await?;
    Ok(Json(session))
}

/// Write-through draft save. Text answers in the payload are merged over
/// the stored mapping; captured image keys are owned by the upload endpoint
/// and survive untouched. The draft lives until successful submission.
pub(super) async fn save_draft(
    Path(submission_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<DraftSaveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let submission = fetch_own_submission(&state, &student, &submission_id).await?;
    let exam = helpers::fetch_exam(state.db(), &submission.exam_id).await?;

    let submission = helpers::enforce_deadline(&state, submission, &exam).await?;
    if submission.is_submitted {
        return Err(ApiError::Conflict("Exam has already been submitted".to_string()));
    }

    let interval = state.settings().exam().draft_save_interval_seconds.max(1);
    let rate_key = format!("draftsave:{submission_id}");
    let allowed = match state.redis().rate_limit(&rate_key, 1, interval).await {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = %err, "Failed to check draft-save rate limit");
            false
        }
    };
    if !allowed {
        return Err(ApiError::TooManyRequests("Draft save rate limit exceeded"));
    }

    let mut draft: HashMap<String, AnswerDraft> = submission.answer_draft.0.clone();
    for (question_id, answer) in payload.answers {
        let text = answer.text.filter(|text| !text.is_empty());
        draft.entry(question_id).or_default().text = text;
    }
    draft.retain(|_, entry| !entry.is_empty());

    let now = helpers::now_primitive();
    let updated = repositories::submissions::update_draft(state.db(), &submission.id, &draft, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save draft"))?;

    if !updated {
        return Err(ApiError::Conflict("Exam has already been submitted".to_string()));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "last_saved_at": crate::schemas::submission::format_primitive(now),
    })))
}

/// Camera capture for a written question. The upload is re-encoded under
/// the size budget, stored under `{submission_id}/{question_id}.jpg` (a
/// retake overwrites the same object), and the key is recorded in the
/// draft.
pub(super) async fn upload_answer_image(
    Path((submission_id, question_id)): Path<(String, String)>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let submission = fetch_own_submission(&state, &student, &submission_id).await?;
    let exam = helpers::fetch_exam(state.db(), &submission.exam_id).await?;

    let submission = helpers::enforce_deadline(&state, submission, &exam).await?;
    if submission.is_submitted {
        return Err(ApiError::Conflict("Exam has already been submitted".to_string()));
    }

    let question = repositories::questions::find_by_exam_and_id(state.db(), &exam.id, &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?;

    let Some(question) = question else {
        return Err(ApiError::NotFound("Question not found".to_string()));
    };

    if question.question_type != QuestionType::Written {
        return Err(ApiError::BadRequest(
            "Answer images are only accepted for written questions".to_string(),
        ));
    }

    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("S3 storage is not configured".to_string())
    })?;

    let upload = crate::api::uploads::read_image_field(&state, multipart).await?;
    validate_image_upload(
        &upload.filename,
        &upload.content_type,
        &state.settings().storage().allowed_image_extensions,
    )?;

    // Decode failure is a hard error; the original capture stays on the
    // client and can be retried.
    let compressed = image_pipeline::compress_to_budget(&upload.bytes, state.settings().image())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let key = format!("{}/{}.jpg", submission.id, question.id);
    let (file_size, _hash) = storage
        .upload_bytes(StorageBucket::AnswerImages, &key, "image/jpeg", compressed.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to upload answer image"))?;

    let mut draft: HashMap<String, AnswerDraft> = submission.answer_draft.0.clone();
    draft.entry(question.id.clone()).or_default().image_key = Some(key.clone());

    let now = helpers::now_primitive();
    let updated = repositories::submissions::update_draft(state.db(), &submission.id, &draft, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record captured image"))?;

    if !updated {
        return Err(ApiError::Conflict("Exam has already been submitted".to_string()));
    }

    metrics::counter!("uploads_total", "kind" => "answer").increment(1);
    tracing::info!(
        submission_id = %submission.id,
        question_id = %question.id,
        file_size,
        quality = compressed.quality,
        "Answer image captured"
    );

    Ok(Json(serde_json::json!({
        "image_key": key,
        "file_size": file_size,
        "width": compressed.width,
        "height": compressed.height,
    })))
}

/// Manual submit. Expiry routes through the same finalize path, and a
/// duplicate call (timer and button racing) settles on the already-final
/// row instead of erroring.
pub(super) async fn submit_exam(
    Path(submission_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let submission = fetch_own_submission(&state, &student, &submission_id).await?;

    if submission.is_submitted {
        return Ok(Json(SubmissionResponse::from_db(&submission)));
    }

    let exam = helpers::fetch_exam(state.db(), &submission.exam_id).await?;
    let now = helpers::now_primitive();
    let mode = if exam_timing::is_elapsed(submission.started_at, exam.duration_minutes, now) {
        FinalizeMode::DeadlineExpired
    } else {
        FinalizeMode::ManualSubmit
    };

    let outcome = submission_finalize::finalize_submission(&state, &submission, mode)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to submit exam"))?;

    Ok(Json(SubmissionResponse::from_db(&outcome.submission)))
}

/// The student's graded view, answer key included, available once the
/// attempt is submitted.
pub(super) async fn get_result(
    Path(submission_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let submission = fetch_own_submission(&state, &student, &submission_id).await?;
    let exam = helpers::fetch_exam(state.db(), &submission.exam_id).await?;

    let submission = helpers::enforce_deadline(&state, submission, &exam).await?;
    if !submission.is_submitted {
        return Err(ApiError::BadRequest("Exam has not been submitted yet".to_string()));
    }

    let answers = repositories::answers::list_with_questions(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch answers"))?;
    let max_marks = repositories::exams::max_marks_for_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch max marks"))?;

    let answers: Vec<_> = answers
        .into_iter()
        .map(crate::schemas::submission::AnswerReviewResponse::from_row)
        .collect();

    Ok(Json(serde_json::json!({
        "submission": SubmissionResponse::from_db(&submission),
        "exam_title": exam.title,
        "answers": answers,
        "max_marks": max_marks,
    })))
}

pub(super) async fn my_results(
    Query(params): Query<ListQuery>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<StudentResultSummaryResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let rows =
        repositories::submissions::list_submitted_by_student(state.db(), &student.id, skip, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list results"))?;
    let total_count =
        repositories::submissions::count_submitted_by_student(state.db(), &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count results"))?;

    let items = rows.into_iter().map(StudentResultSummaryResponse::from_row).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}
