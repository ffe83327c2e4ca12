use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{fetch_submission_for_grading, CurrentTeacher};
use crate::core::state::AppState;
use crate::db::types::QuestionType;
use crate::repositories;
use crate::schemas::submission::{
    AnswerReviewResponse, GradeSaveRequest, StudentIdentityResponse, SubmissionResponse,
    SubmissionReviewResponse,
};
use crate::services::scoring;

use super::helpers;

/// A submission's answers joined with their questions, for manual review.
pub(super) async fn review_submission(
    Path(submission_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<SubmissionReviewResponse>, ApiError> {
    let (submission, exam) =
        fetch_submission_for_grading(&state, &teacher, &submission_id).await?;

    if !submission.is_submitted {
        return Err(ApiError::BadRequest(
            "Submission is still in progress and cannot be reviewed".to_string(),
        ));
    }

    let student = repositories::users::find_by_id(state.db(), &submission.student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::Internal("Student missing for submission".to_string()))?;

    let answers = repositories::answers::list_with_questions(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch answers"))?;
    let max_marks = repositories::exams::max_marks_for_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch max marks"))?;

    Ok(Json(SubmissionReviewResponse {
        submission: SubmissionResponse::from_db(&submission),
        student: StudentIdentityResponse {
            id: student.id,
            email: student.email,
            full_name: student.full_name,
        },
        exam_title: exam.title,
        answers: answers.into_iter().map(AnswerReviewResponse::from_row).collect(),
        max_marks,
    }))
}

/// Persists manual marks for written answers, clamped into
/// `[0, question.marks]`, then recomputes the submission total as the sum
/// over every answer. mcq marks keep their auto-graded values.
pub(super) async fn save_grades(
    Path(submission_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<GradeSaveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (submission, _exam) =
        fetch_submission_for_grading(&state, &teacher, &submission_id).await?;

    if !submission.is_submitted {
        return Err(ApiError::BadRequest(
            "Submission is still in progress and cannot be graded".to_string(),
        ));
    }

    let now = helpers::now_primitive();
    for (answer_id, requested_marks) in &payload.grades {
        let answer =
            repositories::answers::find_with_question(state.db(), &submission.id, answer_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch answer"))?;

        let Some(answer) = answer else {
            return Err(ApiError::NotFound(format!("Answer {answer_id} not found")));
        };

        if answer.question_type != QuestionType::Written {
            return Err(ApiError::BadRequest(
                "mcq answers are graded automatically and cannot be overridden".to_string(),
            ));
        }

        let marks = scoring::clamp_written_marks(*requested_marks, answer.question_marks);
        repositories::answers::update_marks(state.db(), &answer.id, marks, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update answer marks"))?;
    }

    // One recompute write after the per-answer writes; the invariant
    // total_marks = Σ marks_obtained holds as of this statement.
    let total = repositories::answers::sum_marks_for_submission(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to sum answer marks"))?;
    repositories::submissions::update_total_marks(state.db(), &submission.id, total as i32, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update submission total"))?;

    metrics::counter!("grading_saves_total").increment(1);
    tracing::info!(
        teacher_id = %teacher.id,
        submission_id = %submission.id,
        graded_answers = payload.grades.len(),
        total_marks = total,
        "Grades saved"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "total_marks": total,
    })))
}
