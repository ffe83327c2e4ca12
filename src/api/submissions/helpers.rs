use crate::api::errors::ApiError;
pub(crate) use crate::core::time::primitive_now_utc as now_primitive;
use crate::core::state::AppState;
use crate::db::models::{Exam, Submission};
use crate::repositories;
use crate::schemas::exam::ExamResponse;
use crate::schemas::submission::{SessionResponse, SubmissionResponse};
use crate::services::exam_timing::{self, TimerSeverity};
use crate::services::scoring;
use crate::services::submission_finalize::{self, FinalizeMode};

pub(super) async fn fetch_exam(pool: &sqlx::PgPool, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(pool, exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

/// The server-side arm of the countdown: if the attempt's time has fully
/// elapsed and it is still in progress, it is finalized right here with
/// whatever the draft holds. A stale session completes immediately on its
/// next touch, and exactly once.
pub(super) async fn enforce_deadline(
    state: &AppState,
    submission: Submission,
    exam: &Exam,
) -> Result<Submission, ApiError> {
    if submission.is_submitted {
        return Ok(submission);
    }

    let now = now_primitive();
    if exam_timing::is_elapsed(submission.started_at, exam.duration_minutes, now) {
        let outcome =
            submission_finalize::finalize_submission(state, &submission, FinalizeMode::DeadlineExpired)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to finalize expired submission"))?;
        return Ok(outcome.submission);
    }

    Ok(submission)
}

pub(super) async fn session_response(
    state: &AppState,
    submission: &Submission,
    exam: Exam,
) -> Result<SessionResponse, ApiError> {
    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    let now = now_primitive();
    let time_remaining =
        exam_timing::remaining_seconds(submission.started_at, exam.duration_minutes, now);
    let draft = submission.answer_draft.0.clone();
    let answered = scoring::answered_count(&questions, &draft);
    let question_count = questions.len();

    Ok(SessionResponse {
        submission: SubmissionResponse::from_db(submission),
        // Answer keys never reach a taking client.
        exam: ExamResponse::from_db(exam, questions, false),
        draft,
        time_remaining,
        timer_severity: TimerSeverity::for_remaining(time_remaining),
        answered_count: answered,
        question_count,
    })
}
