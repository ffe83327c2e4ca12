use anyhow::{anyhow, Context, Result};
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Submission;
use crate::repositories;
use crate::services::scoring;
use crate::services::storage::StorageBucket;

#[derive(Debug, Clone, Copy)]
pub(crate) enum FinalizeMode {
    ManualSubmit,
    DeadlineExpired,
}

impl FinalizeMode {
    fn label(self) -> &'static str {
        match self {
            Self::ManualSubmit => "manual",
            Self::DeadlineExpired => "deadline",
        }
    }
}

#[derive(Debug)]
pub(crate) struct FinalizeOutcome {
    pub(crate) submission: Submission,
    pub(crate) newly_submitted: bool,
}

/// The single submit path shared by the manual action and deadline expiry.
///
/// Ordering is the contract here: every answer row is upserted before the
/// submitted flag flips, so no reader ever sees `is_submitted = true` with
/// a partial answer set, and any failure before the flip leaves the attempt
/// in progress with its draft intact. The flip itself is guarded by
/// `is_submitted = FALSE`, which collapses a timer/manual double-fire into
/// one winner; the loser's identical upserts are harmless and it reports
/// the already-final row.
pub(crate) async fn finalize_submission(
    state: &AppState,
    submission: &Submission,
    mode: FinalizeMode,
) -> Result<FinalizeOutcome> {
    // Refresh before doing any work; a grading pass may already own this row.
    let current = repositories::submissions::fetch_one_by_id(state.db(), &submission.id)
        .await
        .context("Failed to refresh submission")?;
    if current.is_submitted {
        return Ok(FinalizeOutcome { submission: current, newly_submitted: false });
    }

    let questions = repositories::questions::list_by_exam(state.db(), &current.exam_id)
        .await
        .context("Failed to fetch exam questions")?;

    let (records, mcq_total) = scoring::grade_submission(&questions, &current.answer_draft.0);

    let now = primitive_now_utc();
    for record in records {
        let answer_image_url = match &record.image_key {
            Some(key) => {
                let storage =
                    state.storage().ok_or_else(|| anyhow!("object storage is not configured"))?;
                Some(storage.public_url(StorageBucket::AnswerImages, key))
            }
            None => None,
        };

        repositories::answers::upsert(
            state.db(),
            repositories::answers::UpsertAnswer {
                id: &Uuid::new_v4().to_string(),
                submission_id: &current.id,
                question_id: &record.question_id,
                answer_text: record.answer_text.as_deref(),
                answer_image_url: answer_image_url.as_deref(),
                marks_obtained: record.marks_obtained,
                is_correct: record.is_correct,
                now,
            },
        )
        .await
        .context("Failed to upsert answer")?;
    }

    let newly_submitted =
        repositories::submissions::finalize(state.db(), &current.id, mcq_total, now)
            .await
            .context("Failed to mark submission as submitted")?;

    if newly_submitted {
        repositories::submissions::clear_draft(state.db(), &current.id, now)
            .await
            .context("Failed to clear answer draft")?;

        metrics::counter!("submissions_total", "mode" => mode.label()).increment(1);
        tracing::info!(
            submission_id = %current.id,
            exam_id = %current.exam_id,
            student_id = %current.student_id,
            mode = mode.label(),
            total_marks = mcq_total,
            "Submission finalized"
        );
    }

    let refreshed = repositories::submissions::fetch_one_by_id(state.db(), &current.id)
        .await
        .context("Failed to fetch finalized submission")?;

    Ok(FinalizeOutcome { submission: refreshed, newly_submitted })
}
