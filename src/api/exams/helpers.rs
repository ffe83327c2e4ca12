use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::QuestionCreate;

/// Cross-field rules the validator derive cannot express: mcq questions
/// need at least two non-empty options with the correct answer among them;
/// written questions carry neither.
pub(super) fn check_question_consistency(question: &QuestionCreate) -> Result<(), ApiError> {
    match question.question_type {
        crate::db::types::QuestionType::Mcq => {
            let options = cleaned_options(question);
            if options.len() < 2 {
                return Err(ApiError::BadRequest(
                    "mcq questions need at least two options".to_string(),
                ));
            }
            match question.correct_answer.as_deref() {
                Some(answer) if options.iter().any(|option| option == answer) => Ok(()),
                Some(_) => Err(ApiError::BadRequest(
                    "correct_answer must be one of the options".to_string(),
                )),
                None => Err(ApiError::BadRequest(
                    "correct_answer is required for mcq questions".to_string(),
                )),
            }
        }
        crate::db::types::QuestionType::Written => {
            if question.options.as_ref().is_some_and(|options| !options.is_empty()) {
                return Err(ApiError::BadRequest(
                    "options are only valid for mcq questions".to_string(),
                ));
            }
            if question.correct_answer.is_some() {
                return Err(ApiError::BadRequest(
                    "correct_answer is only valid for mcq questions".to_string(),
                ));
            }
            Ok(())
        }
    }
}

pub(super) fn cleaned_options(question: &QuestionCreate) -> Vec<String> {
    question
        .options
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter(|option| !option.trim().is_empty())
        .collect()
}

pub(super) async fn insert_question(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    question_order: i32,
    question: &QuestionCreate,
) -> Result<crate::db::models::Question, ApiError> {
    let now = primitive_now_utc();
    let is_mcq = matches!(question.question_type, crate::db::types::QuestionType::Mcq);

    repositories::questions::create(
        executor,
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            exam_id,
            question_order,
            question_type: question.question_type,
            question_text: &question.question_text,
            image_url: question.image_url.as_deref(),
            options: if is_mcq { Some(cleaned_options(question)) } else { None },
            correct_answer: if is_mcq { question.correct_answer.as_deref() } else { None },
            marks: question.marks,
            solution: question.solution.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))
}
