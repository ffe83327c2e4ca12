pub(crate) mod helpers;
mod student;
mod teacher;

use axum::{
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use crate::core::state::AppState;
use crate::schemas::default_limit;

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        // Student endpoints
        .route("/my-results", get(student::my_results))
        .route("/exams/:exam_id/start", post(student::start_exam))
        .route("/:submission_id/session", get(student::get_session))
        .route("/:submission_id/draft", put(student::save_draft))
        .route("/:submission_id/answer-image/:question_id", post(student::upload_answer_image))
        .route("/:submission_id/submit", post(student::submit_exam))
        .route("/:submission_id/result", get(student::get_result))
        // Teacher endpoints
        .route("/:submission_id/review", get(teacher::review_submission))
        .route("/:submission_id/grades", put(teacher::save_grades))
}

#[cfg(test)]
mod tests;
