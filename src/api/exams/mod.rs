mod handlers;
mod helpers;

use axum::{
    routing::{get, patch, post},
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

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteExamQuery {
    #[serde(default)]
    pub(crate) force: bool,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_exam).get(handlers::list_exams))
        .route("/import", post(handlers::import_exam))
        .route("/available", get(handlers::list_available_exams))
        .route(
            "/:exam_id",
            get(handlers::get_exam).patch(handlers::update_exam).delete(handlers::delete_exam),
        )
        .route("/:exam_id/publish", post(handlers::publish_exam))
        .route("/:exam_id/unpublish", post(handlers::unpublish_exam))
        .route("/:exam_id/questions", post(handlers::add_question))
        .route(
            "/:exam_id/questions/:question_id",
            patch(handlers::update_question).delete(handlers::delete_question),
        )
        .route("/:exam_id/questions/:question_id/image", post(handlers::upload_question_image))
        .route("/:exam_id/submissions", get(handlers::list_exam_submissions))
}

#[cfg(test)]
mod tests;
