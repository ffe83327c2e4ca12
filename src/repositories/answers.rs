use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Answer;
use crate::db::types::QuestionType;

pub(crate) const COLUMNS: &str = "\
    id, submission_id, question_id, answer_text, answer_image_url, marks_obtained, \
    is_correct, created_at, updated_at";

/// An answer joined with the question it belongs to, as the review and
/// result views need it.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AnswerWithQuestionRow {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) question_id: String,
    pub(crate) answer_text: Option<String>,
    pub(crate) answer_image_url: Option<String>,
    pub(crate) marks_obtained: i32,
    pub(crate) is_correct: Option<bool>,
    pub(crate) question_order: i32,
    pub(crate) question_type: QuestionType,
    pub(crate) question_text: String,
    pub(crate) question_image_url: Option<String>,
    pub(crate) options: Option<Json<Vec<String>>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) question_marks: i32,
    pub(crate) solution: Option<String>,
}

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) submission_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) answer_text: Option<&'a str>,
    pub(crate) answer_image_url: Option<&'a str>,
    pub(crate) marks_obtained: i32,
    pub(crate) is_correct: Option<bool>,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn upsert(
    pool: &PgPool,
    params: UpsertAnswer<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO answers (
            id, submission_id, question_id, answer_text, answer_image_url,
            marks_obtained, is_correct, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
        ON CONFLICT (submission_id, question_id) DO UPDATE SET
            answer_text = EXCLUDED.answer_text,
            answer_image_url = EXCLUDED.answer_image_url,
            marks_obtained = EXCLUDED.marks_obtained,
            is_correct = EXCLUDED.is_correct,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.question_id)
    .bind(params.answer_text)
    .bind(params.answer_image_url)
    .bind(params.marks_obtained)
    .bind(params.is_correct)
    .bind(params.now)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn list_by_submission(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers WHERE submission_id = $1"
    ))
    .bind(submission_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_with_questions(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Vec<AnswerWithQuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, AnswerWithQuestionRow>(
        "SELECT a.id,
                a.submission_id,
                a.question_id,
                a.answer_text,
                a.answer_image_url,
                a.marks_obtained,
                a.is_correct,
                q.question_order,
                q.question_type,
                q.question_text,
                q.image_url AS question_image_url,
                q.options,
                q.correct_answer,
                q.marks AS question_marks,
                q.solution
         FROM answers a
         JOIN questions q ON q.id = a.question_id
         WHERE a.submission_id = $1
         ORDER BY q.question_order",
    )
    .bind(submission_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_with_question(
    pool: &PgPool,
    submission_id: &str,
    answer_id: &str,
) -> Result<Option<AnswerWithQuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, AnswerWithQuestionRow>(
        "SELECT a.id,
                a.submission_id,
                a.question_id,
                a.answer_text,
                a.answer_image_url,
                a.marks_obtained,
                a.is_correct,
                q.question_order,
                q.question_type,
                q.question_text,
                q.image_url AS question_image_url,
                q.options,
                q.correct_answer,
                q.marks AS question_marks,
                q.solution
         FROM answers a
         JOIN questions q ON q.id = a.question_id
         WHERE a.submission_id = $1 AND a.id = $2",
    )
    .bind(submission_id)
    .bind(answer_id)
    .fetch_optional(pool)
    .await
}

/// Grading touches marks only; answer content stays append-only after
/// submission.
pub(crate) async fn update_marks(
    pool: &PgPool,
    id: &str,
    marks_obtained: i32,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE answers SET marks_obtained = $1, updated_at = $2 WHERE id = $3")
        .bind(marks_obtained)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn sum_marks_for_submission(
    pool: &PgPool,
    submission_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(marks_obtained), 0) FROM answers WHERE submission_id = $1",
    )
    .bind(submission_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn count_by_submission(
    pool: &PgPool,
    submission_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM answers WHERE submission_id = $1")
        .bind(submission_id)
        .fetch_one(pool)
        .await
}
