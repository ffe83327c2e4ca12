use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::db::types::QuestionType;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, question_order, question_type, question_text, image_url, \
    options, correct_answer, marks, solution, created_at, updated_at";

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY question_order"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_exam_and_id(
    pool: &PgPool,
    exam_id: &str,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 AND id = $2"
    ))
    .bind(exam_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn next_order(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(question_order), 0) + 1 FROM questions WHERE exam_id = $1",
    )
    .bind(exam_id)
    .fetch_one(executor)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) question_order: i32,
    pub(crate) question_type: QuestionType,
    pub(crate) question_text: &'a str,
    pub(crate) image_url: Option<&'a str>,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_answer: Option<&'a str>,
    pub(crate) marks: i32,
    pub(crate) solution: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, exam_id, question_order, question_type, question_text, image_url,
            options, correct_answer, marks, solution, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.question_order)
    .bind(params.question_type)
    .bind(params.question_text)
    .bind(params.image_url)
    .bind(params.options.map(Json))
    .bind(params.correct_answer)
    .bind(params.marks)
    .bind(params.solution)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateQuestion<'a> {
    pub(crate) question_type: QuestionType,
    pub(crate) question_text: &'a str,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_answer: Option<&'a str>,
    pub(crate) marks: i32,
    pub(crate) solution: Option<&'a str>,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Full replace of the editable fields. Options and correct answer are
/// written as given, so switching a question to written clears them.
pub(crate) async fn update(
    pool: &PgPool,
    exam_id: &str,
    id: &str,
    params: UpdateQuestion<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE questions SET
            question_type = $1,
            question_text = $2,
            options = $3,
            correct_answer = $4,
            marks = $5,
            solution = $6,
            updated_at = $7
         WHERE exam_id = $8 AND id = $9",
    )
    .bind(params.question_type)
    .bind(params.question_text)
    .bind(params.options.map(Json))
    .bind(params.correct_answer)
    .bind(params.marks)
    .bind(params.solution)
    .bind(params.updated_at)
    .bind(exam_id)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn set_image_url(
    pool: &PgPool,
    exam_id: &str,
    id: &str,
    image_url: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE questions SET image_url = $1, updated_at = $2 WHERE exam_id = $3 AND id = $4",
    )
    .bind(image_url)
    .bind(now)
    .bind(exam_id)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete_by_exam_and_id(
    pool: &PgPool,
    exam_id: &str,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE exam_id = $1 AND id = $2")
        .bind(exam_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
