use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{AnswerDraft, Submission};

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, started_at, submitted_at, total_marks, is_submitted, \
    answer_draft, last_saved_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamSubmissionRow {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) student_email: String,
    pub(crate) student_name: Option<String>,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) total_marks: i32,
    pub(crate) is_submitted: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentResultRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) total_marks: i32,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn find_by_exam_and_student(
    pool: &PgPool,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE exam_id = $1 AND student_id = $2"
    ))
    .bind(exam_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

/// The one-attempt-per-(exam, student) invariant lives in the unique
/// constraint; a concurrent start simply loses the insert and reads the
/// existing row back.
pub(crate) async fn create_if_absent(
    pool: &PgPool,
    id: &str,
    exam_id: &str,
    student_id: &str,
    started_at: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO submissions (
            id, exam_id, student_id, started_at, total_marks, is_submitted,
            answer_draft, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,0,FALSE,'{}'::jsonb,$5,$6)
        ON CONFLICT (exam_id, student_id) DO NOTHING",
    )
    .bind(id)
    .bind(exam_id)
    .bind(student_id)
    .bind(started_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_draft(
    pool: &PgPool,
    id: &str,
    draft: &HashMap<String, AnswerDraft>,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE submissions SET answer_draft = $1, last_saved_at = $2, updated_at = $2
         WHERE id = $3 AND is_submitted = FALSE",
    )
    .bind(Json(draft))
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Flips the one-way submitted flag. The `is_submitted = FALSE` guard makes
/// this the single winner of a timer/manual submit race.
pub(crate) async fn finalize(
    pool: &PgPool,
    id: &str,
    total_marks: i32,
    submitted_at: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE submissions
         SET is_submitted = TRUE, submitted_at = $1, total_marks = $2, updated_at = $1
         WHERE id = $3 AND is_submitted = FALSE",
    )
    .bind(submitted_at)
    .bind(total_marks)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn clear_draft(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions SET answer_draft = '{}'::jsonb, updated_at = $1 WHERE id = $2",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn update_total_marks(
    pool: &PgPool,
    id: &str,
    total_marks: i32,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE submissions SET total_marks = $1, updated_at = $2 WHERE id = $3")
        .bind(total_marks)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn list_by_exam_with_students(
    pool: &PgPool,
    exam_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamSubmissionRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamSubmissionRow>(
        "SELECT s.id,
                s.student_id,
                u.email AS student_email,
                u.full_name AS student_name,
                s.started_at,
                s.submitted_at,
                s.total_marks,
                s.is_submitted
         FROM submissions s
         JOIN users u ON u.id = s.student_id
         WHERE s.exam_id = $1
         ORDER BY s.submitted_at DESC NULLS LAST, s.started_at DESC
         OFFSET $2 LIMIT $3",
    )
    .bind(exam_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_submitted_by_student(
    pool: &PgPool,
    student_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<StudentResultRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentResultRow>(
        "SELECT s.id,
                s.exam_id,
                e.title AS exam_title,
                s.submitted_at,
                s.total_marks
         FROM submissions s
         JOIN exams e ON e.id = s.exam_id
         WHERE s.student_id = $1 AND s.is_submitted
         ORDER BY s.submitted_at DESC
         OFFSET $2 LIMIT $3",
    )
    .bind(student_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_submitted_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE student_id = $1 AND is_submitted")
        .bind(student_id)
        .fetch_one(pool)
        .await
}
