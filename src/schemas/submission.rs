use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{AnswerDraft, Submission};
use crate::db::types::QuestionType;
use crate::repositories::answers::AnswerWithQuestionRow;
use crate::repositories::submissions::{ExamSubmissionRow, StudentResultRow};
use crate::schemas::exam::ExamResponse;
use crate::services::exam_timing::TimerSeverity;

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) total_marks: i32,
    pub(crate) is_submitted: bool,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: &Submission) -> Self {
        Self {
            id: submission.id.clone(),
            exam_id: submission.exam_id.clone(),
            student_id: submission.student_id.clone(),
            started_at: format_primitive(submission.started_at),
            submitted_at: submission.submitted_at.map(format_primitive),
            total_marks: submission.total_marks,
            is_submitted: submission.is_submitted,
        }
    }
}

/// Everything a taking client needs to render or resume an attempt: the
/// sanitized exam, the persisted draft, and the server-computed clock.
#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) submission: SubmissionResponse,
    pub(crate) exam: ExamResponse,
    pub(crate) draft: HashMap<String, AnswerDraft>,
    pub(crate) time_remaining: i64,
    pub(crate) timer_severity: TimerSeverity,
    pub(crate) answered_count: usize,
    pub(crate) question_count: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DraftAnswerPayload {
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DraftSaveRequest {
    pub(crate) answers: HashMap<String, DraftAnswerPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GradeSaveRequest {
    /// answer id → marks for that written answer.
    pub(crate) grades: HashMap<String, i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerReviewResponse {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) question_order: i32,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) question_text: String,
    pub(crate) question_image_url: Option<String>,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) marks: i32,
    pub(crate) solution: Option<String>,
    pub(crate) answer_text: Option<String>,
    pub(crate) answer_image_url: Option<String>,
    pub(crate) marks_obtained: i32,
    pub(crate) is_correct: Option<bool>,
}

impl AnswerReviewResponse {
    pub(crate) fn from_row(row: AnswerWithQuestionRow) -> Self {
        Self {
            id: row.id,
            question_id: row.question_id,
            question_order: row.question_order,
            question_type: row.question_type,
            question_text: row.question_text,
            question_image_url: row.question_image_url,
            options: row.options.map(|options| options.0),
            correct_answer: row.correct_answer,
            marks: row.question_marks,
            solution: row.solution,
            answer_text: row.answer_text,
            answer_image_url: row.answer_image_url,
            marks_obtained: row.marks_obtained,
            is_correct: row.is_correct,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentIdentityResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionReviewResponse {
    pub(crate) submission: SubmissionResponse,
    pub(crate) student: StudentIdentityResponse,
    pub(crate) exam_title: String,
    pub(crate) answers: Vec<AnswerReviewResponse>,
    pub(crate) max_marks: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSubmissionSummaryResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) student_email: String,
    pub(crate) student_name: Option<String>,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) total_marks: i32,
    pub(crate) is_submitted: bool,
}

impl ExamSubmissionSummaryResponse {
    pub(crate) fn from_row(row: ExamSubmissionRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            student_email: row.student_email,
            student_name: row.student_name,
            started_at: format_primitive(row.started_at),
            submitted_at: row.submitted_at.map(format_primitive),
            total_marks: row.total_marks,
            is_submitted: row.is_submitted,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResultSummaryResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) total_marks: i32,
}

impl StudentResultSummaryResponse {
    pub(crate) fn from_row(row: StudentResultRow) -> Self {
        Self {
            id: row.id,
            exam_id: row.exam_id,
            exam_title: row.exam_title,
            submitted_at: row.submitted_at.map(format_primitive),
            total_marks: row.total_marks,
        }
    }
}
