use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{Exam, Question};
use crate::db::types::QuestionType;
use crate::repositories::exams::ExamSummaryRow;

#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(default)]
    #[serde(alias = "imageUrl")]
    pub(crate) image_url: Option<String>,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[validate(range(min = 1, message = "marks must be positive"))]
    pub(crate) marks: i32,
    #[serde(default)]
    pub(crate) solution: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_order: i32,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) question_text: String,
    pub(crate) image_url: Option<String>,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) marks: i32,
    pub(crate) solution: Option<String>,
}

impl QuestionResponse {
    /// `include_answer_key` decides whether `correct_answer` and `solution`
    /// survive into the payload; student-facing views strip them.
    pub(crate) fn from_db(question: Question, include_answer_key: bool) -> Self {
        Self {
            id: question.id,
            exam_id: question.exam_id,
            question_order: question.question_order,
            question_type: question.question_type,
            question_text: question.question_text,
            image_url: question.image_url,
            options: question.options.map(|options| options.0),
            correct_answer: if include_answer_key { question.correct_answer } else { None },
            marks: question.marks,
            solution: if include_answer_key { question.solution } else { None },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) owner_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) is_published: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl ExamResponse {
    pub(crate) fn from_db(
        exam: Exam,
        questions: Vec<Question>,
        include_answer_key: bool,
    ) -> Self {
        Self {
            id: exam.id,
            owner_id: exam.owner_id,
            title: exam.title,
            description: exam.description,
            duration_minutes: exam.duration_minutes,
            is_published: exam.is_published,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            questions: questions
                .into_iter()
                .map(|question| QuestionResponse::from_db(question, include_answer_key))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) is_published: bool,
    pub(crate) created_at: String,
    pub(crate) question_count: i64,
    pub(crate) submission_count: i64,
    pub(crate) total_marks: i64,
}

impl ExamSummaryResponse {
    pub(crate) fn from_row(row: ExamSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            duration_minutes: row.duration_minutes,
            is_published: row.is_published,
            created_at: format_primitive(row.created_at),
            question_count: row.question_count,
            submission_count: row.submission_count,
            total_marks: row.total_marks,
        }
    }
}
