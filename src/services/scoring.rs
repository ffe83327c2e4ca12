use std::collections::HashMap;

use crate::db::models::{AnswerDraft, Question};
use crate::db::types::QuestionType;

/// An answer record computed at submission time, before it is written to
/// the answers table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GradedAnswer {
    pub(crate) question_id: String,
    pub(crate) answer_text: Option<String>,
    pub(crate) image_key: Option<String>,
    pub(crate) marks_obtained: i32,
    pub(crate) is_correct: Option<bool>,
}

/// Grades one mcq selection by exact string equality: no partial credit,
/// no trimming, no case folding. An unanswered question stays ungraded.
pub(crate) fn grade_mcq(
    selected: Option<&str>,
    correct_answer: &str,
    marks: i32,
) -> (Option<bool>, i32) {
    match selected {
        Some(text) => {
            let is_correct = text == correct_answer;
            (Some(is_correct), if is_correct { marks } else { 0 })
        }
        None => (None, 0),
    }
}

/// Builds the full answer set for a submission from its draft. Every
/// question gets a record, answered or not. Returns the records and the
/// auto-graded total, which covers mcq marks only; written answers start
/// at zero and wait for the teacher.
pub(crate) fn grade_submission(
    questions: &[Question],
    draft: &HashMap<String, AnswerDraft>,
) -> (Vec<GradedAnswer>, i32) {
    let mut records = Vec::with_capacity(questions.len());
    let mut total = 0;

    for question in questions {
        let entry = draft.get(&question.id);
        let text = entry.and_then(|e| e.text.clone());
        let image_key = entry.and_then(|e| e.image_key.clone());

        let (is_correct, marks_obtained) = match question.question_type {
            QuestionType::Mcq => {
                let correct = question.correct_answer.as_deref().unwrap_or_default();
                grade_mcq(text.as_deref(), correct, question.marks)
            }
            QuestionType::Written => (None, 0),
        };

        total += marks_obtained;
        records.push(GradedAnswer {
            question_id: question.id.clone(),
            answer_text: text,
            image_key,
            marks_obtained,
            is_correct,
        });
    }

    (records, total)
}

/// Out-of-range grading input is clamped into `[0, max_marks]`, not
/// rejected.
pub(crate) fn clamp_written_marks(requested: i32, max_marks: i32) -> i32 {
    requested.clamp(0, max_marks)
}

/// Questions with either a recorded text or a captured image count as
/// answered, matching what the submit confirmation reports.
pub(crate) fn answered_count(
    questions: &[Question],
    draft: &HashMap<String, AnswerDraft>,
) -> usize {
    questions
        .iter()
        .filter(|question| draft.get(&question.id).is_some_and(|entry| !entry.is_empty()))
        .count()
}
