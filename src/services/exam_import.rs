use serde::Deserialize;
use thiserror::Error;

use crate::db::types::QuestionType;

/// A whole-exam JSON document as teachers export it from other tools.
/// Every field is optional at the serde layer so validation can report the
/// complete list of problems instead of failing on the first one.
#[derive(Debug, Deserialize)]
pub(crate) struct ExamImport {
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(alias = "durationMinutes", alias = "duration_minutes")]
    duration: Option<i32>,
    questions: Option<Vec<QuestionImport>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionImport {
    #[serde(rename = "type")]
    question_type: Option<String>,
    question: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default, alias = "correctAnswer", alias = "correct_answer")]
    correct_answer: Option<String>,
    marks: Option<i32>,
    #[serde(default)]
    solution: Option<String>,
}

#[derive(Debug, Error)]
#[error("invalid exam import: {}", issues.join("; "))]
pub(crate) struct ImportError {
    pub(crate) issues: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct ValidatedImport {
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: Vec<ValidatedQuestion>,
}

#[derive(Debug)]
pub(crate) struct ValidatedQuestion {
    pub(crate) question_type: QuestionType,
    pub(crate) question_text: String,
    pub(crate) image_url: Option<String>,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) marks: i32,
    pub(crate) solution: Option<String>,
}

/// Schema-validated deserialization of an exam document. Rejects malformed
/// or incomplete structures with one structured error listing every missing
/// or invalid field; nothing is written on failure.
pub(crate) fn parse(value: &serde_json::Value) -> Result<ValidatedImport, ImportError> {
    let import: ExamImport = serde_json::from_value(value.clone())
        .map_err(|err| ImportError { issues: vec![format!("document is not well-formed: {err}")] })?;

    let mut issues = Vec::new();

    let title = match import.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => Some(title.to_string()),
        _ => {
            issues.push("title is required".to_string());
            None
        }
    };

    let duration_minutes = match import.duration {
        Some(minutes) if minutes >= 1 => Some(minutes),
        Some(other) => {
            issues.push(format!("duration must be a positive number of minutes, got {other}"));
            None
        }
        None => {
            issues.push("duration is required".to_string());
            None
        }
    };

    let questions = match &import.questions {
        Some(questions) if !questions.is_empty() => Some(questions),
        Some(_) => {
            issues.push("questions must not be empty".to_string());
            None
        }
        None => {
            issues.push("questions are required".to_string());
            None
        }
    };

    let mut validated_questions = Vec::new();
    if let Some(questions) = questions {
        for (index, question) in questions.iter().enumerate() {
            if let Some(valid) = validate_question(index, question, &mut issues) {
                validated_questions.push(valid);
            }
        }
    }

    match (title, duration_minutes) {
        (Some(title), Some(duration_minutes)) if issues.is_empty() => Ok(ValidatedImport {
            title,
            description: import
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            duration_minutes,
            questions: validated_questions,
        }),
        _ => Err(ImportError { issues }),
    }
}

fn validate_question(
    index: usize,
    question: &QuestionImport,
    issues: &mut Vec<String>,
) -> Option<ValidatedQuestion> {
    let position = index + 1;
    let before = issues.len();

    let question_type = match question.question_type.as_deref() {
        Some("mcq") => Some(QuestionType::Mcq),
        Some("written") => Some(QuestionType::Written),
        Some(other) => {
            issues.push(format!("question {position}: unknown type '{other}'"));
            None
        }
        None => {
            issues.push(format!("question {position}: type is required"));
            None
        }
    };

    let question_text = match question.question.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        _ => {
            issues.push(format!("question {position}: question text is required"));
            None
        }
    };

    let marks = match question.marks {
        Some(marks) if marks >= 1 => Some(marks),
        Some(other) => {
            issues.push(format!("question {position}: marks must be positive, got {other}"));
            None
        }
        None => {
            issues.push(format!("question {position}: marks are required"));
            None
        }
    };

    let mut options = None;
    let mut correct_answer = None;
    match question_type {
        Some(QuestionType::Mcq) => {
            let cleaned: Vec<String> = question
                .options
                .clone()
                .unwrap_or_default()
                .into_iter()
                .filter(|option| !option.trim().is_empty())
                .collect();

            if cleaned.len() < 2 {
                issues.push(format!(
                    "question {position}: mcq questions need at least two options"
                ));
            }

            match question.correct_answer.as_deref() {
                Some(answer) if cleaned.iter().any(|option| option == answer) => {
                    correct_answer = Some(answer.to_string());
                }
                Some(answer) => {
                    issues.push(format!(
                        "question {position}: correct answer '{answer}' is not one of the options"
                    ));
                }
                None => {
                    issues.push(format!("question {position}: correct answer is required for mcq"));
                }
            }

            options = Some(cleaned);
        }
        Some(QuestionType::Written) => {
            if question.options.as_ref().is_some_and(|options| !options.is_empty()) {
                issues.push(format!(
                    "question {position}: options are only valid for mcq questions"
                ));
            }
            if question.correct_answer.is_some() {
                issues.push(format!(
                    "question {position}: correct answer is only valid for mcq questions"
                ));
            }
        }
        None => {}
    }

    if issues.len() > before {
        return None;
    }

    Some(ValidatedQuestion {
        question_type: question_type?,
        question_text: question_text?,
        image_url: question.image.clone().filter(|url| !url.trim().is_empty()),
        options,
        correct_answer,
        marks: marks?,
        solution: question.solution.clone().filter(|s| !s.trim().is_empty()),
    })
}
