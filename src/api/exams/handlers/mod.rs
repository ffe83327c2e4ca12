mod create;
mod list;
mod manage;
mod questions;

pub(super) use create::{create_exam, import_exam};
pub(super) use list::{get_exam, list_available_exams, list_exam_submissions, list_exams};
pub(super) use manage::{delete_exam, publish_exam, unpublish_exam, update_exam};
pub(super) use questions::{
    add_question, delete_question, update_question, upload_question_image,
};
