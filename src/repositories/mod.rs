pub(crate) mod answers;
pub(crate) mod exams;
pub(crate) mod questions;
pub(crate) mod submissions;
pub(crate) mod users;
