pub(crate) mod exam_import;
pub(crate) mod exam_timing;
pub(crate) mod image_pipeline;
pub(crate) mod scoring;
pub(crate) mod storage;
pub(crate) mod submission_finalize;
