//! Pipeline error taxonomy

use stereo_cv::CvError;
use thiserror::Error;

/// Errors surfaced by pipeline operations.
///
/// Synchronous rejections (`InputNotFound`, `JobAlreadyRunning`,
/// `ModelUnavailable`) are returned to the caller before a job spawns;
/// everything else lands in the job's status record.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Video file not found: {0}")]
    InputNotFound(String),

    #[error("A job for {0} is already running")]
    JobAlreadyRunning(String),

    #[error("{0} model is not available")]
    ModelUnavailable(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No job found for {0}")]
    JobNotFound(String),

    #[error("Job task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Cv(#[from] CvError),
}

impl PipelineError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
