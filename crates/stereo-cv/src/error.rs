//! Error types for the CV layer

use thiserror::Error;

/// Errors that can occur in CV operations
#[derive(Error, Debug)]
pub enum CvError {
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Frame store error: {0}")]
    FrameStore(String),

    #[error("Video codec error: {0}")]
    Codec(String),

    #[error("Tracker initialization failed: {0}")]
    TrackerInit(String),

    #[error("Mask propagation failed: {0}")]
    Propagation(String),

    #[error("Rendering error: {0}")]
    Rendering(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OpenCV error: {0}")]
    OpenCv(String),
}

impl CvError {
    pub fn invalid_region(msg: impl Into<String>) -> Self {
        Self::InvalidRegion(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn frame_store(msg: impl Into<String>) -> Self {
        Self::FrameStore(msg.into())
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub fn tracker_init(msg: impl Into<String>) -> Self {
        Self::TrackerInit(msg.into())
    }

    pub fn propagation(msg: impl Into<String>) -> Self {
        Self::Propagation(msg.into())
    }
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for CvError {
    fn from(err: opencv::Error) -> Self {
        Self::OpenCv(err.to_string())
    }
}

pub type CvResult<T> = Result<T, CvError>;
