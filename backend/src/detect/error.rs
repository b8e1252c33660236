use thiserror::Error;

/// Pipeline-stage errors. Each variant keeps the stage visible in its
/// message so failure envelopes tell the caller which step broke.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to fetch image: {0}")]
    Fetch(String),
    #[error("failed to preprocess image: {0}")]
    Preprocess(String),
    #[error("inference failed: {0}")]
    Classify(String),
}

impl From<reqwest::Error> for DetectError {
    fn from(err: reqwest::Error) -> Self {
        DetectError::Fetch(err.to_string())
    }
}

// Undecodable response bytes count as a fetch failure, not a preprocess one.
impl From<image::ImageError> for DetectError {
    fn from(err: image::ImageError) -> Self {
        DetectError::Fetch(err.to_string())
    }
}

impl From<tch::TchError> for DetectError {
    fn from(err: tch::TchError) -> Self {
        DetectError::Classify(err.to_string())
    }
}
