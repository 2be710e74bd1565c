use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowgateError {
    #[error("manifest not found: {0}")]
    ManifestMissing(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid stage: {0}")]
    InvalidStage(String),

    #[error("invalid track '{0}': must be micro, small, medium, or large")]
    InvalidTrack(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowgateError>;
