use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("invalid assignment '{0}': expected key=value")]
    InvalidAssignment(String),

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("run {0} has no result yet")]
    NoResult(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlaygroundError>;
