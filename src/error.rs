use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompanionError {
    #[error("config error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool argument error: {0}")]
    ToolArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CompanionError {
    fn from(e: reqwest::Error) -> Self {
        CompanionError::Network(e.to_string())
    }
}

/// Coarse grouping used when deciding how an error is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Parse,
    Unexpected,
}

impl CompanionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CompanionError::Network(_) => ErrorCategory::Network,
            CompanionError::ResponseShape(_) | CompanionError::Json(_) => ErrorCategory::Parse,
            CompanionError::Config(_)
            | CompanionError::ToolNotFound(_)
            | CompanionError::ToolArgument(_)
            | CompanionError::Io(_) => ErrorCategory::Unexpected,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompanionError>;
